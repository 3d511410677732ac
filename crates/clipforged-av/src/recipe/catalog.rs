//! Built-in recipe catalog.
//!
//! Every recipe renders discrete argument tokens. Caller text that lands in a
//! filtergraph goes through [`RenderScope::filter_text`]; drawtext filters run
//! with `expansion=none` so `%{...}` sequences in captions stay literal.

use super::{NumericFormat, Recipe, RecipeClass, Slot};
use crate::command::RenderScope;
use crate::escape::escape_filter_text;
use crate::Result;

const IN1: Slot = Slot::input("in1");
const IN2: Slot = Slot::input("in2");
const IN3: Slot = Slot::input("in3");
const IMAGE: Slot = Slot::image("image");

const TITLE: Slot = Slot::text("title", "Title");
const TEXT: Slot = Slot::text("text", "Sample caption");
const FONTCOLOR: Slot = Slot::text("fontcolor", "gray");
const VID_MD5: Slot = Slot::text("vid_md5", "4032e3631edbed8efbfbabf97b5312d7");

const FONTSIZE: Slot = Slot::numeric("fontsize", NumericFormat::Integer { min: 1, max: 1000 }, "24");
const XOFF: Slot = Slot::numeric("xoff", NumericFormat::Integer { min: -10000, max: 10000 }, "20");
const PERIOD: Slot = Slot::numeric("period", NumericFormat::PositiveDecimal, "5");
const SCALE_FACTOR: Slot = Slot::numeric("scale_factor", NumericFormat::PositiveDecimal, "1.5");
const OVERLAY_X: Slot = Slot::numeric("overlay_x", NumericFormat::Integer { min: 0, max: 100000 }, "10");
const OVERLAY_Y: Slot = Slot::numeric("overlay_y", NumericFormat::Integer { min: 0, max: 100000 }, "10");
const OVERLAY_XY: Slot = Slot::numeric("overlay_xy", NumericFormat::Position, "01:00");
const START: Slot = Slot::numeric("start", NumericFormat::Timecode, "00:00:00");
const DURATION: Slot = Slot::numeric("duration", NumericFormat::Timecode, "00:03:15");
const SCALE_X: Slot = Slot::numeric("scale_x", NumericFormat::Integer { min: -2, max: 16384 }, "640");
const SCALE_Y: Slot = Slot::numeric("scale_y", NumericFormat::Integer { min: -2, max: 16384 }, "360");
const FPS: Slot = Slot::numeric("fps", NumericFormat::Integer { min: 1, max: 120 }, "15");
const PTS_MUL: Slot = Slot::numeric("pts_mul", NumericFormat::PositiveDecimal, "2");
const BITRATE: Slot = Slot::numeric("bitrate", NumericFormat::Bitrate, "128k");
const VOLUME: Slot = Slot::numeric("volume", NumericFormat::PositiveDecimal, "1.5");
const VOLUME_DB: Slot = Slot::numeric("volume_db", NumericFormat::Decimal { min: -60.0, max: 60.0 }, "20");
const MOD_PERIOD: Slot = Slot::numeric("mod_period", NumericFormat::PositiveDecimal, "60");
const SHOW_LEN: Slot = Slot::numeric("show_len", NumericFormat::PositiveDecimal, "1");
const BRIGHTNESS: Slot = Slot::numeric("brightness", NumericFormat::Decimal { min: -1.0, max: 1.0 }, "0.1");
const CONTRAST: Slot = Slot::numeric("contrast", NumericFormat::Decimal { min: -1000.0, max: 1000.0 }, "1.2");
const SATURATION: Slot = Slot::numeric("saturation", NumericFormat::Decimal { min: 0.0, max: 3.0 }, "1.5");
const GAMMA: Slot = Slot::numeric("gamma", NumericFormat::Decimal { min: 0.1, max: 10.0 }, "1.0");

/// Codes and names accepted by the `transpose` filter.
pub const TRANSPOSE_CODES: &[&str] = &["0", "1", "2", "3", "cclock_flip", "clock", "cclock", "clock_flip"];
const TRANSPOSE: Slot = Slot::choice("transpose", TRANSPOSE_CODES, "1");

/// Every built-in recipe.
pub static CATALOG: &[Recipe] = &[
    Recipe {
        name: "audio_cover",
        description: "Attach a cover image to an audio file",
        class: RecipeClass::AudioCover,
        slots: &[IN1, IMAGE, TITLE],
        render: audio_cover,
    },
    Recipe {
        name: "zoom_scale_crop_1.5",
        description: "Zoom by a factor and crop to 720x1280 portrait",
        class: RecipeClass::General,
        slots: &[IN1, SCALE_FACTOR],
        render: zoom_scale_crop,
    },
    Recipe {
        name: "zoom_scale_crop_1.0",
        description: "Crop to 720x1280 portrait without zoom",
        class: RecipeClass::General,
        slots: &[IN1],
        render: zoom_scale_crop_unit,
    },
    Recipe {
        name: "overlay_image",
        description: "Overlay an image at a fixed position",
        class: RecipeClass::General,
        slots: &[IN1, IMAGE, OVERLAY_X, OVERLAY_Y],
        render: overlay_image,
    },
    Recipe {
        name: "trim",
        description: "Cut a segment by start time and duration",
        class: RecipeClass::General,
        slots: &[IN1, START, DURATION],
        render: trim,
    },
    Recipe {
        name: "zoom_crop_simple",
        description: "Zoom in and crop back to the original frame",
        class: RecipeClass::General,
        slots: &[IN1, SCALE_FACTOR],
        render: zoom_crop_simple,
    },
    Recipe {
        name: "concat_two",
        description: "Concatenate two clips with compatible streams",
        class: RecipeClass::Concat,
        slots: &[IN1, IN2],
        render: concat_two,
    },
    Recipe {
        name: "speedup_half_pts",
        description: "Double playback speed of video and audio",
        class: RecipeClass::General,
        slots: &[IN1],
        render: speedup_half_pts,
    },
    Recipe {
        name: "replace_audio_shortest",
        description: "Replace the audio track, stopping at the shorter input",
        class: RecipeClass::General,
        slots: &[IN1, IN2],
        render: replace_audio_shortest,
    },
    Recipe {
        name: "vcodec_libx265",
        description: "Re-encode video with libx265",
        class: RecipeClass::General,
        slots: &[IN1],
        render: vcodec_libx265,
    },
    Recipe {
        name: "scale_fixed",
        description: "Scale video to a fixed width and height",
        class: RecipeClass::General,
        slots: &[IN1, SCALE_X, SCALE_Y],
        render: scale_fixed,
    },
    Recipe {
        name: "merge_video_audio_amerge",
        description: "Mix a second audio source into the video's audio",
        class: RecipeClass::General,
        slots: &[IN1, IN2, VOLUME],
        render: merge_video_audio_amerge,
    },
    Recipe {
        name: "video_overlay_and_audio_map",
        description: "Overlay an image and take audio from a second input",
        class: RecipeClass::General,
        slots: &[IN1, IN2, IMAGE, OVERLAY_XY],
        render: video_overlay_and_audio_map,
    },
    Recipe {
        name: "drawtext_split_overlay_motion",
        description: "Caption that oscillates vertically over a cropped band",
        class: RecipeClass::General,
        slots: &[IN1, TEXT, FONTSIZE, FONTCOLOR, XOFF, PERIOD],
        render: drawtext_split_overlay_motion,
    },
    Recipe {
        name: "drawtext_enable_crop_overlay",
        description: "Rising caption shown periodically over a cropped band",
        class: RecipeClass::General,
        slots: &[IN1, TEXT, FONTSIZE, FONTCOLOR, XOFF, MOD_PERIOD, SHOW_LEN],
        render: drawtext_enable_crop_overlay,
    },
    Recipe {
        name: "loop_image_to_video",
        description: "Loop a still image for the length of an audio track",
        class: RecipeClass::General,
        slots: &[IMAGE, IN1],
        render: loop_image_to_video,
    },
    Recipe {
        name: "concat_copy",
        description: "Concatenate files listed in an uploaded concat list",
        class: RecipeClass::Concat,
        slots: &[IN1],
        render: concat_copy,
    },
    Recipe {
        name: "change_codecs",
        description: "Re-encode to h264 video and mp2 audio",
        class: RecipeClass::General,
        slots: &[IN1],
        render: change_codecs,
    },
    Recipe {
        name: "scale_bitrate",
        description: "Re-encode to h264 at a target video bitrate",
        class: RecipeClass::General,
        slots: &[IN1, BITRATE],
        render: scale_bitrate,
    },
    Recipe {
        name: "add_metadata_vid_md5",
        description: "Re-encode audio and tag the file with a vid_md5 value",
        class: RecipeClass::General,
        slots: &[IN1, BITRATE, VID_MD5],
        render: add_metadata_vid_md5,
    },
    Recipe {
        name: "concat_n",
        description: "Concatenate three clips",
        class: RecipeClass::Concat,
        slots: &[IN1, IN2, IN3],
        render: concat_n,
    },
    Recipe {
        name: "transpose",
        description: "Rotate or flip video",
        class: RecipeClass::General,
        slots: &[IN1, TRANSPOSE],
        render: transpose,
    },
    Recipe {
        name: "eq_color",
        description: "Adjust brightness, contrast, saturation and gamma",
        class: RecipeClass::General,
        slots: &[IN1, BRIGHTNESS, CONTRAST, SATURATION, GAMMA],
        render: eq_color,
    },
    Recipe {
        name: "pad_and_overlay_volume",
        description: "Place two videos side by side and boost the first audio",
        class: RecipeClass::General,
        slots: &[IN1, IN2, VOLUME_DB],
        render: pad_and_overlay_volume,
    },
    Recipe {
        name: "drawtext_simple_enable",
        description: "Centered caption shown periodically",
        class: RecipeClass::General,
        slots: &[IN1, TEXT, FONTCOLOR, FONTSIZE, MOD_PERIOD, SHOW_LEN],
        render: drawtext_simple_enable,
    },
    Recipe {
        name: "split_drawtext_overlay_vcodec_map_audio",
        description: "Rising caption over a cropped band with audio from a second input",
        class: RecipeClass::General,
        slots: &[IN1, IN2, TEXT, FONTSIZE, FONTCOLOR, XOFF],
        render: split_drawtext_overlay_vcodec_map_audio,
    },
    Recipe {
        name: "webp_gif_from_video",
        description: "Animated webp from a video",
        class: RecipeClass::ImageSequence,
        slots: &[IN1, FPS, SCALE_X],
        render: webp_gif_from_video,
    },
    Recipe {
        name: "reverse_webp",
        description: "Reversed, retimed lossless animated webp",
        class: RecipeClass::ImageSequence,
        slots: &[IN1, PTS_MUL, SCALE_X, SCALE_Y],
        render: reverse_webp,
    },
    Recipe {
        name: "concat_drawtext",
        description: "Concatenate a list and add a periodic centered caption",
        class: RecipeClass::Concat,
        slots: &[IN1, TEXT, FONTCOLOR, FONTSIZE, MOD_PERIOD, SHOW_LEN],
        render: concat_drawtext,
    },
    Recipe {
        name: "concat_with_audio_drawtext",
        description: "Concatenate a list, replace audio and add a caption",
        class: RecipeClass::Concat,
        slots: &[IN1, IN2, TEXT, FONTCOLOR, FONTSIZE, MOD_PERIOD, SHOW_LEN],
        render: concat_with_audio_drawtext,
    },
    Recipe {
        name: "merge_video_and_audio_with_text_overlay",
        description: "Caption over a cropped band with audio from a second input",
        class: RecipeClass::General,
        slots: &[IN1, IN2, TEXT, FONTSIZE, FONTCOLOR, XOFF],
        render: merge_video_and_audio_with_text_overlay,
    },
    Recipe {
        name: "replace_map_metadata_shortest",
        description: "Cut a segment, replace audio and drop metadata",
        class: RecipeClass::General,
        slots: &[IN1, IN2, START, DURATION],
        render: replace_map_metadata_shortest,
    },
    Recipe {
        name: "pan_and_instrumental",
        description: "Phase-cancel the centre channel for a rough instrumental",
        class: RecipeClass::General,
        slots: &[IN1],
        render: pan_and_instrumental,
    },
    Recipe {
        name: "create_lofi_filters",
        description: "Band-limit, echo and normalise audio for a lo-fi sound",
        class: RecipeClass::General,
        slots: &[IN1, VOLUME],
        render: create_lofi_filters,
    },
];

// ---------------------------------------------------------------------------
// Shared filter fragments
// ---------------------------------------------------------------------------

/// `enable` expression that shows a caption for `show_len` seconds out of
/// every `mod_period`.
fn blink_expr(s: &mut RenderScope<'_>) -> Result<String> {
    let period = s.value("mod_period")?;
    let show = s.value("show_len")?;
    Ok(escape_filter_text(&format!("lt(mod(t,{}),{})", period, show)))
}

/// Centered drawtext filter with a periodic `enable`.
fn centered_caption(s: &mut RenderScope<'_>) -> Result<String> {
    let text = s.filter_text("text")?;
    let color = s.filter_text("fontcolor")?;
    let size = s.value("fontsize")?;
    let enable = blink_expr(s)?;
    Ok(format!(
        "drawtext=text={}:expansion=none:fontcolor={}:fontsize={}:x=(w-text_w)/2:y=(h-text_h)/2:enable={}",
        text, color, size, enable
    ))
}

/// Split the video, caption one copy, and overlay a 50px band cropped from
/// the top of the other. The graph ends in `out_label` when given.
fn banded_caption(
    s: &mut RenderScope<'_>,
    y_expr: &str,
    enable: Option<String>,
    out_label: Option<&str>,
) -> Result<String> {
    let font = s.fontfile();
    let size = s.value("fontsize")?;
    let color = s.filter_text("fontcolor")?;
    let xoff = s.value("xoff")?;
    let text = s.filter_text("text")?;
    let enable = enable.map(|e| format!(":enable={}", e)).unwrap_or_default();
    let out = out_label.map(|l| format!("[{}]", l)).unwrap_or_default();
    Ok(format!(
        "[0:v]split[txt][orig];\
         [txt]drawtext=fontfile={}:fontsize={}:fontcolor={}:x=(w-text_w)/2+{}:y={}:text={}:expansion=none{}[captioned];\
         [orig]crop=iw:50:0:0[band];\
         [captioned][band]overlay{}",
        font, size, color, xoff, y_expr, text, enable, out
    ))
}

// ---------------------------------------------------------------------------
// Render functions
// ---------------------------------------------------------------------------

fn audio_cover(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?.input("image")?;
    let title = s.text("title")?;
    s.args(["-map", "0", "-map", "1", "-c", "copy", "-id3v2_version", "3"])
        .arg("-metadata:s:v")
        .arg(format!("title={}", title))
        .arg("-metadata:s:v")
        .arg("comment=Cover (front)");
    Ok(())
}

fn zoom_scale_crop(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    let f = s.value("scale_factor")?;
    s.arg("-vf")
        .arg(format!(
            "scale={f}*iw:-1,crop=ih*9/16:ih:({f}*iw-ih*9/16)/2:0,scale=720:1280"
        ))
        .args(["-preset", "ultrafast"]);
    Ok(())
}

fn zoom_scale_crop_unit(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    s.arg("-vf")
        .arg("scale=1.0*iw:-1,crop=ih*9/16:ih:(1.0*iw-ih*9/16)/2:(ih-ih)/2,scale=720:1280")
        .args(["-preset", "ultrafast"]);
    Ok(())
}

fn overlay_image(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?.input("image")?;
    let x = s.value("overlay_x")?;
    let y = s.value("overlay_y")?;
    s.arg("-filter_complex")
        .arg(format!("[0:v][1:v]overlay={}:{}", x, y))
        .args(["-map", "0:a?", "-preset", "ultrafast"]);
    Ok(())
}

fn trim(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    let start = s.value("start")?;
    let duration = s.value("duration")?;
    s.arg("-ss")
        .arg(start)
        .arg("-t")
        .arg(duration)
        .args(["-preset", "ultrafast"]);
    Ok(())
}

fn zoom_crop_simple(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    let f = s.value("scale_factor")?;
    s.arg("-vf")
        .arg(format!("scale={f}*iw:-1,crop=iw/{f}:ih/{f}"))
        .args(["-preset", "ultrafast"]);
    Ok(())
}

fn concat_two(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?.input("in2")?;
    s.arg("-filter_complex")
        .arg("[0:v:0][0:a:0][1:v:0][1:a:0]concat=n=2:v=1:a=1[outv][outa]")
        .args(["-map", "[outv]", "-map", "[outa]"]);
    Ok(())
}

fn speedup_half_pts(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    s.arg("-filter_complex")
        .arg("[0:v]setpts=0.5*PTS[v];[0:a]atempo=2.0[a]")
        .args(["-map", "[v]", "-map", "[a]", "-preset", "ultrafast"]);
    Ok(())
}

fn replace_audio_shortest(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?.input("in2")?;
    s.args([
        "-c", "copy", "-map", "0:v", "-map", "1:a", "-shortest", "-preset", "ultrafast",
    ]);
    Ok(())
}

fn vcodec_libx265(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    s.args(["-vcodec", "libx265", "-preset", "ultrafast"]);
    Ok(())
}

fn scale_fixed(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    let w = s.value("scale_x")?;
    let h = s.value("scale_y")?;
    s.arg("-vf").arg(format!("scale={}:{}", w, h));
    Ok(())
}

fn merge_video_audio_amerge(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?.input("in2")?;
    let volume = s.value("volume")?;
    s.args(["-c:v", "copy", "-filter_complex"])
        .arg(format!(
            "[0:a]aformat=fltp:44100:stereo,apad[0a];\
             [1]aformat=fltp:44100:stereo,volume={}[1a];\
             [0a][1a]amerge[a]",
            volume
        ))
        .args(["-map", "0:v", "-map", "[a]", "-ac", "2"]);
    Ok(())
}

fn video_overlay_and_audio_map(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?.input("in2")?.input("image")?;
    let xy = s.value("overlay_xy")?;
    s.arg("-filter_complex")
        .arg(format!("[0:v][2:v]overlay={}[v]", xy))
        .args(["-map", "[v]", "-map", "1:a?", "-shortest", "-preset", "ultrafast"]);
    Ok(())
}

fn drawtext_split_overlay_motion(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    let period = s.value("period")?;
    let y = format!("h/2+(h/3)*sin(2*PI*t/{})", period);
    let enable = Some(escape_filter_text("lt(mod(t,60),60)"));
    let graph = banded_caption(s, &y, enable, None)?;
    s.arg("-filter_complex")
        .arg(graph)
        .args(["-vcodec", "libx265", "-preset", "ultrafast"]);
    Ok(())
}

fn drawtext_enable_crop_overlay(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    let enable = blink_expr(s)?;
    let graph = banded_caption(s, "h-40*t", Some(enable), None)?;
    s.arg("-filter_complex")
        .arg(graph)
        .args(["-vcodec", "libx265", "-preset", "ultrafast"]);
    Ok(())
}

fn loop_image_to_video(s: &mut RenderScope<'_>) -> Result<()> {
    s.args(["-loop", "1"]);
    s.input("image")?.input("in1")?;
    s.args([
        "-c:v", "libx265", "-c:a", "aac", "-b:a", "192k", "-shortest", "-preset", "ultrafast",
    ]);
    Ok(())
}

fn concat_copy(s: &mut RenderScope<'_>) -> Result<()> {
    s.args(["-f", "concat"]);
    s.input("in1")?;
    s.args(["-c", "copy"]);
    Ok(())
}

fn change_codecs(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    s.args(["-vcodec", "h264", "-acodec", "mp2"]);
    Ok(())
}

fn scale_bitrate(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    let bitrate = s.value("bitrate")?;
    s.args(["-vcodec", "h264", "-b:v"])
        .arg(bitrate)
        .args(["-acodec", "mp3"]);
    Ok(())
}

fn add_metadata_vid_md5(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    let bitrate = s.value("bitrate")?;
    let md5 = s.text("vid_md5")?;
    s.args(["-c:a", "libmp3lame", "-b:a"])
        .arg(bitrate)
        .args(["-movflags", "use_metadata_tags", "-map_metadata", "0", "-metadata"])
        .arg(format!("vid_md5={}", md5));
    Ok(())
}

fn concat_n(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?.input("in2")?.input("in3")?;
    s.arg("-filter_complex")
        .arg("[0:v][0:a][1:v][1:a][2:v][2:a]concat=n=3:v=1:a=1")
        .args(["-vsync", "vfr"]);
    Ok(())
}

fn transpose(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    let code = s.value("transpose")?;
    s.arg("-vf").arg(format!("transpose={}", code));
    Ok(())
}

fn eq_color(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    let brightness = s.value("brightness")?;
    let contrast = s.value("contrast")?;
    let saturation = s.value("saturation")?;
    let gamma = s.value("gamma")?;
    s.arg("-vf")
        .arg(format!(
            "eq=brightness={}:contrast={}:saturation={}:gamma={}",
            brightness, contrast, saturation, gamma
        ))
        .args(["-c:a", "copy"]);
    Ok(())
}

fn pad_and_overlay_volume(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?.input("in2")?;
    let db = s.value("volume_db")?;
    s.arg("-filter_complex")
        .arg(format!(
            "[0:v]pad=iw*2:ih[v];[v][1:v]overlay=W/2:0[out_video];[0:a]volume={}dB[out_audio]",
            db
        ))
        .args([
            "-map", "[out_video]", "-c:v", "libx265", "-crf", "28", "-map", "[out_audio]", "-c:a",
            "aac",
        ]);
    Ok(())
}

fn drawtext_simple_enable(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    let caption = centered_caption(s)?;
    s.arg("-vf").arg(caption).args(["-c:a", "copy"]);
    Ok(())
}

fn split_drawtext_overlay_vcodec_map_audio(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?.input("in2")?;
    let graph = banded_caption(s, "h-40*t", None, Some("v"))?;
    s.arg("-filter_complex")
        .arg(graph)
        .args([
            "-map", "[v]", "-map", "1:a", "-vcodec", "libx265", "-shortest", "-preset",
            "ultrafast",
        ]);
    Ok(())
}

fn webp_gif_from_video(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    let fps = s.value("fps")?;
    let w = s.value("scale_x")?;
    s.arg("-vf")
        .arg(format!("fps={},scale={}:-1:flags=lanczos", fps, w))
        .args(["-c:v", "libwebp", "-loop", "0", "-an"]);
    Ok(())
}

fn reverse_webp(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    let mul = s.value("pts_mul")?;
    let w = s.value("scale_x")?;
    let h = s.value("scale_y")?;
    s.arg("-vf")
        .arg(format!("reverse,setpts=PTS*{},scale={}:{}", mul, w, h))
        .args(["-c:v", "libwebp", "-lossless", "1", "-loop", "0", "-an"]);
    Ok(())
}

fn concat_drawtext(s: &mut RenderScope<'_>) -> Result<()> {
    s.args(["-f", "concat"]);
    s.input("in1")?;
    let caption = centered_caption(s)?;
    s.arg("-vf").arg(caption).args(["-c:a", "copy"]);
    Ok(())
}

fn concat_with_audio_drawtext(s: &mut RenderScope<'_>) -> Result<()> {
    s.args(["-f", "concat"]);
    s.input("in1")?.input("in2")?;
    s.args(["-map", "0:v", "-map", "1:a", "-shortest"]);
    let caption = centered_caption(s)?;
    s.arg("-vf").arg(caption).args(["-c:a", "copy"]);
    Ok(())
}

fn merge_video_and_audio_with_text_overlay(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?.input("in2")?;
    let graph = banded_caption(s, "h-30*t", None, Some("v"))?;
    s.arg("-filter_complex")
        .arg(graph)
        .args([
            "-map", "[v]", "-map", "1:a", "-c:a", "copy", "-shortest", "-preset", "ultrafast",
        ]);
    Ok(())
}

fn replace_map_metadata_shortest(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?.input("in2")?;
    let start = s.value("start")?;
    let duration = s.value("duration")?;
    s.arg("-ss")
        .arg(start)
        .arg("-t")
        .arg(duration)
        .args([
            "-map", "0:v", "-map", "1:a", "-c:v", "libx265", "-preset", "ultrafast", "-c:a",
            "copy", "-map_metadata", "-1", "-shortest",
        ]);
    Ok(())
}

fn pan_and_instrumental(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    s.args(["-af", "pan=stereo|c0=c0|c1=-1*c1"]);
    Ok(())
}

fn create_lofi_filters(s: &mut RenderScope<'_>) -> Result<()> {
    s.input("in1")?;
    let volume = s.value("volume")?;
    s.arg("-af").arg(format!(
        "lowpass=f=3000,highpass=f=200,aecho=0.8:0.9:1000:0.3,volume={},dynaudnorm",
        volume
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandBuilder, RenderEnv};
    use crate::params::resolve;
    use crate::store::PreviewStore;
    use std::collections::{HashMap, HashSet};
    use std::path::Path;

    fn build_with_defaults(recipe: &Recipe) -> crate::Result<Vec<String>> {
        let store = PreviewStore::new("/srv/uploads", "/srv/outputs");
        let env = RenderEnv::default();
        let uploads: HashMap<String, _> = recipe
            .slots
            .iter()
            .filter(|s| s.kind.is_path())
            .map(|s| (s.name.to_string(), store.placeholder(s.name)))
            .collect();
        let params = resolve(recipe, &HashMap::new(), &uploads)?;
        let cmd = CommandBuilder::new(&store, &env).build(
            recipe,
            &params,
            Path::new("/srv/outputs/out.mp4"),
        )?;
        Ok(cmd.args().to_vec())
    }

    #[test]
    fn test_every_recipe_renders_with_defaults() {
        for recipe in CATALOG {
            let args = build_with_defaults(recipe)
                .unwrap_or_else(|e| panic!("{} failed to render: {}", recipe.name, e));
            assert_eq!(args.last().map(String::as_str), Some("/srv/outputs/out.mp4"));
            assert!(args.iter().any(|a| a == "-i"), "{} has no input", recipe.name);
        }
    }

    #[test]
    fn test_recipe_names_unique() {
        let mut seen = HashSet::new();
        for recipe in CATALOG {
            assert!(seen.insert(recipe.name), "duplicate recipe {}", recipe.name);
        }
        assert_eq!(CATALOG.len(), 34);
    }

    #[test]
    fn test_slot_names_unique_per_recipe() {
        for recipe in CATALOG {
            let mut seen = HashSet::new();
            for slot in recipe.slots {
                assert!(seen.insert(slot.name), "{} declares {} twice", recipe.name, slot.name);
            }
        }
    }

    #[test]
    fn test_every_recipe_has_a_primary_input() {
        for recipe in CATALOG {
            assert!(recipe.primary_input().is_some(), "{}", recipe.name);
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        for recipe in CATALOG {
            for slot in recipe.slots.iter().filter(|s| !s.kind.is_path()) {
                assert!(slot.default.is_some(), "{}.{} lacks a default", recipe.name, slot.name);
            }
        }
    }

    #[test]
    fn test_scale_fixed_arguments() {
        let recipe = CATALOG.iter().find(|r| r.name == "scale_fixed").unwrap();
        let args = build_with_defaults(recipe).unwrap();
        assert_eq!(
            args,
            vec![
                "-hide_banner",
                "-nostdin",
                "-y",
                "-i",
                "/srv/uploads/in1.ext",
                "-vf",
                "scale=640:360",
                "/srv/outputs/out.mp4",
            ]
        );
    }

    #[test]
    fn test_caption_text_is_single_escaped_token() {
        let recipe = CATALOG
            .iter()
            .find(|r| r.name == "drawtext_simple_enable")
            .unwrap();
        let store = PreviewStore::new("/srv/uploads", "/srv/outputs");
        let env = RenderEnv::default();
        let uploads = HashMap::from([("in1".to_string(), store.placeholder("in1"))]);
        let user = HashMap::from([(
            "text".to_string(),
            r#"ignored"; rm -rf /; echo ""#.to_string(),
        )]);
        let params = resolve(recipe, &user, &uploads).unwrap();
        let cmd = CommandBuilder::new(&store, &env)
            .build(recipe, &params, Path::new("/srv/outputs/out.mp4"))
            .unwrap();

        let baseline = build_with_defaults(recipe).unwrap();
        assert_eq!(cmd.args().len(), baseline.len());

        let vf = &cmd.args()[cmd.args().iter().position(|a| a == "-vf").unwrap() + 1];
        assert!(vf.starts_with(r#"drawtext=text=ignored"\; rm -rf /\; echo ":expansion=none:"#));
        assert!(vf.ends_with(r"enable=lt(mod(t\,60)\,1)"));
    }

    #[test]
    fn test_fontfile_comes_from_environment() {
        let recipe = CATALOG
            .iter()
            .find(|r| r.name == "drawtext_enable_crop_overlay")
            .unwrap();
        let store = PreviewStore::new("/srv/uploads", "/srv/outputs");
        let env = RenderEnv {
            fontfile: "/opt/fonts/Caption: Bold.ttf".into(),
            ..RenderEnv::default()
        };
        let uploads = HashMap::from([("in1".to_string(), store.placeholder("in1"))]);
        let params = resolve(recipe, &HashMap::new(), &uploads).unwrap();
        let cmd = CommandBuilder::new(&store, &env)
            .build(recipe, &params, Path::new("/srv/outputs/out.mp4"))
            .unwrap();
        let graph = &cmd.args()[cmd.args().iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(graph.contains(r"fontfile=/opt/fonts/Caption\\: Bold.ttf:"));
        assert!(graph.contains(r":enable=lt(mod(t\,60)\,1)[captioned]"));
    }

    #[test]
    fn test_overwrite_flag_is_global_only() {
        for recipe in CATALOG {
            let args = build_with_defaults(recipe).unwrap();
            let count = args.iter().filter(|a| *a == "-y").count();
            assert_eq!(count, 1, "{} passes -y {} times", recipe.name, count);
            assert_eq!(args[2], "-y");
        }
    }

    #[test]
    fn test_amerge_keeps_full_length() {
        let recipe = CATALOG
            .iter()
            .find(|r| r.name == "merge_video_audio_amerge")
            .unwrap();
        let args = build_with_defaults(recipe).unwrap();
        assert!(!args.iter().any(|a| a == "-shortest"));
        assert!(args.ends_with(&["-ac".to_string(), "2".to_string(), "/srv/outputs/out.mp4".to_string()]));
    }

    #[test]
    fn test_loop_image_primary_input_is_image() {
        let recipe = CATALOG
            .iter()
            .find(|r| r.name == "loop_image_to_video")
            .unwrap();
        assert_eq!(recipe.primary_input().map(|s| s.name), Some("image"));
    }
}
