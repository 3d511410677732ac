//! Engine integration tests.
//!
//! Drive [`Engine::process`] end to end: staged uploads, argument
//! construction, supervised execution, diagnostic logs and cleanup. Tests
//! that need real media tools skip when `ffmpeg`/`ffprobe` are missing.

mod common;

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use clipforged::engine::{Engine, JobRequest};
use clipforged_av::Outcome;
use common::{fake_engine, ffmpeg_available, make_clip, probe_entry, test_config};

fn engine_in(dir: &Path) -> Engine {
    Engine::from_config(&test_config(dir)).unwrap()
}

fn stage_file(engine: &Engine, slot: &str, path: &Path) -> clipforged_av::StoredPath {
    let name = path.file_name().unwrap().to_str().unwrap();
    let mut file = std::fs::File::open(path).unwrap();
    engine.stage_upload(slot, name, &mut file).unwrap()
}

fn process_alive(pid: &str) -> bool {
    std::fs::read_to_string(format!("/proc/{}/stat", pid.trim()))
        .map(|stat| {
            stat.rsplit(')')
                .next()
                .map(|rest| !rest.trim_start().starts_with('Z'))
                .unwrap_or(false)
        })
        .unwrap_or(false)
}

#[cfg(unix)]
#[tokio::test]
async fn caption_metacharacters_never_reach_a_shell() {
    let dir = tempfile::tempdir().unwrap();
    let canary = dir.path().join("canary");
    let record = dir.path().join("argv.txt");
    let engine_bin = fake_engine(
        dir.path(),
        "engine.sh",
        &format!(
            r#"for a; do printf '%s\n' "$a"; done > '{}'; : > "$out""#,
            record.display()
        ),
    );
    let engine = engine_in(dir.path()).with_program(engine_bin);
    let stored = engine
        .stage_upload("in1", "clip.mp4", &mut &b"data"[..])
        .unwrap();

    for caption in [
        format!("x; touch {}", canary.display()),
        format!("$(touch {})", canary.display()),
        format!("`touch {}`", canary.display()),
        format!("' && touch {} && echo '", canary.display()),
    ] {
        let request = JobRequest {
            recipe: "drawtext_simple_enable".to_string(),
            parameters: HashMap::from([("text".to_string(), caption.clone())]),
            uploads: HashMap::from([("in1".to_string(), stored.clone())]),
            outname: None,
        };
        let report = engine.process(&request).await.unwrap();
        assert!(report.outcome().is_success(), "{caption}");
        assert!(!canary.exists(), "caption {caption:?} executed a command");

        let argv = std::fs::read_to_string(&record).unwrap();
        let filter = argv.lines().find(|l| l.starts_with("drawtext=")).unwrap();
        assert!(filter.contains("touch"), "{filter}");
        assert_eq!(argv.lines().count(), report.job.command.args().len());
    }
}

#[cfg(unix)]
#[tokio::test]
async fn timeout_kills_engine_and_children() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("helper.pid");
    let engine_bin = fake_engine(
        dir.path(),
        "engine.sh",
        &format!(
            r#"printf 'partial' > "$out"; sleep 30 & echo $! > '{}'; echo "frame=1"; wait"#,
            pidfile.display()
        ),
    );
    let engine = engine_in(dir.path())
        .with_program(engine_bin)
        .with_timeout(Duration::from_secs(1));
    let stored = engine
        .stage_upload("in1", "clip.mp4", &mut &b"data"[..])
        .unwrap();

    let request = JobRequest {
        recipe: "trim".to_string(),
        uploads: HashMap::from([("in1".to_string(), stored)]),
        outname: Some("cut.mp4".to_string()),
        ..Default::default()
    };

    let start = Instant::now();
    let report = engine.process(&request).await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_matches!(report.outcome(), Outcome::TimedOut { output } if output.contains("frame=1"));

    let id = report.diagnostic_id.expect("timed-out job gets a diagnostic log");
    let log = std::fs::read_to_string(engine.log_dir().join(id.log_file_name())).unwrap();
    assert!(log.contains("-ss 00:00:00 -t 00:03:15"));
    assert!(log.contains("=== OUTPUT ===\nframe=1"));

    assert!(!engine.output_dir().join("cut.mp4").exists());

    let pid = std::fs::read_to_string(&pidfile).unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while process_alive(&pid) {
        assert!(Instant::now() < deadline, "helper process survived the timeout");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[cfg(unix)]
#[tokio::test]
async fn cancelling_the_job_kills_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("engine.pid");
    let engine_bin = fake_engine(
        dir.path(),
        "engine.sh",
        &format!(r#"echo $$ > '{}'; sleep 30"#, pidfile.display()),
    );
    let engine = engine_in(dir.path()).with_program(engine_bin);
    let stored = engine
        .stage_upload("in1", "clip.mp4", &mut &b"data"[..])
        .unwrap();
    let request = JobRequest {
        recipe: "vcodec_libx265".to_string(),
        uploads: HashMap::from([("in1".to_string(), stored)]),
        ..Default::default()
    };

    let cancelled =
        tokio::time::timeout(Duration::from_secs(1), engine.process(&request)).await;
    assert!(cancelled.is_err());

    let pid = std::fs::read_to_string(&pidfile).unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while process_alive(&pid) {
        assert!(Instant::now() < deadline, "engine survived cancellation");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[cfg(unix)]
#[tokio::test]
async fn failed_job_never_touches_an_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    // Exits non-zero when asked to write over a non-empty file, like an engine
    // refusing to overwrite.
    let engine_bin = fake_engine(
        dir.path(),
        "engine.sh",
        r#"if [ -s "$out" ]; then echo "File exists" >&2; exit 1; fi; printf 'new' > "$out""#,
    );
    let engine = engine_in(dir.path()).with_program(engine_bin);
    let existing = engine.output_dir().join("someone_elses_result.mp4");
    std::fs::write(&existing, b"finished earlier").unwrap();

    let stored = engine
        .stage_upload("in1", "clip.mp4", &mut &b"data"[..])
        .unwrap();
    let request = JobRequest {
        recipe: "trim".to_string(),
        uploads: HashMap::from([("in1".to_string(), stored)]),
        outname: Some("someone_elses_result.mp4".to_string()),
        ..Default::default()
    };

    assert_matches!(
        engine.process(&request).await,
        Err(clipforged_av::Error::UnsafePathParameter { slot, .. }) if slot == "outname"
    );
    assert_eq!(std::fs::read(&existing).unwrap(), b"finished earlier");

    // A fresh name is claimed, written and kept.
    let request = JobRequest {
        outname: Some("mine.mp4".to_string()),
        ..request
    };
    let report = engine.process(&request).await.unwrap();
    assert!(report.outcome().is_success(), "{}", report.outcome());
    assert_eq!(std::fs::read(engine.output_dir().join("mine.mp4")).unwrap(), b"new");
    assert_eq!(std::fs::read(&existing).unwrap(), b"finished earlier");
}

#[tokio::test]
async fn identical_requests_differ_only_in_output() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(dir.path()).with_program("true");
    let stored = engine
        .stage_upload("in1", "clip.mkv", &mut &b"data"[..])
        .unwrap();
    let request = JobRequest {
        recipe: "eq_color".to_string(),
        parameters: HashMap::from([("gamma".to_string(), "1.4".to_string())]),
        uploads: HashMap::from([("in1".to_string(), stored)]),
        outname: None,
    };

    let a = engine.process(&request).await.unwrap();
    let b = engine.process(&request).await.unwrap();
    let (a_args, b_args) = (a.job.command.args(), b.job.command.args());
    assert_eq!(a_args.len(), b_args.len());
    assert_eq!(a_args[..a_args.len() - 1], b_args[..b_args.len() - 1]);
    assert_ne!(a.output_name, b.output_name);
    assert!(a.output_name.ends_with(".mkv"));
}

#[tokio::test]
async fn scale_fixed_produces_requested_size() {
    if !ffmpeg_available() {
        eprintln!("Skipping: ffmpeg/ffprobe not available");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.mp4");
    make_clip(&source, 1, "320x240");

    let engine = Engine::from_config(&test_config(dir.path()))
        .unwrap()
        .with_program("ffmpeg");
    let request = JobRequest {
        recipe: "scale_fixed".to_string(),
        uploads: HashMap::from([("in1".to_string(), stage_file(&engine, "in1", &source))]),
        ..Default::default()
    };

    let report = engine.process(&request).await.unwrap();
    let Outcome::Succeeded { output } = report.outcome() else {
        panic!("scale_fixed failed: {:?}", report.outcome());
    };
    assert_eq!(probe_entry(output, "v:0", "stream=width"), "640");
    assert_eq!(probe_entry(output, "v:0", "stream=height"), "360");
}

#[tokio::test]
async fn concat_two_sums_durations() {
    if !ffmpeg_available() {
        eprintln!("Skipping: ffmpeg/ffprobe not available");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.mp4");
    let second = dir.path().join("second.mp4");
    make_clip(&first, 1, "320x240");
    make_clip(&second, 2, "320x240");

    let engine = Engine::from_config(&test_config(dir.path()))
        .unwrap()
        .with_program("ffmpeg");
    let request = JobRequest {
        recipe: "concat_two".to_string(),
        uploads: HashMap::from([
            ("in1".to_string(), stage_file(&engine, "in1", &first)),
            ("in2".to_string(), stage_file(&engine, "in2", &second)),
        ]),
        ..Default::default()
    };

    let report = engine.process(&request).await.unwrap();
    let Outcome::Succeeded { output } = report.outcome() else {
        panic!("concat_two failed: {:?}", report.outcome());
    };
    assert!(report.output_name.ends_with(".mp4"));

    // The video stream is measured; the container duration also counts AAC
    // priming samples.
    let frame_interval = 1.0 / frame_rate(&probe_entry(output, "v:0", "stream=r_frame_rate"));
    let expected: f64 = [&first, &second]
        .iter()
        .map(|clip| probe_entry(clip, "v:0", "stream=duration").parse::<f64>().unwrap())
        .sum();
    let duration: f64 = probe_entry(output, "v:0", "stream=duration").parse().unwrap();
    assert!(
        (duration - expected).abs() <= frame_interval + 1e-3,
        "duration {duration}, expected {expected} within {frame_interval}"
    );
}

/// Parse an ffprobe rational such as `10/1`.
fn frame_rate(rational: &str) -> f64 {
    let (num, den) = rational.split_once('/').unwrap_or((rational, "1"));
    let rate = num.parse::<f64>().unwrap() / den.parse::<f64>().unwrap();
    assert!(rate > 0.0, "bad frame rate {rational}");
    rate
}
