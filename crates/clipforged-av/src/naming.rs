//! Output file naming.

use clipforged_common::paths::{is_media_extension, sanitize_filename};
use clipforged_common::short_hex;

use crate::recipe::{Recipe, RecipeClass};
use crate::{Error, Result};

/// Length of the random token in generated output names.
const OUTPUT_TOKEN_LEN: usize = 8;

/// Pick the output file name for a job.
///
/// A caller-supplied name is used verbatim once it passes sanitizing; an
/// empty name counts as absent. Otherwise the name is `out_<8 hex>.<ext>`,
/// with the extension chosen by [`output_extension`].
///
/// # Errors
///
/// Returns [`Error::UnsafePathParameter`] for a caller name that is not a
/// bare file name.
pub fn name(recipe: &Recipe, caller_name: Option<&str>, primary_ext: Option<&str>) -> Result<String> {
    match caller_name.filter(|n| !n.is_empty()) {
        Some(raw) => sanitize_filename(raw)
            .map(str::to_string)
            .ok_or_else(|| Error::unsafe_path("outname", "output name must be a bare file name")),
        None => Ok(format!(
            "out_{}.{}",
            short_hex(OUTPUT_TOKEN_LEN),
            output_extension(recipe, primary_ext)
        )),
    }
}

/// Extension for a generated output name.
pub fn output_extension(recipe: &Recipe, primary_ext: Option<&str>) -> String {
    let primary = primary_ext.map(|e| e.trim_start_matches('.').to_ascii_lowercase());
    match recipe.class {
        RecipeClass::AudioCover => primary
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "mp3".to_string()),
        RecipeClass::ImageSequence => "webp".to_string(),
        RecipeClass::Concat => "mp4".to_string(),
        RecipeClass::General => primary
            .filter(|e| is_media_extension(e))
            .unwrap_or_else(|| "mp4".to_string()),
    }
}
