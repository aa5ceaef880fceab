use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Reads a reference photo and returns it as a base64 data URI.
///
/// The format is sniffed from the file's magic bytes, not its extension.
pub fn load_reference_image(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    if bytes.is_empty() {
        bail!("{} is empty", path.display());
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        bail!(
            "{} is too large ({} bytes, limit {MAX_UPLOAD_BYTES})",
            path.display(),
            bytes.len()
        );
    }
    let format = image::guess_format(&bytes)
        .with_context(|| format!("{} is not a recognised image", path.display()))?;
    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        BASE64.encode(&bytes)
    ))
}
