use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{FusionError, Result};

/// Decode a base64 image payload into raw bytes.
///
/// Leading and trailing whitespace (including line breaks) is ignored.
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(encoded.trim())?)
}

/// Decode `encoded` and write it to `path`, replacing any existing file.
///
/// The parent directory must already exist. Returns the number of bytes written.
/// Nothing is written when decoding fails.
pub fn save(encoded: &str, path: &Path) -> Result<usize> {
    let bytes = decode(encoded)?;
    std::fs::write(path, &bytes).map_err(|e| FusionError::Persist {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(bytes.len())
}

/// Create the output directory (and parents) if it does not exist yet.
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| FusionError::Persist {
        path: dir.to_path_buf(),
        source: e,
    })
}
