use std::path::Path;

use crate::error::{FusionError, Result};

/// Load prompts from a text file, one per line.
///
/// Blank lines are skipped. A file with no prompts at all is an error.
pub fn read_prompts(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| FusionError::Persist {
        path: path.to_path_buf(),
        source: e,
    })?;
    let prompts = parse_prompts(&text);
    if prompts.is_empty() {
        return Err(FusionError::InvalidRequest(format!(
            "{} is empty",
            path.display()
        )));
    }
    Ok(prompts)
}

/// Split text into prompts. Line endings are dropped; other whitespace is kept.
pub fn parse_prompts(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect()
}

/// Wrap one interactively supplied prompt.
pub fn single_prompt(text: &str) -> Result<Vec<String>> {
    let prompt = text.trim();
    if prompt.is_empty() {
        return Err(FusionError::InvalidRequest("prompt must not be empty".into()));
    }
    Ok(vec![prompt.to_string()])
}
