use std::{path::Path, str::FromStr};

/// Load `.env` from the workspace root and the working directory.
///
/// Missing files are ignored; variables already present in the environment win.
pub fn load_dotenv() {
    let _ = dotenvy::from_path(Path::new(
        format!("{}/../../.env", env!("CARGO_MANIFEST_DIR")).as_str(),
    ));
    dotenvy::dotenv().ok();
}

/// Parse a raw setting value, logging (not failing) when it is malformed.
pub fn parse_value<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(val) => Some(val),
        Err(_) => {
            tracing::error!(key, value = trimmed, "error parsing environment value");
            None
        }
    }
}

/// Interpret common boolean spellings (`1`/`0`, `true`/`false`, `on`/`off`, ...).
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}
