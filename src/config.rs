//! Environment lookups for the CLI. The signer itself never reads the environment.

use std::env;
use std::fs;

use crate::error::ConfigError;

/// Env var holding the URL signing key when `--key` is not passed.
pub const SIGNING_KEY_VAR: &str = "URL_SIGNING_KEY";

/// Loads `.env` from the working directory if one exists.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("loaded {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("ignoring .env: {e}"),
    }
}

/// Reads `{name}_FILE` (a path to a file holding the secret) or else `name`.
/// Values are trimmed; blank counts as unset.
pub fn read_secret(name: &str) -> Result<Option<String>, ConfigError> {
    let file_var = format!("{name}_FILE");
    if let Ok(path) = env::var(&file_var) {
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::SecretFile {
            var: file_var,
            path,
            source,
        })?;
        return Ok(non_blank(&content));
    }

    Ok(env::var(name).ok().and_then(|v| non_blank(&v)))
}

/// Flag value wins; otherwise fall back to the environment.
pub fn resolve_signing_key(flag: Option<String>) -> Result<Option<String>, ConfigError> {
    match flag.filter(|k| !k.is_empty()) {
        Some(key) => Ok(Some(key)),
        None => read_secret(SIGNING_KEY_VAR),
    }
}

fn non_blank(v: &str) -> Option<String> {
    let trimmed = v.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
