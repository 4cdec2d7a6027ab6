use std::path::Path;

use crate::error::{EnvredisError, Result};

pub const DEFAULT_URL: &str = "redis://localhost:6379";

pub const URL_ENV: &str = "ENVREDIS_REDIS_URL";
pub const KEY_ENV: &str = "ENVREDIS_REDIS_KEY";
pub const POSIX_ENV: &str = "ENVREDIS_POSIX";

/// Settings for one invocation, fixed once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub url: String,
    pub key: String,
    pub posix: bool,
}

impl Config {
    /// Uses `key` when given, otherwise the base name of `cwd`.
    pub fn new(url: String, key: Option<String>, posix: bool, cwd: &Path) -> Result<Self> {
        let key = match key {
            Some(key) => key,
            None => default_key(cwd)?,
        };
        if key.is_empty() {
            return Err(EnvredisError::usage("hash key cannot be empty"));
        }

        Ok(Self { url, key, posix })
    }
}

pub fn default_key(cwd: &Path) -> Result<String> {
    cwd.file_name().map(|name| name.to_string_lossy().into_owned()).ok_or_else(|| {
        EnvredisError::usage(format!(
            "cannot derive a hash key from {}; pass --key or set {KEY_ENV}",
            cwd.display()
        ))
    })
}
