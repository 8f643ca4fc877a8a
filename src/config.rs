use std::{env, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};

const DEFAULT_TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub body_limit_bytes: usize,
    pub model_dir: PathBuf,
    pub model_signature: String,
    pub image_size: u32,
    pub ollama_enabled: bool,
    pub ollama_url: String,
    pub ollama_model: String,
    pub translate_url: String,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, falling back to defaults
    /// for keys that are unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let body_limit_mb: usize = parse_var(&lookup, "BODY_LIMIT_MB", 5)?;
        let timeout_secs: u64 = parse_var(&lookup, "HTTP_TIMEOUT_SECS", 60)?;

        let body_limit_bytes = body_limit_mb
            .checked_mul(1024 * 1024)
            .context("BODY_LIMIT_MB is too large")?;

        let image_size: u32 = parse_var(&lookup, "IMAGE_SIZE", 224)?;
        if image_size == 0 {
            anyhow::bail!("IMAGE_SIZE must be greater than zero");
        }
        (image_size as usize)
            .checked_mul(image_size as usize)
            .and_then(|pixels| pixels.checked_mul(3))
            .context("IMAGE_SIZE is too large")?;

        Ok(Config {
            port: parse_var(&lookup, "PORT", 5000)?,
            body_limit_bytes,
            model_dir: PathBuf::from(string_var(&lookup, "MODEL_DIR", "model_saved")),
            model_signature: string_var(&lookup, "MODEL_SIGNATURE", "serving_default"),
            image_size,
            ollama_enabled: parse_var(&lookup, "OLLAMA_ENABLED", true)?,
            ollama_url: string_var(&lookup, "OLLAMA_URL", "http://localhost:11434"),
            ollama_model: string_var(&lookup, "OLLAMA_MODEL", "llama3.2:1b"),
            translate_url: string_var(&lookup, "TRANSLATE_URL", DEFAULT_TRANSLATE_URL),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn string_var<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        _ => Ok(default),
    }
}
