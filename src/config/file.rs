//! TOML configuration file loading
//!
//! Supports `~/.config/zh-audio/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZhAudioConfigFile {
    /// Speech synthesis configuration
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// Translation configuration
    #[serde(default)]
    pub translate: TranslateFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Cache and output locations
    #[serde(default)]
    pub paths: PathsFileConfig,

    /// Retry behaviour for provider calls
    #[serde(default)]
    pub retry: RetryFileConfig,

    /// Runtime configuration
    #[serde(default)]
    pub run: RunFileConfig,
}

/// Speech synthesis configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    /// Provider ("azure" or "google")
    pub provider: Option<String>,

    /// Azure speech endpoint (full `cognitiveservices/v1` URL)
    pub azure_endpoint: Option<String>,

    /// Request-level language code for Google (e.g. "cmn-CN")
    pub google_language_code: Option<String>,

    /// Speaking rate for target-language text
    pub rate: Option<f32>,

    /// Voice for English instructions
    pub narrator_voice: Option<String>,

    /// Target-language voices to choose from
    pub target_voices: Option<Vec<String>>,

    /// Texts that are never sent for synthesis
    pub ignore: Option<Vec<String>>,
}

/// Translation configuration
#[derive(Debug, Default, Deserialize)]
pub struct TranslateFileConfig {
    /// Provider ("deepl" or "google")
    pub provider: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub azure: Option<String>,
    pub google: Option<String>,
    pub deepl: Option<String>,
}

/// Filesystem locations
#[derive(Debug, Default, Deserialize)]
pub struct PathsFileConfig {
    /// Audio cache root
    pub cache_dir: Option<String>,
    /// Deliverable root
    pub out_dir: Option<String>,
}

/// Retry configuration
#[derive(Debug, Default, Deserialize)]
pub struct RetryFileConfig {
    /// Attempts per request, including the first
    pub max_attempts: Option<u32>,
    /// Initial backoff in milliseconds
    pub base_delay_ms: Option<u64>,
    /// Backoff cap in milliseconds
    pub max_delay_ms: Option<u64>,
}

/// Runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct RunFileConfig {
    /// Records processed concurrently
    pub jobs: Option<usize>,
}

/// Load the TOML config file
///
/// An explicit `path` must exist and parse. Without one the standard path is
/// tried, and a missing or broken file falls back to defaults with a warning.
///
/// # Errors
///
/// Returns error if an explicitly given file cannot be read or parsed
pub fn load_config_file(path: Option<&Path>) -> Result<ZhAudioConfigFile> {
    if let Some(path) = path {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(ZhAudioConfigFile::default());
    };

    if !path.exists() {
        return Ok(ZhAudioConfigFile::default());
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                Ok(ZhAudioConfigFile::default())
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            Ok(ZhAudioConfigFile::default())
        }
    }
}

/// Return the config file path: `~/.config/zh-audio/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("zh-audio").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_file_parses() {
        let config: ZhAudioConfigFile = toml::from_str(
            r#"
            [tts]
            provider = "google"
            target_voices = ["zh-CN-XiaoxiaoNeural"]

            [retry]
            max_attempts = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.tts.provider.as_deref(), Some("google"));
        assert_eq!(config.tts.target_voices.unwrap().len(), 1);
        assert_eq!(config.retry.max_attempts, Some(3));
        assert!(config.api_keys.azure.is_none());
        assert!(config.run.jobs.is_none());
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let err = load_config_file(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn explicit_path_must_parse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tts\nprovider = ").unwrap();

        assert!(matches!(load_config_file(Some(&path)), Err(Error::Toml(_))));
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let result: std::result::Result<ZhAudioConfigFile, _> = toml::from_str("[llm]\nmodel = 'x'");
        assert!(result.is_err());
    }

    #[test]
    fn explicit_path_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[paths]\nout_dir = \"/tmp/out\"\n").unwrap();

        let config = load_config_file(Some(&path)).unwrap();
        assert_eq!(config.paths.out_dir.as_deref(), Some("/tmp/out"));
    }
}
