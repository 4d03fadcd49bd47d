use recap_core::{ModelSelector, Strategy, SummarizeOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

const CONFIG_VERSION: u32 = 2;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("home directory not found; set HOME or RECAP_HOME")]
    HomeMissing,
    #[error("config io error: {0}")]
    Io(#[from] io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
}

impl ConfigPaths {
    pub fn from_home() -> Result<Self, ConfigError> {
        if let Some(base) = env_override("RECAP_HOME") {
            return Ok(Self::from_base(PathBuf::from(base)));
        }
        let home = std::env::var("HOME").map_err(|_| ConfigError::HomeMissing)?;
        Ok(Self::from_base(PathBuf::from(home).join(".recap")))
    }

    pub fn from_base(base_dir: PathBuf) -> Self {
        let config_path = base_dir.join("config.toml");
        Self {
            base_dir,
            config_path,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    pub server: ServerConfig,
    pub summarize: SummarizeConfig,
    pub engines: EnginesConfig,
    pub transcript: TranscriptConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerConfig::default(),
            summarize: SummarizeConfig::default(),
            engines: EnginesConfig::default(),
            transcript: TranscriptConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizeConfig {
    pub max_length: usize,
    pub min_length: usize,
    pub fallback_words: usize,
    pub chunk_words: usize,
    pub strategy: String,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        let defaults = SummarizeOptions::default();
        Self {
            max_length: defaults.max_length,
            min_length: defaults.min_length,
            fallback_words: defaults.fallback_words,
            chunk_words: defaults.chunk_words,
            strategy: defaults.strategy.to_string(),
        }
    }
}

impl SummarizeConfig {
    pub fn options(&self) -> Result<SummarizeOptions, ConfigError> {
        let strategy: Strategy = self
            .strategy
            .parse()
            .map_err(|err: String| ConfigError::Validation(format!("summarize.{err}")))?;
        Ok(SummarizeOptions {
            max_length: self.max_length,
            min_length: self.min_length,
            fallback_words: self.fallback_words,
            chunk_words: self.chunk_words,
            strategy,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnginesConfig {
    pub bart: EngineConfig,
    pub t5: EngineConfig,
}

impl Default for EnginesConfig {
    fn default() -> Self {
        Self {
            bart: EngineConfig {
                provider: "huggingface".to_string(),
                model: recap_core::engine::DEFAULT_BART_MODEL.to_string(),
                ..EngineConfig::default()
            },
            t5: EngineConfig {
                provider: "huggingface".to_string(),
                model: recap_core::engine::DEFAULT_T5_MODEL.to_string(),
                prefix: Some(recap_core::registry::T5_PREFIX.to_string()),
                input_ceiling: Some(recap_core::registry::T5_INPUT_CEILING),
                ..EngineConfig::default()
            },
        }
    }
}

impl EnginesConfig {
    pub fn get(&self, selector: ModelSelector) -> &EngineConfig {
        match selector {
            ModelSelector::Bart => &self.bart,
            ModelSelector::T5 => &self.t5,
        }
    }
}

/// One engine slot.
///
/// An omitted `prefix` or `input_ceiling` keeps the model family's calling
/// convention. `prefix = ""` and `input_ceiling = 0` turn them off.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_ceiling: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    pub language: String,
    pub base_url: String,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            base_url: "https://www.youtube.com".to_string(),
        }
    }
}

impl Config {
    pub fn load_or_create(paths: &ConfigPaths) -> Result<Self, ConfigError> {
        ensure_dirs(paths)?;
        if paths.config_path.exists() {
            let config = Self::load(paths)?;
            return Ok(config);
        }

        let config = Self::default();
        Self::write(paths, &config)?;
        Ok(config)
    }

    pub fn load(paths: &ConfigPaths) -> Result<Self, ConfigError> {
        ensure_dirs(paths)?;
        let content = fs::read_to_string(&paths.config_path)?;
        let raw: toml::Value = toml::from_str(&content)?;
        let file_version = raw
            .get("version")
            .and_then(|value| value.as_integer())
            .unwrap_or(0) as u32;

        let mut config: Config = toml::from_str(&content)?;
        let mut migrated = false;

        if file_version < CONFIG_VERSION {
            config.version = CONFIG_VERSION;
            migrated = true;
        } else if file_version > CONFIG_VERSION {
            warn!(
                file_version,
                supported = CONFIG_VERSION,
                "config version is newer than supported; proceeding"
            );
        }

        warn_if_loose_permissions(&paths.config_path)?;

        if migrated {
            Self::write(paths, &config)?;
        }

        Ok(config)
    }

    pub fn write(paths: &ConfigPaths, config: &Config) -> Result<(), ConfigError> {
        ensure_dirs(paths)?;
        let content = toml::to_string_pretty(config)?;
        write_atomic(&paths.config_path, content.as_bytes())?;
        Ok(())
    }

    /// Apply environment overrides on top of the file values.
    ///
    /// Overrides are runtime-only and never written back.
    pub fn apply_env_overrides(&mut self) {
        let api_key = env_override("RECAP_HF_API_KEY").or_else(|| env_override("HF_API_TOKEN"));
        if let Some(key) = api_key {
            for engine in [&mut self.engines.bart, &mut self.engines.t5] {
                if engine.api_key.trim().is_empty() {
                    engine.api_key = key.clone();
                }
            }
        }
        if let Some(model) = env_override("RECAP_BART_MODEL") {
            self.engines.bart.model = model;
        }
        if let Some(model) = env_override("RECAP_T5_MODEL") {
            self.engines.t5.model = model;
        }
        if let Some(port) = env_override("RECAP_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %port, "ignoring RECAP_PORT; expected a port number"),
            }
        }
    }

    pub fn redacted(&self) -> Self {
        let mut redacted = self.clone();
        redact_engine(&mut redacted.engines.bart);
        redact_engine(&mut redacted.engines.t5);
        redacted
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.host must not be empty".into(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be greater than 0".into(),
            ));
        }

        let summarize = &self.summarize;
        if summarize.max_length == 0 {
            return Err(ConfigError::Validation(
                "summarize.max_length must be greater than 0".into(),
            ));
        }
        if summarize.min_length > summarize.max_length {
            return Err(ConfigError::Validation(
                "summarize.min_length must be <= max_length".into(),
            ));
        }
        if summarize.fallback_words == 0 {
            return Err(ConfigError::Validation(
                "summarize.fallback_words must be greater than 0".into(),
            ));
        }
        if summarize.chunk_words == 0 {
            return Err(ConfigError::Validation(
                "summarize.chunk_words must be greater than 0".into(),
            ));
        }
        summarize.options()?;

        validate_engine("engines.bart", &self.engines.bart)?;
        validate_engine("engines.t5", &self.engines.t5)?;

        if self.transcript.language.trim().is_empty() {
            return Err(ConfigError::Validation(
                "transcript.language must not be empty".into(),
            ));
        }

        Ok(())
    }
}

fn ensure_dirs(paths: &ConfigPaths) -> Result<(), ConfigError> {
    fs::create_dir_all(&paths.base_dir)?;
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ConfigError> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::other("config path missing parent directory"))?;
    let tmp_path = parent.join("config.toml.tmp");
    fs::write(&tmp_path, contents)?;
    set_strict_permissions(&tmp_path)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn set_strict_permissions(path: &Path) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perm)?;
    }
    Ok(())
}

fn warn_if_loose_permissions(path: &Path) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        let metadata = fs::metadata(path)?;
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            warn!(
                path = %path.display(),
                "config file is group/world readable; set permissions to 0600"
            );
        }
    }
    Ok(())
}

fn env_override(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn validate_engine(label: &str, engine: &EngineConfig) -> Result<(), ConfigError> {
    match engine.provider.as_str() {
        "huggingface" => {
            if engine.model.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{label}.model must not be empty when {label}.provider=huggingface"
                )));
            }
        }
        "extractive" => {}
        other => {
            return Err(ConfigError::Validation(format!(
                "{label}.provider must be huggingface or extractive (got {other})"
            )));
        }
    }
    let base_url = engine.base_url.trim();
    if !base_url.is_empty() && !base_url.starts_with("http://") && !base_url.starts_with("https://")
    {
        return Err(ConfigError::Validation(format!(
            "{label}.base_url must start with http:// or https://"
        )));
    }
    Ok(())
}

fn redact_engine(engine: &mut EngineConfig) {
    if !engine.api_key.trim().is_empty() {
        engine.api_key = "<redacted>".to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::{CONFIG_VERSION, Config, ConfigPaths};
    use recap_core::Strategy;
    use std::fs;

    #[test]
    fn load_or_create_writes_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path().join("recap");
        let paths = ConfigPaths::from_base(base);
        let config = Config::load_or_create(&paths).unwrap();

        assert!(paths.config_path.exists());
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.engines.bart.model, "facebook/bart-large-cnn");
        assert_eq!(config.engines.t5.prefix.as_deref(), Some("summarize: "));
        assert_eq!(config.engines.t5.input_ceiling, Some(1500));
        assert_eq!(config.summarize.max_length, 300);
        config.validate().unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&paths.config_path)
                .unwrap()
                .permissions()
                .mode()
                & 0o777;
            assert_eq!(mode, 0o600);
        }
    }

    #[test]
    fn load_updates_version_and_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path().join("recap");
        let paths = ConfigPaths::from_base(base);
        fs::create_dir_all(&paths.base_dir).unwrap();
        let content = r#"version = 1

[server]
port = 9000

[engines.bart]
provider = "extractive"
"#;
        fs::write(&paths.config_path, content).unwrap();

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.engines.bart.provider, "extractive");
        assert_eq!(config.engines.t5.model, "t5-small");

        let updated = fs::read_to_string(&paths.config_path).unwrap();
        assert!(updated.contains(&format!("version = {CONFIG_VERSION}")));
        assert!(updated.contains("[engines.t5]"));
    }

    #[test]
    fn redacted_hides_api_keys() {
        let mut config = Config::default();
        config.engines.bart.api_key = "secret".to_string();
        let redacted = config.redacted();
        assert_eq!(redacted.engines.bart.api_key, "<redacted>");
        assert_eq!(redacted.engines.t5.api_key, "");
    }

    #[test]
    fn validate_rejects_inconsistent_values() {
        let mut config = Config::default();
        config.engines.t5.provider = "bad".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.summarize.min_length = 400;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.summarize.strategy = "parallel".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engines.bart.base_url = "localhost:8080".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn summarize_section_converts_to_options() {
        let mut config = Config::default();
        config.summarize.strategy = "chunked".to_string();
        config.summarize.chunk_words = 120;
        let options = config.summarize.options().unwrap();
        assert_eq!(options.strategy, Strategy::Chunked);
        assert_eq!(options.chunk_words, 120);
        assert_eq!(options.fallback_words, 500);
    }
}
