use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::{Deserialize, Serialize};

pub mod validator;

/// Process-wide settings, loaded once at startup.
///
/// Shared read-only through `Arc<RwLock<Settings>>`; the only mutation path
/// is [`Settings::update`], which validates the complete replacement before
/// swapping it in.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub ollama: OllamaSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub text: TextSettings,
    #[serde(default)]
    pub cleaning: CleaningSettings,
    #[serde(default)]
    pub gpu: GpuSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OllamaSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_ollama_port")]
    pub port: u16,
    #[serde(default = "default_model")]
    pub model: String,
    /// Upper bound on any single model call, in seconds
    #[serde(default = "default_ollama_timeout")]
    pub timeout_seconds: u64,
}

impl OllamaSettings {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationSettings {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TextSettings {
    /// Ceiling on free-text tool input, in characters
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    /// Summarization chunk size, in characters (chunks break at word boundaries)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

/// Defaults for the `clean_text` tool when the caller does not choose.
/// Both are off unless set; stripping URLs or emails is an explicit opt-in.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleaningSettings {
    #[serde(default)]
    pub remove_urls: bool,
    #[serde(default)]
    pub remove_emails: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GpuSettings {
    /// Bounded metrics history cap; oldest samples are evicted first
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Background sampling period, in seconds
    #[serde(default = "default_sample_interval")]
    pub sample_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_ollama_port() -> u16 {
    11434
}

fn default_model() -> String {
    "qwen2.5:14b".to_string()
}

fn default_ollama_timeout() -> u64 {
    300
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_max_text_length() -> usize {
    100_000
}

fn default_chunk_size() -> usize {
    1000
}

fn default_max_history() -> usize {
    1000
}

fn default_sample_interval() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn home_subdir(name: &str) -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lexis")
        .join(name)
}

fn default_data_dir() -> PathBuf {
    home_subdir("data")
}

fn default_cache_dir() -> PathBuf {
    home_subdir("cache")
}

fn default_models_dir() -> PathBuf {
    home_subdir("models")
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 8000,
            cors_enabled: true,
        }
    }
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_ollama_port(),
            model: default_model(),
            timeout_seconds: default_ollama_timeout(),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            max_text_length: default_max_text_length(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for CleaningSettings {
    fn default() -> Self {
        Self {
            remove_urls: false,
            remove_emails: false,
        }
    }
}

impl Default for GpuSettings {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            sample_interval_seconds: default_sample_interval(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            data_dir: default_data_dir(),
            cache_dir: default_cache_dir(),
            models_dir: default_models_dir(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            ollama: OllamaSettings::default(),
            generation: GenerationSettings::default(),
            text: TextSettings::default(),
            cleaning: CleaningSettings::default(),
            gpu: GpuSettings::default(),
            logging: LoggingSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings using the standard search order:
    /// explicit path, `./config.yaml`, `./config.yml`, `~/.lexis/config.yaml`,
    /// `/etc/lexis/config.yaml`, else pure defaults.
    ///
    /// An explicit path that does not exist is an error; discovered paths are
    /// only used when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, anyhow::Error> {
        if let Some(path) = explicit {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
        }

        let mut builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", 8000)?;

        if let Some(path) = Self::locate_config_file(explicit) {
            builder = builder.add_source(File::from(path));
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validated()
    }

    /// Load settings from an explicit file, failing when it is missing.
    pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        Self::load(Some(path))
    }

    /// First existing config file in search order, if any.
    pub fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        Self::search_paths().into_iter().find(|p| p.exists())
    }

    /// The non-explicit part of the search order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.yaml"), PathBuf::from("config.yml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".lexis").join("config.yaml"));
        }
        paths.push(PathBuf::from("/etc/lexis/config.yaml"));
        paths
    }

    /// Default location for `config create`.
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lexis")
            .join("config.yaml")
    }

    /// Replace the whole settings value, re-validating first.
    ///
    /// An invalid replacement leaves `self` untouched.
    pub fn update(&mut self, new: Settings) -> Result<(), anyhow::Error> {
        let new = new.validated()?;
        *self = new;
        Ok(())
    }

    /// Render as YAML, for `config create` and `config show`.
    pub fn to_yaml(&self) -> Result<String, anyhow::Error> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validated(self) -> Result<Self, anyhow::Error> {
        validator::ConfigValidator::validate(&self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(validator::ConfigValidator::validate(&settings).is_ok());
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.ollama.port, 11434);
        assert_eq!(settings.text.chunk_size, 1000);
        assert!(!settings.cleaning.remove_urls);
        assert!(!settings.cleaning.remove_emails);
    }

    #[test]
    fn loads_yaml_file() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            r#"
server:
  host: 0.0.0.0
  port: 9100
ollama:
  model: llama3.2:3b
text:
  chunk_size: 500
"#,
        )?;

        let settings = Settings::from_file(&path)?;
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.ollama.model, "llama3.2:3b");
        assert_eq!(settings.text.chunk_size, 500);
        // Untouched sections keep their defaults
        assert_eq!(settings.generation.max_tokens, 2000);
        Ok(())
    }

    #[test]
    fn explicit_missing_path_fails() {
        let err = Settings::from_file(Path::new("/nonexistent/lexis.yaml"));
        assert!(err.is_err());
    }

    #[test]
    fn invalid_file_is_rejected() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            r#"
server:
  host: localhost
  port: 8000
generation:
  temperature: 3.5
"#,
        )?;

        assert!(Settings::from_file(&path).is_err());
        Ok(())
    }

    #[test]
    fn update_is_atomic() {
        let mut settings = Settings::default();

        let mut bad = Settings::default();
        bad.generation.temperature = 9.0;
        bad.server.host = "elsewhere".to_string();
        assert!(settings.update(bad).is_err());
        // Rejected update must not leak any field through
        assert_eq!(settings.server.host, "localhost");
        assert_eq!(settings.generation.temperature, 0.1);

        let mut good = Settings::default();
        good.server.port = 9000;
        assert!(settings.update(good).is_ok());
        assert_eq!(settings.server.port, 9000);
    }

    #[test]
    fn yaml_round_trip() -> anyhow::Result<()> {
        let settings = Settings::default();
        let yaml = settings.to_yaml()?;
        let back: Settings = serde_yaml::from_str(&yaml)?;
        assert_eq!(back.server.port, settings.server.port);
        assert_eq!(back.ollama.model, settings.ollama.model);
        Ok(())
    }
}
