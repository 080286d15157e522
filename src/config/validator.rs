use thiserror::Error;

use crate::config::{
    GenerationSettings, GpuSettings, LoggingSettings, OllamaSettings, ServerSettings, Settings,
    TextSettings,
};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the whole settings value, collecting every violation rather
    /// than stopping at the first.
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_server(&settings.server) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_ollama(&settings.ollama) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_generation(&settings.generation) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_text(&settings.text) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_gpu(&settings.gpu) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_logging(&settings.logging) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        // u16 bounds the upper end at 65535

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_ollama(ollama: &OllamaSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if ollama.host.is_empty() {
            errors.push(ValidationError::MissingField("ollama.host".to_string()));
        }

        if ollama.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "ollama.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if ollama.model.is_empty() {
            errors.push(ValidationError::MissingField("ollama.model".to_string()));
        }

        if ollama.timeout_seconds == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "ollama.timeout_seconds".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_generation(generation: &GenerationSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !(0.0..=2.0).contains(&generation.temperature) {
            errors.push(ValidationError::InvalidValue {
                field: "generation.temperature".to_string(),
                reason: format!(
                    "Temperature must be between 0.0 and 2.0, got {}",
                    generation.temperature
                ),
            });
        }

        if generation.max_tokens == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "generation.max_tokens".to_string(),
                reason: "Max tokens must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_text(text: &TextSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if text.max_text_length == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "text.max_text_length".to_string(),
                reason: "Max text length must be greater than 0".to_string(),
            });
        }

        if text.chunk_size == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "text.chunk_size".to_string(),
                reason: "Chunk size must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_gpu(gpu: &GpuSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if gpu.max_history == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "gpu.max_history".to_string(),
                reason: "History cap must be greater than 0".to_string(),
            });
        }

        if gpu.sample_interval_seconds == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "gpu.sample_interval_seconds".to_string(),
                reason: "Sample interval must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_logging(logging: &LoggingSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(ValidationError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!(
                    "Level must be one of {}, got '{}'",
                    LOG_LEVELS.join(", "),
                    logging.level
                ),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
