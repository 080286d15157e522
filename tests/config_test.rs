use std::fs;

use tempfile::TempDir;

use lexis::config::Settings;

#[test]
fn file_values_override_defaults() -> anyhow::Result<()> {
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
  max_text_length: 500
"#,
    )?;

    let settings = Settings::from_file(&path)?;
    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 9100);
    assert!(settings.server.cors_enabled);
    assert_eq!(settings.ollama.model, "llama3.2:3b");
    assert_eq!(settings.text.max_text_length, 500);

    // Sections the file does not mention keep their defaults
    assert_eq!(settings.ollama.port, 11434);
    assert_eq!(settings.generation.max_tokens, 2000);
    Ok(())
}

#[test]
fn missing_sections_fall_back_to_defaults() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.yaml");
    fs::write(&path, "logging:\n  level: debug\n")?;

    let settings = Settings::from_file(&path)?;
    assert_eq!(settings.server.host, "localhost");
    assert_eq!(settings.server.port, 8000);
    assert_eq!(settings.logging.level, "debug");
    Ok(())
}

#[test]
fn explicit_missing_path_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.yaml");

    let err = Settings::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn invalid_values_fail_validation_on_load() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        r#"
server:
  host: localhost
  port: 0
generation:
  temperature: 9.9
"#,
    )?;

    let err = Settings::from_file(&path).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("server.port"));
    assert!(message.contains("generation.temperature"));
    Ok(())
}

#[test]
fn update_rejects_invalid_replacement_and_keeps_current() {
    let mut settings = Settings::default();

    let mut bad = Settings::default();
    bad.generation.temperature = 9.9;
    assert!(settings.update(bad).is_err());
    assert_eq!(settings.generation.temperature, 0.1);

    let mut good = Settings::default();
    good.generation.temperature = 0.7;
    settings.update(good).unwrap();
    assert_eq!(settings.generation.temperature, 0.7);
}

#[test]
fn rendered_yaml_loads_back_unchanged() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.yaml");

    let defaults = Settings::default();
    fs::write(&path, defaults.to_yaml()?)?;

    let reloaded = Settings::from_file(&path)?;
    assert_eq!(reloaded.server.host, defaults.server.host);
    assert_eq!(reloaded.server.port, defaults.server.port);
    assert_eq!(reloaded.ollama.model, defaults.ollama.model);
    assert_eq!(reloaded.text.chunk_size, defaults.text.chunk_size);
    assert_eq!(reloaded.gpu.max_history, defaults.gpu.max_history);
    Ok(())
}
