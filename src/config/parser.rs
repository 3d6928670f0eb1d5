use std::path::Path;
use crate::errors::FlagbotError;
use super::schema::CONFIG_SCHEMA;
use super::types::{FlagbotConfig, OraclePolicy};
use tracing::warn;

pub async fn parse_config(path: &Path) -> Result<FlagbotConfig, FlagbotError> {
    if !path.exists() {
        return Err(FlagbotError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(FlagbotError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&content)?;

    // JSON Schema validation
    validate_schema(&yaml)?;

    // Parse into typed config
    let config: FlagbotConfig = serde_yaml::from_value(yaml)?;

    // Semantic validation
    validate_semantics(&config)?;

    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), FlagbotError> {
    // Convert YAML value to JSON for schema validation
    let json_str = serde_json::to_string(yaml)
        .map_err(|e| FlagbotError::Config(format!("Config conversion error: {}", e)))?;
    let json_value: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| FlagbotError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| FlagbotError::Config(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        // Warn but don't fail — schema validation is advisory
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

/// Detect semantic problems the schema cannot express.
fn validate_semantics(config: &FlagbotConfig) -> Result<(), FlagbotError> {
    if config.oracle.policy == OraclePolicy::Exact {
        let has_flag = config.oracle.flag.as_ref().map_or(false, |f| !f.is_empty());
        if !has_flag {
            return Err(FlagbotError::Config(
                "Oracle policy 'exact' requires a non-empty flag literal".into(),
            ));
        }
    }

    if config.scheduler.poll_interval_secs == 0 {
        return Err(FlagbotError::Config("poll_interval_secs must be at least 1".into()));
    }

    if config.browser.hard_timeout_ms == 0 {
        return Err(FlagbotError::Config("hard_timeout_ms must be at least 1".into()));
    }

    reqwest::Url::parse(&config.challenge.base_url)
        .map_err(|e| FlagbotError::Config(format!("Invalid challenge base_url: {}", e)))?;
    reqwest::Url::parse(&config.scoring.endpoint)
        .map_err(|e| FlagbotError::Config(format!("Invalid scoring endpoint: {}", e)))?;

    // The hard wall clock caps the whole drive; a settle window beyond it
    // can never be reached.
    if config.browser.settle_timeout_ms > config.browser.hard_timeout_ms {
        warn!(
            settle_ms = config.browser.settle_timeout_ms,
            hard_ms = config.browser.hard_timeout_ms,
            "settle_timeout_ms exceeds hard_timeout_ms; the hard limit will cut renders short"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_parse_minimal_config() {
        let file = write_temp_config("database:\n  path: /tmp/test.db\n");
        let config = parse_config(file.path()).await.unwrap();
        assert_eq!(config.database.path, "/tmp/test.db");
        assert_eq!(config.oracle.policy, OraclePolicy::Exact);
    }

    #[tokio::test]
    async fn test_parse_structural_policy_without_flag() {
        let file = write_temp_config("oracle:\n  policy: structural\n  flag: null\n");
        let config = parse_config(file.path()).await.unwrap();
        assert_eq!(config.oracle.policy, OraclePolicy::Structural);
        assert!(config.oracle.flag.is_none());
    }

    #[tokio::test]
    async fn test_exact_policy_requires_flag() {
        let file = write_temp_config("oracle:\n  policy: exact\n  flag: null\n");
        let result = parse_config(file.path()).await;
        assert!(matches!(result, Err(FlagbotError::Config(_))));
    }

    #[tokio::test]
    async fn test_exact_policy_rejects_empty_flag() {
        let file = write_temp_config("oracle:\n  policy: exact\n  flag: \"\"\n");
        assert!(parse_config(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let file = write_temp_config("scheduler:\n  poll_interval_secs: 0\n  launch_retries: 1\n");
        assert!(parse_config(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_base_url_rejected() {
        let file = write_temp_config("challenge:\n  base_url: \"not a url\"\n  param: payload\n");
        assert!(parse_config(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = parse_config(Path::new("/nonexistent/flagbot.yaml")).await;
        assert!(matches!(result, Err(FlagbotError::Config(_))));
    }
}
