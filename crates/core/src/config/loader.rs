use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment overrides. Nested keys are joined with `__`, so
/// `MEDIAGRAB_FALLBACK__ATTEMPT_DELAY_MS=0` sets `fallback.attempt_delay_ms`
/// while keys such as `ytdlp_binary` keep their underscores.
pub const ENV_PREFIX: &str = "MEDIAGRAB_";

/// Loads the TOML file at `path`, then applies `MEDIAGRAB_*` overrides.
///
/// Sections missing from the file fall back to their defaults, so an empty
/// file yields the built-in client profile catalogue.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Parses a TOML document without consulting the environment.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[server]
port = 9000

[jobs]
subscriber_capacity = 10
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.jobs.subscriber_capacity, 10);
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
[server]
port = "eighty"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[fallback]\nattempt_delay_ms = \"soon\"").unwrap();

        match load_config(temp_file.path()) {
            Err(ConfigError::ParseError(message)) => {
                assert!(message.contains(&temp_file.path().display().to_string()));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_file_keeps_profile_catalogue() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(
            config.fallback.profiles.len(),
            crate::fallback::default_client_profiles().len()
        );
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/mediagrab.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
host = "127.0.0.1"
port = 3000

[tool]
dependencies_dir = "/opt/mediagrab/bin"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(
            config.tool.dependencies_dir.to_str().unwrap(),
            "/opt/mediagrab/bin"
        );
    }
}
