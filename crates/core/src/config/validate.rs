use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - At least one client profile, none with blank fields
/// - Subscriber queues hold at least one update
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.fallback.profiles.is_empty() {
        return Err(ConfigError::ValidationError(
            "fallback.profiles must list at least one client profile".to_string(),
        ));
    }

    let all_profiles = config
        .fallback
        .profiles
        .iter()
        .chain(std::iter::once(&config.fallback.info_profile));
    for profile in all_profiles {
        if profile.name.trim().is_empty() || profile.extractor_args.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "client profile '{}' needs both a name and extractor_args",
                profile.name
            )));
        }
    }

    if config.jobs.subscriber_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "jobs.subscriber_capacity cannot be 0".to_string(),
        ));
    }

    Ok(())
}
