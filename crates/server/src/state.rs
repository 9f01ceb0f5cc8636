use mediagrab_core::{Config, JobManager};

/// Shared application state
pub struct AppState {
    config: Config,
    manager: JobManager,
}

impl AppState {
    pub fn new(config: Config, manager: JobManager) -> Self {
        Self { config, manager }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &JobManager {
        &self.manager
    }
}
