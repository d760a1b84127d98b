use cohort_core::config::{AppConfig, LoadOptions, LogFormat};

/// Render effective configuration values after all layers applied.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let format = match config.logging.format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    };

    [
        "effective config (source precedence: overrides > env > file > default):".to_string(),
        format!("engine.n_clusters = {}", config.engine.n_clusters),
        format!("engine.top_n_cluster = {}", config.engine.top_n_cluster),
        format!("engine.top_n_overall = {}", config.engine.top_n_overall),
        format!("store.artifacts_dir = {}", config.store.artifacts_dir.display()),
        format!("logging.level = {}", config.logging.level),
        format!("logging.format = {format}"),
    ]
    .join("\n")
}
