use std::path::PathBuf;

use cohort_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use cohort_core::{recommend, ArtifactBundle, RecommendOptions};

use crate::commands::CommandResult;

#[derive(Debug, Clone)]
pub struct RecommendArgs {
    pub customer_id: String,
    pub artifacts: Option<PathBuf>,
    pub top_n_cluster: Option<usize>,
    pub top_n_overall: Option<usize>,
}

/// Resolve one customer and print the recommendation record as JSON.
/// The record itself is the command output; failures use the shared
/// outcome envelope.
pub fn run(args: &RecommendArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions {
        overrides: ConfigOverrides {
            artifacts_dir: args.artifacts.clone(),
            top_n_cluster: args.top_n_cluster,
            top_n_overall: args.top_n_overall,
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "recommend",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let bundle = match ArtifactBundle::load(&config.store.artifacts_dir) {
        Ok(bundle) => bundle,
        Err(error) => {
            return CommandResult::failure("recommend", "artifact_load", error.to_string(), 3);
        }
    };

    let options = RecommendOptions {
        top_n_cluster: config.engine.top_n_cluster,
        top_n_overall: config.engine.top_n_overall,
    };
    let recommendation = recommend(&args.customer_id, &bundle, &options);

    match serde_json::to_string_pretty(&recommendation) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => {
            CommandResult::failure("recommend", "serialization", error.to_string(), 6)
        }
    }
}
