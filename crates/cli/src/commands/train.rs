use std::path::PathBuf;

use cohort_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use cohort_core::{train_from_workbook, PipelineError, TrainingOptions};

use crate::commands::CommandResult;

#[derive(Debug, Clone)]
pub struct TrainArgs {
    pub source: PathBuf,
    pub artifacts: Option<PathBuf>,
    pub clusters: Option<usize>,
}

pub fn run(args: &TrainArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions {
        overrides: ConfigOverrides {
            n_clusters: args.clusters,
            artifacts_dir: args.artifacts.clone(),
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "train",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let options = TrainingOptions { n_clusters: config.engine.n_clusters };
    let bundle = match train_from_workbook(&args.source, &options) {
        Ok(bundle) => bundle,
        Err(PipelineError::Load(error)) => {
            return CommandResult::failure("train", "workbook_load", error.to_string(), 3);
        }
        Err(PipelineError::Training(error)) => {
            return CommandResult::failure("train", "training", error.to_string(), 4);
        }
        Err(PipelineError::Artifact(error)) => {
            return CommandResult::failure("train", "artifact_io", error.to_string(), 5);
        }
    };

    if let Err(error) = bundle.save(&config.store.artifacts_dir) {
        return CommandResult::failure("train", "artifact_io", error.to_string(), 5);
    }

    CommandResult::success(
        "train",
        format!(
            "trained {} customers into {} clusters from {} order lines; artifacts in `{}`",
            bundle.rfm.len(),
            bundle.kmeans.n_clusters(),
            bundle.orders.len(),
            config.store.artifacts_dir.display()
        ),
    )
}
