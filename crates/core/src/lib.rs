//! Cohort core: retail customer segmentation and recommendation.
//!
//! The offline training pass flows strictly forward: workbook loader,
//! RFM aggregation, quintile scoring and autoencoder + k-means
//! segmentation, artifact persistence. Serving loads the persisted
//! bundle read-only and resolves per-customer recommendations from it.

pub mod artifacts;
pub mod config;
pub mod domain;
pub mod errors;
pub mod loader;
pub mod popularity;
pub mod resolver;
pub mod rfm;
pub mod segmentation;
pub mod training;

pub use artifacts::ArtifactBundle;
pub use domain::order::{ClusteredOrder, Order, RawOrder, SalesCategory};
pub use domain::recommendation::{ClusterField, Recommendation, ScoreField};
pub use domain::rfm::{RfmRecord, ScoredRfm};
pub use errors::{ArtifactError, InferenceError, LoadError, PipelineError, TrainingError};
pub use resolver::{recommend, RecommendOptions};
pub use training::{build_bundle, train_from_workbook, TrainingOptions};
