//! Serving-time recommendation resolution.
//!
//! `recommend` never fails: every failure mode is a defined fallback
//! branch, so inference problems never surface to the caller.

use std::collections::HashSet;

use tracing::warn;

use crate::artifacts::ArtifactBundle;
use crate::domain::recommendation::{ClusterField, Recommendation, ScoreField, NOT_AVAILABLE};
use crate::domain::rfm::ScoredRfm;
use crate::errors::InferenceError;

pub const SOURCE_NOT_FOUND: &str = "popularity-only (customer not found)";
pub const SOURCE_HYBRID: &str = "hybrid (cluster-based, purchase-filtered)";
pub const SOURCE_CLUSTER_EXHAUSTED: &str = "popularity-based (cluster exhausted)";
pub const SOURCE_INFERENCE_ERROR: &str =
    "error during cluster processing; falling back to popularity";

/// Per-request recommendation counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecommendOptions {
    pub top_n_cluster: usize,
    pub top_n_overall: usize,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self { top_n_cluster: 5, top_n_overall: 5 }
    }
}

/// Resolve recommendations for one customer against a loaded bundle.
///
/// Known customers get their training-time cluster reproduced through
/// the stored scaler, encoder, and centroids; the cluster's top list is
/// filtered against their full purchase history. Unknown customers and
/// inference failures degrade to the global popularity list.
pub fn recommend(
    customer_id: &str,
    bundle: &ArtifactBundle,
    options: &RecommendOptions,
) -> Recommendation {
    let Some(row) = bundle.rfm_for(customer_id) else {
        return popularity_only(
            customer_id,
            bundle,
            options,
            ClusterField::unknown(),
            SOURCE_NOT_FOUND,
        );
    };

    match assign_cluster(row, bundle) {
        Ok(cluster) => resolved(customer_id, row, cluster, bundle, options),
        Err(error) => {
            warn!(
                customer_id,
                error = %error,
                "cluster inference failed; serving popularity fallback"
            );
            popularity_only(
                customer_id,
                bundle,
                options,
                ClusterField::error(),
                SOURCE_INFERENCE_ERROR,
            )
        }
    }
}

/// Reproduce the customer's training-time cluster id from the stored
/// models. Must match the persisted assignment exactly; nothing is
/// re-fitted here.
fn assign_cluster(row: &ScoredRfm, bundle: &ArtifactBundle) -> Result<usize, InferenceError> {
    let standardized = bundle.scaler.transform(&row.features())?;
    let latent = bundle.encoder.embed(&standardized)?;
    bundle.kmeans.predict(&latent)
}

fn resolved(
    customer_id: &str,
    row: &ScoredRfm,
    cluster: usize,
    bundle: &ArtifactBundle,
    options: &RecommendOptions,
) -> Recommendation {
    let purchased = bundle.purchased_products(customer_id);
    let purchased_set: HashSet<&str> = purchased.iter().map(String::as_str).collect();

    let cluster_based: Vec<String> = bundle
        .popularity
        .cluster_top(cluster)
        .iter()
        .filter(|product| !purchased_set.contains(product.as_str()))
        .take(options.top_n_cluster)
        .cloned()
        .collect();

    let recommendation_source =
        if cluster_based.is_empty() { SOURCE_CLUSTER_EXHAUSTED } else { SOURCE_HYBRID };

    let cluster_set: HashSet<&str> = cluster_based.iter().map(String::as_str).collect();
    let overall_popular: Vec<String> = bundle
        .popularity
        .overall
        .iter()
        .filter(|product| {
            !cluster_set.contains(product.as_str()) && !purchased_set.contains(product.as_str())
        })
        .take(options.top_n_overall)
        .cloned()
        .collect();

    Recommendation {
        customer_id: customer_id.to_string(),
        cluster: ClusterField::Assigned(cluster),
        recommendation_source: recommendation_source.to_string(),
        cluster_based_recommendations: cluster_based,
        overall_popular_recommendations: overall_popular,
        r_score: ScoreField::Known(row.r_score),
        f_score: ScoreField::Known(row.f_score),
        m_score: ScoreField::Known(row.m_score),
        rfm_segment_label: row.segment_label.clone(),
        purchased_products: purchased,
    }
}

/// The fallback shape shared by the not-found and inference-error
/// branches: unfiltered global top-N, no purchase history, sentinel RFM
/// fields.
fn popularity_only(
    customer_id: &str,
    bundle: &ArtifactBundle,
    options: &RecommendOptions,
    cluster: ClusterField,
    source: &str,
) -> Recommendation {
    Recommendation {
        customer_id: customer_id.to_string(),
        cluster,
        recommendation_source: source.to_string(),
        cluster_based_recommendations: Vec::new(),
        overall_popular_recommendations: bundle
            .popularity
            .overall
            .iter()
            .take(options.top_n_overall)
            .cloned()
            .collect(),
        r_score: ScoreField::not_available(),
        f_score: ScoreField::not_available(),
        m_score: ScoreField::not_available(),
        rfm_segment_label: NOT_AVAILABLE.to_string(),
        purchased_products: Vec::new(),
    }
}
