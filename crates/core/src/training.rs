//! The offline training pass: Loader → RFM → Segmentation → artifact
//! bundle. Serving never calls into this module.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::artifacts::ArtifactBundle;
use crate::domain::order::{ClusteredOrder, Order};
use crate::errors::{PipelineError, TrainingError};
use crate::loader::load_orders;
use crate::rfm::compute_rfm;
use crate::segmentation::{fit_segmentation, DEFAULT_CLUSTERS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrainingOptions {
    pub n_clusters: usize,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self { n_clusters: DEFAULT_CLUSTERS }
    }
}

/// Run the full training pass against a source workbook. The returned
/// bundle is complete and ready to save; persisting it is the caller's
/// step so the artifact directory swap stays atomic at the bundle level.
pub fn train_from_workbook(
    source: &Path,
    options: &TrainingOptions,
) -> Result<ArtifactBundle, PipelineError> {
    let orders = load_orders(source)?;
    let bundle = build_bundle(orders, options)?;
    info!(
        source = %source.display(),
        customers = bundle.rfm.len(),
        clusters = bundle.kmeans.n_clusters(),
        "training pass complete"
    );
    Ok(bundle)
}

/// Fit everything downstream of the loader. Orders from customers that
/// did not survive RFM aggregation are dropped when cluster ids are
/// joined back on.
pub fn build_bundle(
    orders: Vec<Order>,
    options: &TrainingOptions,
) -> Result<ArtifactBundle, TrainingError> {
    let rfm = compute_rfm(&orders);
    let segmentation = fit_segmentation(rfm, options.n_clusters)?;

    let cluster_by_customer: HashMap<&str, usize> = segmentation
        .rfm
        .iter()
        .map(|row| (row.customer_id.as_str(), row.cluster))
        .collect();
    let clustered: Vec<ClusteredOrder> = orders
        .iter()
        .filter_map(|order| {
            cluster_by_customer
                .get(order.customer_id.as_str())
                .map(|cluster| ClusteredOrder::from_order(order, *cluster))
        })
        .collect();

    Ok(ArtifactBundle::new(
        segmentation.scaler,
        segmentation.encoder,
        segmentation.kmeans,
        segmentation.rfm,
        clustered,
    ))
}
