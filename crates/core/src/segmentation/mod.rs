//! Customer segmentation: quintile RFM scoring, rule-table labels, and
//! autoencoder + k-means clustering of the latent space.

pub mod autoencoder;
pub mod kmeans;
pub mod scaler;
pub mod scoring;

use tracing::info;

pub use autoencoder::{Autoencoder, Encoder};
pub use kmeans::KMeans;
pub use scaler::StandardScaler;
pub use scoring::{quantile_scores, segment_label, SEGMENT_RULES};

use crate::domain::rfm::{RfmRecord, ScoredRfm};
use crate::errors::TrainingError;

/// Default training-time cluster count.
pub const DEFAULT_CLUSTERS: usize = 3;
/// Seed for weight init, epoch shuffling, and k-means restarts.
pub const TRAINING_SEED: u64 = 42;

/// Everything the offline fit produces: the scored table plus the three
/// models needed to reproduce cluster assignments at serving time.
#[derive(Clone, Debug)]
pub struct Segmentation {
    pub rfm: Vec<ScoredRfm>,
    pub scaler: StandardScaler,
    pub encoder: Encoder,
    pub kmeans: KMeans,
}

/// Score, embed, and cluster the RFM table.
pub fn fit_segmentation(
    rfm: Vec<RfmRecord>,
    n_clusters: usize,
) -> Result<Segmentation, TrainingError> {
    if rfm.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    if n_clusters == 0 || n_clusters > rfm.len() {
        return Err(TrainingError::InvalidClusterCount {
            requested: n_clusters,
            customers: rfm.len(),
        });
    }
    for record in &rfm {
        if !record.monetary.is_finite() {
            return Err(TrainingError::NonFiniteFeature {
                customer_id: record.customer_id.clone(),
            });
        }
    }

    let recency: Vec<f64> = rfm.iter().map(|record| record.recency_days as f64).collect();
    let frequency: Vec<f64> = rfm.iter().map(|record| record.frequency as f64).collect();
    let monetary: Vec<f64> = rfm.iter().map(|record| record.monetary).collect();

    let r_scores = quantile_scores(&recency, true);
    let f_scores = quantile_scores(&frequency, false);
    let m_scores = quantile_scores(&monetary, false);

    let features: Vec<Vec<f64>> = rfm.iter().map(RfmRecord::features).collect();
    let scaler = StandardScaler::fit(&features)?;
    let standardized = features
        .iter()
        .map(|row| scaler.transform(row))
        .collect::<Result<Vec<_>, _>>()
        .map_err(TrainingError::from)?;

    let mut autoencoder = Autoencoder::new(TRAINING_SEED);
    let reconstruction_loss = autoencoder.train(&standardized, TRAINING_SEED)?;
    let encoder = autoencoder.into_encoder();

    let embeddings = standardized
        .iter()
        .map(|row| encoder.embed(row))
        .collect::<Result<Vec<_>, _>>()
        .map_err(TrainingError::from)?;
    let (kmeans, assignments) = KMeans::fit(&embeddings, n_clusters, TRAINING_SEED)?;

    let scored = rfm
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let (r_score, f_score, m_score) = (r_scores[index], f_scores[index], m_scores[index]);
            ScoredRfm {
                segment_code: format!("{r_score}{f_score}{m_score}"),
                score_total: r_score + f_score + m_score,
                segment_label: segment_label(r_score, f_score, m_score).to_string(),
                cluster: assignments[index],
                customer_id: record.customer_id,
                recency_days: record.recency_days,
                frequency: record.frequency,
                monetary: record.monetary,
                r_score,
                f_score,
                m_score,
            }
        })
        .collect::<Vec<_>>();

    info!(
        customers = scored.len(),
        clusters = n_clusters,
        reconstruction_loss,
        "fitted segmentation models"
    );

    Ok(Segmentation { rfm: scored, scaler, encoder, kmeans })
}

#[cfg(test)]
mod tests {
    use super::{fit_segmentation, DEFAULT_CLUSTERS};
    use crate::domain::rfm::RfmRecord;
    use crate::errors::TrainingError;

    fn rfm_table() -> Vec<RfmRecord> {
        (0..15)
            .map(|index| RfmRecord {
                customer_id: format!("CU-{index:04}"),
                recency_days: 5 + index * 25,
                frequency: 1 + (index as u64 % 7),
                monetary: 50.0 + index as f64 * 180.0,
            })
            .collect()
    }

    #[test]
    fn fit_produces_one_scored_row_per_customer() {
        let table = rfm_table();
        let segmentation =
            fit_segmentation(table.clone(), DEFAULT_CLUSTERS).expect("fit succeeds");

        assert_eq!(segmentation.rfm.len(), table.len());
        for row in &segmentation.rfm {
            assert!((1..=5).contains(&row.r_score));
            assert!((1..=5).contains(&row.f_score));
            assert!((1..=5).contains(&row.m_score));
            assert_eq!(row.score_total, row.r_score + row.f_score + row.m_score);
            assert_eq!(
                row.segment_code,
                format!("{}{}{}", row.r_score, row.f_score, row.m_score)
            );
            assert!(row.cluster < DEFAULT_CLUSTERS);
            assert!(!row.segment_label.is_empty());
        }
    }

    #[test]
    fn most_recent_customers_earn_the_top_recency_score() {
        let segmentation = fit_segmentation(rfm_table(), 2).expect("fit succeeds");
        let newest =
            segmentation.rfm.iter().min_by_key(|row| row.recency_days).expect("rows exist");
        let oldest =
            segmentation.rfm.iter().max_by_key(|row| row.recency_days).expect("rows exist");
        assert_eq!(newest.r_score, 5);
        assert_eq!(oldest.r_score, 1);
    }

    #[test]
    fn identical_customers_collapse_to_a_single_score_level() {
        let table: Vec<RfmRecord> = (0..8)
            .map(|index| RfmRecord {
                customer_id: format!("CU-{index:04}"),
                recency_days: 30,
                frequency: 4,
                monetary: 500.0,
            })
            .collect();

        let segmentation = fit_segmentation(table, 2).expect("degenerate bins must not error");
        for row in &segmentation.rfm {
            assert_eq!((row.r_score, row.f_score, row.m_score), (1, 1, 1));
        }
    }

    #[test]
    fn rejects_empty_table_and_bad_cluster_count() {
        assert!(matches!(fit_segmentation(Vec::new(), 3), Err(TrainingError::EmptyDataset)));

        let result = fit_segmentation(rfm_table(), 0);
        assert!(matches!(
            result,
            Err(TrainingError::InvalidClusterCount { requested: 0, customers: 15 })
        ));
    }
}
