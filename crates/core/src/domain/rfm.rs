use serde::{Deserialize, Serialize};

/// Per-customer Recency/Frequency/Monetary aggregate, before scoring.
#[derive(Clone, Debug, PartialEq)]
pub struct RfmRecord {
    pub customer_id: String,
    /// Days between the customer's latest order and the dataset-wide
    /// reference date (max order date + 1 day).
    pub recency_days: i64,
    /// Count of distinct order ids; a multi-line order counts once.
    pub frequency: u64,
    /// Sum of sales across all of the customer's order lines.
    pub monetary: f64,
}

impl RfmRecord {
    /// Raw feature vector fed to the scaler/encoder.
    pub fn features(&self) -> Vec<f64> {
        vec![self.recency_days as f64, self.frequency as f64, self.monetary]
    }
}

/// RFM record with quintile scores, segment labels, and the cluster
/// assignment attached. One row per customer in the scored table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredRfm {
    pub customer_id: String,
    pub recency_days: i64,
    pub frequency: u64,
    pub monetary: f64,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    /// Concatenated score digits, e.g. `"545"`.
    pub segment_code: String,
    /// Summed R+F+M score.
    pub score_total: u8,
    pub segment_label: String,
    pub cluster: usize,
}

impl ScoredRfm {
    pub fn features(&self) -> Vec<f64> {
        vec![self.recency_days as f64, self.frequency as f64, self.monetary]
    }
}
