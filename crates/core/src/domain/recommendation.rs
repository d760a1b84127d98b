use serde::{Deserialize, Serialize};

/// Sentinel used for RFM fields when the customer is unknown or
/// inference failed before the scores could be read.
pub const NOT_AVAILABLE: &str = "N/A";

/// Cluster sentinel for a customer absent from the scored table.
pub const CLUSTER_UNKNOWN: &str = "Unknown";

/// Cluster sentinel when inference failed mid-request.
pub const CLUSTER_ERROR: &str = "Error";

/// Cluster field of the serving record: an assigned id, or a sentinel
/// string on the fallback branches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClusterField {
    Assigned(usize),
    Sentinel(String),
}

impl ClusterField {
    pub fn unknown() -> Self {
        Self::Sentinel(CLUSTER_UNKNOWN.to_string())
    }

    pub fn error() -> Self {
        Self::Sentinel(CLUSTER_ERROR.to_string())
    }
}

/// An R/F/M score in the serving record: a 1-5 integer, or `"N/A"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreField {
    Known(u8),
    Sentinel(String),
}

impl ScoreField {
    pub fn not_available() -> Self {
        Self::Sentinel(NOT_AVAILABLE.to_string())
    }
}

/// The serving-time recommendation record. Field names are a stable
/// contract for any HTTP layer; the struct serializes directly to the
/// wire shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub customer_id: String,
    pub cluster: ClusterField,
    pub recommendation_source: String,
    pub cluster_based_recommendations: Vec<String>,
    pub overall_popular_recommendations: Vec<String>,
    pub r_score: ScoreField,
    pub f_score: ScoreField,
    pub m_score: ScoreField,
    pub rfm_segment_label: String,
    pub purchased_products: Vec<String>,
}
