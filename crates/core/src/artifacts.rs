//! The persisted artifact bundle.
//!
//! Training produces five artifacts (scaler, encoder, k-means model,
//! scored RFM table, clustered order table) that are serialized
//! together and reloaded as one immutable value. The popularity tables
//! and customer lookups are derived on load rather than persisted.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::domain::order::ClusteredOrder;
use crate::domain::rfm::ScoredRfm;
use crate::errors::ArtifactError;
use crate::popularity::{build_popularity, PopularityTables};
use crate::segmentation::{Encoder, KMeans, StandardScaler};

pub const SCALER_FILE: &str = "scaler.json";
pub const ENCODER_FILE: &str = "encoder.json";
pub const KMEANS_FILE: &str = "kmeans.json";
pub const RFM_FILE: &str = "rfm.csv";
pub const ORDERS_FILE: &str = "orders.csv";

/// A complete, immutable artifact set. The resolver borrows this value;
/// nothing in the serving path mutates it, so one bundle can back any
/// number of concurrent requests.
#[derive(Clone, Debug)]
pub struct ArtifactBundle {
    pub scaler: StandardScaler,
    pub encoder: Encoder,
    pub kmeans: KMeans,
    pub rfm: Vec<ScoredRfm>,
    pub orders: Vec<ClusteredOrder>,
    pub popularity: PopularityTables,
    rfm_index: HashMap<String, usize>,
}

impl ArtifactBundle {
    pub fn new(
        scaler: StandardScaler,
        encoder: Encoder,
        kmeans: KMeans,
        rfm: Vec<ScoredRfm>,
        orders: Vec<ClusteredOrder>,
    ) -> Self {
        let popularity = build_popularity(&orders);
        let rfm_index = rfm
            .iter()
            .enumerate()
            .map(|(index, record)| (record.customer_id.clone(), index))
            .collect();
        Self { scaler, encoder, kmeans, rfm, orders, popularity, rfm_index }
    }

    pub fn rfm_for(&self, customer_id: &str) -> Option<&ScoredRfm> {
        self.rfm_index.get(customer_id).map(|index| &self.rfm[*index])
    }

    /// Distinct product names the customer has purchased, in first-seen
    /// order across their order lines.
    pub fn purchased_products(&self, customer_id: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.orders
            .iter()
            .filter(|order| order.customer_id == customer_id)
            .filter(|order| seen.insert(order.product_name.as_str()))
            .map(|order| order.product_name.clone())
            .collect()
    }

    /// Persist every artifact under `dir`. All payloads are encoded in
    /// memory before the first byte hits disk, so an encoding failure
    /// leaves nothing half-written.
    pub fn save(&self, dir: &Path) -> Result<(), ArtifactError> {
        let payloads = vec![
            (dir.join(SCALER_FILE), encode_json(&self.scaler, dir.join(SCALER_FILE))?),
            (dir.join(ENCODER_FILE), encode_json(&self.encoder, dir.join(ENCODER_FILE))?),
            (dir.join(KMEANS_FILE), encode_json(&self.kmeans, dir.join(KMEANS_FILE))?),
            (dir.join(RFM_FILE), encode_csv(&self.rfm, dir.join(RFM_FILE))?),
            (dir.join(ORDERS_FILE), encode_csv(&self.orders, dir.join(ORDERS_FILE))?),
        ];

        fs::create_dir_all(dir)
            .map_err(|source| ArtifactError::Write { path: dir.to_path_buf(), source })?;
        for (path, bytes) in payloads {
            fs::write(&path, bytes)
                .map_err(|source| ArtifactError::Write { path: path.clone(), source })?;
        }

        info!(dir = %dir.display(), "saved artifact bundle");
        Ok(())
    }

    /// Reload a complete bundle. Any absent or undecodable component
    /// fails the load; serving never proceeds from partial state.
    pub fn load(dir: &Path) -> Result<Self, ArtifactError> {
        let scaler: StandardScaler = read_json(&dir.join(SCALER_FILE))?;
        let encoder: Encoder = read_json(&dir.join(ENCODER_FILE))?;
        let kmeans: KMeans = read_json(&dir.join(KMEANS_FILE))?;
        let rfm: Vec<ScoredRfm> = read_csv(&dir.join(RFM_FILE))?;
        let orders: Vec<ClusteredOrder> = read_csv(&dir.join(ORDERS_FILE))?;

        info!(
            dir = %dir.display(),
            customers = rfm.len(),
            order_lines = orders.len(),
            "loaded artifact bundle"
        );
        Ok(Self::new(scaler, encoder, kmeans, rfm, orders))
    }
}

fn encode_json<T: Serialize>(value: &T, path: PathBuf) -> Result<Vec<u8>, ArtifactError> {
    serde_json::to_vec_pretty(value)
        .map_err(|error| ArtifactError::Encode { path, message: error.to_string() })
}

fn encode_csv<T: Serialize>(rows: &[T], path: PathBuf) -> Result<Vec<u8>, ArtifactError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|error| ArtifactError::Encode { path: path.clone(), message: error.to_string() })?;
    }
    writer
        .into_inner()
        .map_err(|error| ArtifactError::Encode { path, message: error.to_string() })
}

fn read_file(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing { path: path.to_path_buf() });
    }
    fs::read(path).map_err(|source| ArtifactError::Read { path: path.to_path_buf(), source })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = read_file(path)?;
    serde_json::from_slice(&bytes)
        .map_err(|error| ArtifactError::Decode { path: path.to_path_buf(), message: error.to_string() })
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ArtifactError> {
    let bytes = read_file(path)?;
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    reader
        .deserialize()
        .map(|row| {
            row.map_err(|error| ArtifactError::Decode {
                path: path.to_path_buf(),
                message: error.to_string(),
            })
        })
        .collect()
}
