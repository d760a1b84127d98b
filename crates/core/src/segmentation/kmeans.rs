//! K-means over the latent embeddings.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::errors::{InferenceError, TrainingError};

/// Independent restarts; the run with the lowest inertia wins.
pub const N_INIT: usize = 10;
/// Lloyd-iteration cap per restart.
pub const MAX_ITER: usize = 300;

/// Fitted centroid set. Serving-time assignment is a pure
/// nearest-centroid lookup against these values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    pub centroids: Vec<Vec<f64>>,
}

impl KMeans {
    /// Fit `n_clusters` centroids on `data` and return the model plus
    /// the per-row assignments computed against the final centroids.
    pub fn fit(
        data: &[Vec<f64>],
        n_clusters: usize,
        seed: u64,
    ) -> Result<(Self, Vec<usize>), TrainingError> {
        if data.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        if n_clusters == 0 || n_clusters > data.len() {
            return Err(TrainingError::InvalidClusterCount {
                requested: n_clusters,
                customers: data.len(),
            });
        }
        let dims = data[0].len();
        for row in data {
            if row.len() != dims {
                return Err(InferenceError::DimensionMismatch {
                    expected: dims,
                    actual: row.len(),
                }
                .into());
            }
        }

        let mut best: Option<(Vec<Vec<f64>>, f64)> = None;
        for run in 0..N_INIT {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(run as u64));
            let centroids = lloyd(data, n_clusters, &mut rng);
            let run_inertia = inertia(data, &centroids);
            let improved =
                best.as_ref().map_or(true, |(_, best_inertia)| run_inertia < *best_inertia);
            if improved {
                best = Some((centroids, run_inertia));
            }
        }

        let (centroids, _) = best.unwrap_or((vec![data[0].clone()], 0.0));
        let model = Self { centroids };
        let assignments = data
            .iter()
            .map(|row| model.predict(row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((model, assignments))
    }

    /// Index of the nearest centroid; ties resolve to the lowest index.
    pub fn predict(&self, point: &[f64]) -> Result<usize, InferenceError> {
        let Some(first) = self.centroids.first() else {
            return Err(InferenceError::Unfitted("k-means has no centroids".to_string()));
        };
        if point.len() != first.len() {
            return Err(InferenceError::DimensionMismatch {
                expected: first.len(),
                actual: point.len(),
            });
        }

        let mut nearest = 0;
        let mut nearest_distance = f64::INFINITY;
        for (index, centroid) in self.centroids.iter().enumerate() {
            let distance = squared_distance(point, centroid);
            if distance < nearest_distance {
                nearest = index;
                nearest_distance = distance;
            }
        }
        Ok(nearest)
    }

    pub fn n_clusters(&self) -> usize {
        self.centroids.len()
    }
}

/// One restart: k-means++ seeding followed by Lloyd iterations until the
/// assignments stabilize.
fn lloyd(data: &[Vec<f64>], n_clusters: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = plus_plus_init(data, n_clusters, rng);
    let mut assignments = vec![0usize; data.len()];

    for _ in 0..MAX_ITER {
        let mut changed = false;
        for (row_index, row) in data.iter().enumerate() {
            let mut nearest = 0;
            let mut nearest_distance = f64::INFINITY;
            for (cluster, centroid) in centroids.iter().enumerate() {
                let distance = squared_distance(row, centroid);
                if distance < nearest_distance {
                    nearest = cluster;
                    nearest_distance = distance;
                }
            }
            if assignments[row_index] != nearest {
                assignments[row_index] = nearest;
                changed = true;
            }
        }

        let dims = data[0].len();
        let mut sums = vec![vec![0.0; dims]; n_clusters];
        let mut counts = vec![0usize; n_clusters];
        for (row, cluster) in data.iter().zip(&assignments) {
            counts[*cluster] += 1;
            for (dim, value) in row.iter().enumerate() {
                sums[*cluster][dim] += value;
            }
        }
        for cluster in 0..n_clusters {
            if counts[cluster] == 0 {
                // An emptied cluster reseeds to the point farthest from
                // its current centroid.
                centroids[cluster] = farthest_point(data, &centroids, &assignments);
                changed = true;
            } else {
                for dim in 0..dims {
                    centroids[cluster][dim] = sums[cluster][dim] / counts[cluster] as f64;
                }
            }
        }

        if !changed {
            break;
        }
    }

    centroids
}

fn plus_plus_init(data: &[Vec<f64>], n_clusters: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(n_clusters);
    centroids.push(data[rng.gen_range(0..data.len())].clone());

    while centroids.len() < n_clusters {
        let distances: Vec<f64> = data
            .iter()
            .map(|row| {
                centroids
                    .iter()
                    .map(|centroid| squared_distance(row, centroid))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = distances.iter().sum();

        let next = if total > 0.0 {
            let mut threshold = rng.gen::<f64>() * total;
            let mut chosen = data.len() - 1;
            for (index, distance) in distances.iter().enumerate() {
                threshold -= distance;
                if threshold <= 0.0 {
                    chosen = index;
                    break;
                }
            }
            chosen
        } else {
            rng.gen_range(0..data.len())
        };
        centroids.push(data[next].clone());
    }

    centroids
}

fn farthest_point(
    data: &[Vec<f64>],
    centroids: &[Vec<f64>],
    assignments: &[usize],
) -> Vec<f64> {
    let mut farthest = 0;
    let mut farthest_distance = -1.0;
    for (index, row) in data.iter().enumerate() {
        let distance = squared_distance(row, &centroids[assignments[index]]);
        if distance > farthest_distance {
            farthest = index;
            farthest_distance = distance;
        }
    }
    data[farthest].clone()
}

fn inertia(data: &[Vec<f64>], centroids: &[Vec<f64>]) -> f64 {
    data.iter()
        .map(|row| {
            centroids
                .iter()
                .map(|centroid| squared_distance(row, centroid))
                .fold(f64::INFINITY, f64::min)
        })
        .sum()
}

fn squared_distance(left: &[f64], right: &[f64]) -> f64 {
    left.iter().zip(right).map(|(a, b)| (a - b) * (a - b)).sum()
}
