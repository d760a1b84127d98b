//! Bottleneck autoencoder for RFM dimensionality reduction.
//!
//! A symmetric 3→8→4→2→4→8→3 network trained to reconstruct the
//! standardized RFM vector under mean squared error. Only the encoder
//! half survives training; the 2-wide bottleneck activation is the
//! latent embedding clustered downstream. Reconstruction itself is
//! never used after the fit.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{InferenceError, TrainingError};

/// Number of training epochs.
pub const EPOCHS: usize = 50;
/// Mini-batch size.
pub const BATCH_SIZE: usize = 32;
/// Fixed gradient-descent step size.
pub const LEARNING_RATE: f64 = 0.01;
/// Symmetric bottleneck topology, input to output.
pub const LAYER_WIDTHS: [usize; 7] = [3, 8, 4, 2, 4, 8, 3];
/// Layers forming the encoder half (up to and including the bottleneck).
const ENCODER_LAYERS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    fn apply(self, value: f64) -> f64 {
        match self {
            Self::Relu => value.max(0.0),
            Self::Linear => value,
        }
    }

    fn gradient(self, value: f64) -> f64 {
        match self {
            Self::Relu => {
                if value > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Linear => 1.0,
        }
    }
}

/// One fully-connected layer; `weights[output][input]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    fn random(inputs: usize, outputs: usize, activation: Activation, rng: &mut StdRng) -> Self {
        // Xavier-uniform init.
        let limit = (6.0 / (inputs + outputs) as f64).sqrt();
        let weights = (0..outputs)
            .map(|_| (0..inputs).map(|_| rng.gen_range(-limit..limit)).collect())
            .collect();
        Self { weights, biases: vec![0.0; outputs], activation }
    }

    fn forward(&self, input: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let pre: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.biases)
            .map(|(row, bias)| {
                row.iter().zip(input).map(|(weight, value)| weight * value).sum::<f64>() + bias
            })
            .collect();
        let post = pre.iter().map(|value| self.activation.apply(*value)).collect();
        (pre, post)
    }

    fn input_dim(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }
}

/// The full autoencoder, alive only for the duration of training.
#[derive(Clone, Debug, PartialEq)]
pub struct Autoencoder {
    layers: Vec<DenseLayer>,
}

impl Autoencoder {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let layers = LAYER_WIDTHS
            .windows(2)
            .enumerate()
            .map(|(index, pair)| {
                let activation = if index == LAYER_WIDTHS.len() - 2 {
                    Activation::Linear
                } else {
                    Activation::Relu
                };
                DenseLayer::random(pair[0], pair[1], activation, &mut rng)
            })
            .collect();
        Self { layers }
    }

    /// Mini-batch gradient descent against the rows' own values.
    /// Returns the final mean squared reconstruction error.
    pub fn train(&mut self, rows: &[Vec<f64>], seed: u64) -> Result<f64, TrainingError> {
        if rows.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        let input_dim = LAYER_WIDTHS[0];
        for row in rows {
            if row.len() != input_dim {
                return Err(InferenceError::DimensionMismatch {
                    expected: input_dim,
                    actual: row.len(),
                }
                .into());
            }
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..rows.len()).collect();
        for epoch in 0..EPOCHS {
            indices.shuffle(&mut rng);
            for batch in indices.chunks(BATCH_SIZE) {
                self.train_batch(batch, rows);
            }
            if (epoch + 1) % 10 == 0 {
                debug!(
                    epoch = epoch + 1,
                    loss = self.mean_squared_error(rows),
                    "autoencoder training progress"
                );
            }
        }

        Ok(self.mean_squared_error(rows))
    }

    fn train_batch(&mut self, batch: &[usize], rows: &[Vec<f64>]) {
        let mut weight_grads: Vec<Vec<Vec<f64>>> = self
            .layers
            .iter()
            .map(|layer| vec![vec![0.0; layer.input_dim()]; layer.biases.len()])
            .collect();
        let mut bias_grads: Vec<Vec<f64>> =
            self.layers.iter().map(|layer| vec![0.0; layer.biases.len()]).collect();

        for &sample in batch {
            let target = &rows[sample];

            let mut activations: Vec<Vec<f64>> = vec![target.clone()];
            let mut pre_activations: Vec<Vec<f64>> = Vec::with_capacity(self.layers.len());
            for layer in &self.layers {
                let (pre, post) = layer.forward(&activations[activations.len() - 1]);
                pre_activations.push(pre);
                activations.push(post);
            }

            let output = &activations[self.layers.len()];
            let dim = target.len() as f64;
            let mut delta: Vec<f64> = output
                .iter()
                .zip(target)
                .map(|(out, wanted)| 2.0 * (out - wanted) / dim)
                .collect();

            for layer_index in (0..self.layers.len()).rev() {
                let layer = &self.layers[layer_index];
                let delta_pre: Vec<f64> = delta
                    .iter()
                    .zip(&pre_activations[layer_index])
                    .map(|(d, pre)| d * layer.activation.gradient(*pre))
                    .collect();

                let input = &activations[layer_index];
                for (out_index, d) in delta_pre.iter().enumerate() {
                    bias_grads[layer_index][out_index] += d;
                    for (in_index, value) in input.iter().enumerate() {
                        weight_grads[layer_index][out_index][in_index] += d * value;
                    }
                }

                if layer_index > 0 {
                    let mut propagated = vec![0.0; layer.input_dim()];
                    for (out_index, d) in delta_pre.iter().enumerate() {
                        for (in_index, weight) in layer.weights[out_index].iter().enumerate() {
                            propagated[in_index] += weight * d;
                        }
                    }
                    delta = propagated;
                }
            }
        }

        let step = LEARNING_RATE / batch.len() as f64;
        for (layer_index, layer) in self.layers.iter_mut().enumerate() {
            for (out_index, row) in layer.weights.iter_mut().enumerate() {
                for (in_index, weight) in row.iter_mut().enumerate() {
                    *weight -= step * weight_grads[layer_index][out_index][in_index];
                }
            }
            for (out_index, bias) in layer.biases.iter_mut().enumerate() {
                *bias -= step * bias_grads[layer_index][out_index];
            }
        }
    }

    pub fn mean_squared_error(&self, rows: &[Vec<f64>]) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        let mut total = 0.0;
        for row in rows {
            let output = self.reconstruct(row);
            total += output
                .iter()
                .zip(row)
                .map(|(out, wanted)| (out - wanted) * (out - wanted))
                .sum::<f64>()
                / row.len() as f64;
        }
        total / rows.len() as f64
    }

    fn reconstruct(&self, row: &[f64]) -> Vec<f64> {
        let mut activation = row.to_vec();
        for layer in &self.layers {
            activation = layer.forward(&activation).1;
        }
        activation
    }

    /// Keep the encoder half; the decoder is discarded.
    pub fn into_encoder(self) -> Encoder {
        Encoder { layers: self.layers.into_iter().take(ENCODER_LAYERS).collect() }
    }
}

/// The trained embedding function: a deterministic forward pass through
/// the encoder half of the autoencoder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Encoder {
    pub layers: Vec<DenseLayer>,
}

impl Encoder {
    pub fn embed(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        let Some(first) = self.layers.first() else {
            return Err(InferenceError::Unfitted("encoder has no layers".to_string()));
        };
        if row.len() != first.input_dim() {
            return Err(InferenceError::DimensionMismatch {
                expected: first.input_dim(),
                actual: row.len(),
            });
        }

        let mut activation = row.to_vec();
        for layer in &self.layers {
            activation = layer.forward(&activation).1;
        }
        Ok(activation)
    }

    pub fn latent_dim(&self) -> usize {
        self.layers.last().map_or(0, |layer| layer.biases.len())
    }
}

#[cfg(test)]
mod tests {
    use super::{Autoencoder, EPOCHS, LAYER_WIDTHS};
    use crate::errors::{InferenceError, TrainingError};

    fn training_rows() -> Vec<Vec<f64>> {
        // Standardized-looking values on a simple correlated pattern.
        (0..40)
            .map(|index| {
                let t = (index as f64 / 39.0) * 2.0 - 1.0;
                vec![t, -t, 0.5 * t]
            })
            .collect()
    }

    #[test]
    fn training_reduces_reconstruction_error() {
        let rows = training_rows();
        let mut autoencoder = Autoencoder::new(7);
        let initial = autoencoder.mean_squared_error(&rows);

        let final_loss = autoencoder.train(&rows, 7).expect("training succeeds");
        assert!(final_loss.is_finite());
        assert!(
            final_loss <= initial,
            "after {EPOCHS} epochs loss {final_loss} should not exceed initial {initial}"
        );
    }

    #[test]
    fn encoder_embeds_into_two_dimensions() {
        let rows = training_rows();
        let mut autoencoder = Autoencoder::new(7);
        autoencoder.train(&rows, 7).expect("training succeeds");
        let encoder = autoencoder.into_encoder();

        assert_eq!(encoder.latent_dim(), 2);
        let latent = encoder.embed(&rows[0]).expect("dims match");
        assert_eq!(latent.len(), 2);
        assert!(latent.iter().all(|value| value.is_finite()));
    }

    #[test]
    fn embedding_is_deterministic_after_training() {
        let rows = training_rows();
        let mut autoencoder = Autoencoder::new(7);
        autoencoder.train(&rows, 7).expect("training succeeds");
        let encoder = autoencoder.into_encoder();

        let first = encoder.embed(&rows[3]).expect("dims match");
        let second = encoder.embed(&rows[3]).expect("dims match");
        assert_eq!(first, second);
    }

    #[test]
    fn train_rejects_empty_and_misshapen_input() {
        let mut autoencoder = Autoencoder::new(7);
        assert_eq!(autoencoder.train(&[], 7), Err(TrainingError::EmptyDataset));

        let result = autoencoder.train(&[vec![1.0, 2.0]], 7);
        assert_eq!(
            result,
            Err(TrainingError::Inference(InferenceError::DimensionMismatch {
                expected: LAYER_WIDTHS[0],
                actual: 2,
            }))
        );
    }

    #[test]
    fn encoder_rejects_wrong_input_dimension() {
        let encoder = Autoencoder::new(7).into_encoder();
        let result = encoder.embed(&[1.0, 2.0]);
        assert_eq!(result, Err(InferenceError::DimensionMismatch { expected: 3, actual: 2 }));
    }
}
