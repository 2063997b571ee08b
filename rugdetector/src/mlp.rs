//! Feed-forward binary classifier
//!
//! ReLU hidden layers and a single logistic output unit, trained with
//! mini-batch Adam on binary cross-entropy plus an L2 penalty. Weights use
//! Glorot-uniform initialisation. Training stops early once the epoch loss
//! has failed to improve by `tol` for `n_iter_no_change` epochs.

use ndarray::{Array, Array1, Array2, Axis, Dimension, Zip};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, RugDetectorError};

/// Classifier hyper-parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MlpConfig {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    /// L2 penalty
    pub alpha: f64,
    pub batch_size: usize,
    pub max_epochs: usize,
    pub tol: f64,
    pub n_iter_no_change: usize,
    pub seed: u64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![30, 15],
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            alpha: 1e-4,
            batch_size: 32,
            max_epochs: 500,
            tol: 1e-4,
            n_iter_no_change: 10,
            seed: 42,
        }
    }
}

impl MlpConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hidden_layers.is_empty() || self.hidden_layers.contains(&0) {
            return Err(RugDetectorError::config_message(format!(
                "classifier.hidden_layers must be non-empty and positive, got {:?}",
                self.hidden_layers
            )));
        }
        if self.batch_size == 0 || self.max_epochs == 0 {
            return Err(RugDetectorError::config_message(
                "classifier.batch_size and classifier.max_epochs must be greater than 0",
            ));
        }
        if self.learning_rate <= 0.0 || self.alpha < 0.0 {
            return Err(RugDetectorError::config_message(
                "classifier.learning_rate must be positive and classifier.alpha non-negative",
            ));
        }
        if !(0.0..1.0).contains(&self.beta1) || !(0.0..1.0).contains(&self.beta2) {
            return Err(RugDetectorError::config_message(
                "classifier.beta1 and classifier.beta2 must be within [0, 1)",
            ));
        }
        Ok(())
    }
}

/// One affine layer, `x · weights + bias`
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    /// `[fan_in, fan_out]`
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

impl DenseLayer {
    fn glorot(fan_in: usize, fan_out: usize, rng: &mut ChaCha8Rng) -> Self {
        let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
        let weights =
            Array2::from_shape_fn((fan_in, fan_out), |_| rng.random_range(-bound..bound));
        let bias = Array1::from_shape_fn(fan_out, |_| rng.random_range(-bound..bound));
        Self { weights, bias }
    }

    fn zeros_like(other: &DenseLayer) -> Self {
        Self {
            weights: Array2::zeros(other.weights.raw_dim()),
            bias: Array1::zeros(other.bias.raw_dim()),
        }
    }

    fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weights) + &self.bias
    }

    pub fn fan_in(&self) -> usize {
        self.weights.nrows()
    }

    pub fn fan_out(&self) -> usize {
        self.weights.ncols()
    }
}

/// Loss curve of one training run
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrainingHistory {
    pub losses: Vec<f64>,
    pub best_loss: f64,
    pub converged: bool,
}

impl TrainingHistory {
    pub fn epochs(&self) -> usize {
        self.losses.len()
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.losses.last().copied()
    }
}

/// A trained classifier
#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    layers: Vec<DenseLayer>,
}

impl Mlp {
    /// Fit a classifier on `x` with 0/1 labels `y`
    pub fn train(
        x: &Array2<f64>,
        y: &Array1<u8>,
        config: &MlpConfig,
    ) -> Result<(Self, TrainingHistory)> {
        config.validate()?;

        let samples = x.nrows();
        if samples == 0 || samples != y.len() {
            return Err(RugDetectorError::training(format!(
                "{} feature rows for {} labels",
                samples,
                y.len()
            )));
        }
        if y.iter().any(|&label| label > 1) {
            return Err(RugDetectorError::training("labels must be 0 or 1"));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut mlp = Self::initialize(x.ncols(), &config.hidden_layers, &mut rng);
        let mut optimizer = Adam::new(&mlp.layers, config);

        let targets = y.mapv(f64::from);
        let mut order: Vec<usize> = (0..samples).collect();

        let mut history = TrainingHistory {
            best_loss: f64::INFINITY,
            ..TrainingHistory::default()
        };
        let mut no_improvement = 0usize;

        info!(
            samples,
            layers = ?mlp.layer_sizes(),
            max_epochs = config.max_epochs,
            "Training classifier"
        );

        for epoch in 1..=config.max_epochs {
            order.shuffle(&mut rng);

            let mut accumulated = 0.0;
            for batch in order.chunks(config.batch_size) {
                let xb = x.select(Axis(0), batch);
                let yb = targets.select(Axis(0), batch);
                let (loss, gradients) = mlp.backprop(&xb, &yb, config.alpha);
                optimizer.step(&mut mlp.layers, &gradients);
                accumulated += loss * batch.len() as f64;
            }

            let loss = accumulated / samples as f64;
            history.losses.push(loss);
            debug!(epoch, loss, "Epoch finished");

            if loss > history.best_loss - config.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            if loss < history.best_loss {
                history.best_loss = loss;
            }

            if no_improvement > config.n_iter_no_change {
                history.converged = true;
                info!(
                    epoch,
                    loss,
                    "Training loss did not improve more than tol={} for {} consecutive epochs",
                    config.tol,
                    config.n_iter_no_change
                );
                break;
            }
        }

        if !history.converged {
            warn!(
                epochs = history.epochs(),
                "Maximum epochs reached and the optimization hasn't converged yet"
            );
        }

        Ok((mlp, history))
    }

    fn initialize(inputs: usize, hidden: &[usize], rng: &mut ChaCha8Rng) -> Self {
        let mut sizes = Vec::with_capacity(hidden.len() + 2);
        sizes.push(inputs);
        sizes.extend_from_slice(hidden);
        sizes.push(1);

        let layers = sizes
            .windows(2)
            .map(|pair| DenseLayer::glorot(pair[0], pair[1], rng))
            .collect();
        Self { layers }
    }

    /// Build from explicit layers; the last layer must have one output
    pub fn from_layers(layers: Vec<DenseLayer>) -> Result<Self> {
        let chained = layers
            .windows(2)
            .all(|pair| pair[0].fan_out() == pair[1].fan_in());
        if layers.is_empty() || !chained || layers.last().map(DenseLayer::fan_out) != Some(1) {
            return Err(RugDetectorError::training("layer shapes do not chain into one output"));
        }
        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    /// Widths from input to output, e.g. `[60, 30, 15, 1]`
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self.layers.iter().map(DenseLayer::fan_in).collect();
        sizes.push(1);
        sizes
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].fan_in()
    }

    /// Post-activation outputs of every layer, input first, raw logit last
    fn activations(&self, x: &Array2<f64>) -> Vec<Array2<f64>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(x.clone());

        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            let mut z = layer.forward(&activations[i]);
            if i < last {
                z.mapv_inplace(relu);
            }
            activations.push(z);
        }
        activations
    }

    /// Raw output logits, one per row
    pub fn decision_function(&self, x: &Array2<f64>) -> Array1<f64> {
        let mut current = x.clone();
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            current = layer.forward(&current);
            if i < last {
                current.mapv_inplace(relu);
            }
        }
        current.column(0).to_owned()
    }

    /// Class labels: 1 when the logit is positive
    pub fn predict(&self, x: &Array2<f64>) -> Array1<u8> {
        self.decision_function(x).mapv(|z| u8::from(z > 0.0))
    }

    /// Mean batch loss and per-layer gradients
    fn backprop(&self, x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> (f64, Vec<DenseLayer>) {
        let batch = x.nrows() as f64;
        let activations = self.activations(x);
        let logits = activations[self.layers.len()].column(0).to_owned();

        let data_loss = Zip::from(&logits)
            .and(y)
            .fold(0.0, |acc, &z, &t| acc + binary_cross_entropy(z, t))
            / batch;
        let penalty: f64 = self
            .layers
            .iter()
            .map(|layer| layer.weights.mapv(|w| w * w).sum())
            .sum();
        let loss = data_loss + 0.5 * alpha * penalty / batch;

        let mut delta = (logits.mapv(sigmoid) - y).insert_axis(Axis(1));
        delta.mapv_inplace(|d| d / batch);

        let mut gradients = Vec::with_capacity(self.layers.len());
        for i in (0..self.layers.len()).rev() {
            let layer = &self.layers[i];
            let weights = activations[i].t().dot(&delta) + &layer.weights * (alpha / batch);
            let bias = delta.sum_axis(Axis(0));

            if i > 0 {
                let mut upstream = delta.dot(&layer.weights.t());
                Zip::from(&mut upstream)
                    .and(&activations[i])
                    .for_each(|d, &a| {
                        if a <= 0.0 {
                            *d = 0.0;
                        }
                    });
                delta = upstream;
            }

            gradients.push(DenseLayer { weights, bias });
        }
        gradients.reverse();

        (loss, gradients)
    }
}

fn relu(v: f64) -> f64 {
    v.max(0.0)
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Cross-entropy of a logit against a 0/1 target, stable for large |z|
fn binary_cross_entropy(z: f64, target: f64) -> f64 {
    z.max(0.0) - z * target + (-z.abs()).exp().ln_1p()
}

/// Adam state: first and second moments per parameter
struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: i32,
    first: Vec<DenseLayer>,
    second: Vec<DenseLayer>,
}

impl Adam {
    fn new(layers: &[DenseLayer], config: &MlpConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            beta1: config.beta1,
            beta2: config.beta2,
            epsilon: config.epsilon,
            t: 0,
            first: layers.iter().map(DenseLayer::zeros_like).collect(),
            second: layers.iter().map(DenseLayer::zeros_like).collect(),
        }
    }

    fn step(&mut self, layers: &mut [DenseLayer], gradients: &[DenseLayer]) {
        self.t += 1;
        let step_size = self.learning_rate * (1.0 - self.beta2.powi(self.t)).sqrt()
            / (1.0 - self.beta1.powi(self.t));

        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let moments = self.first.iter_mut().zip(self.second.iter_mut());
        for ((layer, grad), (m, v)) in layers.iter_mut().zip(gradients).zip(moments) {
            let hyper = (step_size, beta1, beta2, epsilon);
            adam_update(&mut layer.weights, &grad.weights, &mut m.weights, &mut v.weights, hyper);
            adam_update(&mut layer.bias, &grad.bias, &mut m.bias, &mut v.bias, hyper);
        }
    }
}

/// `(step_size, beta1, beta2, epsilon)`
type AdamStep = (f64, f64, f64, f64);

fn adam_update<D: Dimension>(
    param: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    (step_size, beta1, beta2, epsilon): AdamStep,
) {
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            *p -= step_size * *m / (v.sqrt() + epsilon);
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<u8>) {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let rows = 200;
        let mut x = Array2::zeros((rows, 4));
        let mut y = Array1::zeros(rows);
        for i in 0..rows {
            let label = (i % 2) as u8;
            let centre = if label == 1 { 2.0 } else { -2.0 };
            for j in 0..4 {
                x[[i, j]] = centre + rng.random_range(-1.0..1.0);
            }
            y[i] = label;
        }
        (x, y)
    }

    #[test]
    fn test_learns_separable_classes() {
        let (x, y) = separable();
        let config = MlpConfig {
            hidden_layers: vec![8, 4],
            max_epochs: 100,
            ..MlpConfig::default()
        };

        let (mlp, history) = Mlp::train(&x, &y, &config).unwrap();
        assert_eq!(mlp.layer_sizes(), vec![4, 8, 4, 1]);
        assert!(history.epochs() > 0);
        assert!(history.final_loss().unwrap() < history.losses[0]);
        assert_eq!(mlp.predict(&x), y);
    }

    #[test]
    fn test_training_is_deterministic() {
        let (x, y) = separable();
        let config = MlpConfig {
            hidden_layers: vec![5],
            max_epochs: 5,
            ..MlpConfig::default()
        };

        let (a, _) = Mlp::train(&x, &y, &config).unwrap();
        let (b, _) = Mlp::train(&x, &y, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mlp = Mlp::initialize(3, &[4], &mut rng);
        let x = array![[0.5, -1.0, 2.0], [1.5, 0.2, -0.7], [-0.3, 0.8, 0.1]];
        let y = array![1.0, 0.0, 1.0];
        let alpha = 0.01;

        let (_, gradients) = mlp.backprop(&x, &y, alpha);

        let h = 1e-6;
        for (layer_index, (row, col)) in [(0, (0, 0)), (0, (2, 3)), (1, (1, 0))] {
            let mut plus = mlp.clone();
            plus.layers[layer_index].weights[[row, col]] += h;
            let mut minus = mlp.clone();
            minus.layers[layer_index].weights[[row, col]] -= h;

            let numeric =
                (plus.backprop(&x, &y, alpha).0 - minus.backprop(&x, &y, alpha).0) / (2.0 * h);
            let analytic = gradients[layer_index].weights[[row, col]];
            assert!(
                (numeric - analytic).abs() < 1e-6,
                "layer {} [{}, {}]: numeric {} analytic {}",
                layer_index,
                row,
                col,
                numeric,
                analytic
            );
        }
    }

    #[test]
    fn test_stable_loss_and_sigmoid() {
        assert!((binary_cross_entropy(0.0, 1.0) - std::f64::consts::LN_2).abs() < 1e-12);
        assert!(binary_cross_entropy(800.0, 1.0).is_finite());
        assert!(binary_cross_entropy(-800.0, 1.0) > 799.0);
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-800.0) >= 0.0);
    }

    #[test]
    fn test_rejects_bad_input() {
        let x = Array2::zeros((3, 2));
        let y = array![0u8, 1];
        assert!(Mlp::train(&x, &y, &MlpConfig::default()).is_err());

        let config = MlpConfig {
            hidden_layers: vec![],
            ..MlpConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
