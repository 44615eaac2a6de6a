//! Small feed-forward neural classifier on `aprender::nn`
//!
//! Standardized input → `Linear`/`ReLU` hidden layers → two-logit output,
//! trained full-batch on cross-entropy with Adam and L2 weight decay.
//! Training stops after `max_iter` epochs or once the loss has not
//! improved by `tol` for `n_iter_no_change` consecutive epochs.
//!
//! `Sequential` is not serializable, so a fitted network keeps its layer
//! sizes and state dict and rebuilds the module for inference.
//!
//! # References
//!
//! Kingma, D. P., & Ba, J. (2015). Adam: A method for stochastic
//! optimization. ICLR.

use super::scaler::Standardizer;
use super::{check_samples, ClassifierError};
use crate::dataset::{Label, TrainingSet};
use aprender::autograd::{clear_graph, no_grad, Tensor};
use aprender::nn::serialize::{load_state_dict_into, state_dict, StateDict};
use aprender::nn::{Adam, CrossEntropyLoss, Linear, Module, Optimizer, ReLU, Sequential};
use serde::{Deserialize, Serialize};

/// Output logits: column 0 impostor, column 1 genuine
const N_OUTPUTS: usize = 2;

/// Network hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpParams {
    pub hidden_layers: Vec<usize>,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// L2 penalty
    pub alpha: f64,
    pub tol: f64,
    pub n_iter_no_change: usize,
}

impl Default for MlpParams {
    fn default() -> Self {
        Self {
            hidden_layers: vec![32, 16],
            max_iter: 500,
            learning_rate: 1e-3,
            alpha: 1e-4,
            tol: 1e-4,
            n_iter_no_change: 10,
        }
    }
}

/// `Linear` layers between consecutive `sizes`, ReLU between all but the last
fn build_network(sizes: &[usize], seed: u64) -> Sequential {
    let last = sizes.len().saturating_sub(2);
    sizes
        .windows(2)
        .enumerate()
        .fold(Sequential::new(), |net, (i, w)| {
            let net = net.add(Linear::with_seed(
                w[0],
                w[1],
                Some(seed.wrapping_add(i as u64)),
            ));
            if i < last {
                net.add(ReLU::new())
            } else {
                net
            }
        })
}

fn to_tensor(rows: &[Vec<f64>]) -> Tensor {
    let dim = rows.first().map(Vec::len).unwrap_or(0);
    let flat: Vec<f32> = rows.iter().flatten().map(|&v| v as f32).collect();
    Tensor::new(&flat, &[rows.len(), dim])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedNet {
    scaler: Standardizer,
    /// Input width, hidden widths, output width
    sizes: Vec<usize>,
    state: StateDict,
    epochs_run: usize,
    final_loss: f64,
}

/// Feed-forward neural network classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralNet {
    params: MlpParams,
    seed: u64,
    fitted: Option<FittedNet>,
}

impl NeuralNet {
    pub fn new(params: MlpParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            fitted: None,
        }
    }

    pub fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.scaler.n_features())
    }

    /// Epochs actually run by the last `fit`
    pub fn epochs_run(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.epochs_run)
    }

    /// Training loss of the last epoch run
    pub fn final_loss(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.final_loss)
    }

    pub fn fit(&mut self, set: &TrainingSet) -> Result<(), ClassifierError> {
        let dim = super::check_training_set(set)?;
        if self.params.hidden_layers.contains(&0) {
            return Err(ClassifierError::Numerical(
                "hidden layers must have at least one unit".to_string(),
            ));
        }

        let scaler = Standardizer::fit(&set.samples)?;
        let x = to_tensor(&scaler.transform_all(&set.samples));
        let targets: Vec<f32> = set
            .labels
            .iter()
            .map(|l| l.class_index() as f32)
            .collect();
        let targets = Tensor::new(&targets, &[set.len()]);

        let mut sizes = vec![dim];
        sizes.extend_from_slice(&self.params.hidden_layers);
        sizes.push(N_OUTPUTS);

        let mut net = build_network(&sizes, self.seed);
        let criterion = CrossEntropyLoss::new();
        let mut optimizer = Adam::new(net.parameters_mut(), self.params.learning_rate as f32)
            .weight_decay(self.params.alpha as f32);

        let mut best_loss = f64::INFINITY;
        let mut final_loss = f64::INFINITY;
        let mut epochs_run = 0;
        let mut stale = 0;

        for epoch in 0..self.params.max_iter {
            clear_graph();
            let logits = net.forward(&x);
            let loss = criterion.forward(&logits, &targets);
            let value = f64::from(loss.item());
            if !value.is_finite() {
                clear_graph();
                return Err(ClassifierError::Numerical(format!(
                    "loss diverged at epoch {}",
                    epoch
                )));
            }

            loss.backward();
            optimizer.step_with_params(&mut net.parameters_mut());
            optimizer.zero_grad();
            epochs_run = epoch + 1;
            final_loss = value;

            if value > best_loss - self.params.tol {
                stale += 1;
            } else {
                stale = 0;
            }
            best_loss = best_loss.min(value);
            if stale >= self.params.n_iter_no_change {
                break;
            }
        }
        clear_graph();
        tracing::debug!(epochs_run, final_loss, "mlp training finished");

        self.fitted = Some(FittedNet {
            scaler,
            sizes,
            state: state_dict(&net, ""),
            epochs_run,
            final_loss,
        });
        Ok(())
    }

    pub fn predict_proba(&self, samples: &[Vec<f64>]) -> Result<Vec<f64>, ClassifierError> {
        check_samples(self.n_features(), samples)?;
        let fitted = self.fitted.as_ref().ok_or(ClassifierError::NotFitted)?;
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let mut net = build_network(&fitted.sizes, self.seed);
        load_state_dict_into(&mut net, &fitted.state, "").map_err(ClassifierError::Numerical)?;
        net.eval();

        let x = to_tensor(&fitted.scaler.transform_all(samples));
        let probs = no_grad(|| net.forward(&x).softmax());
        let genuine = Label::Genuine.class_index();
        Ok(probs
            .data()
            .chunks(N_OUTPUTS)
            .map(|row| f64::from(row[genuine]))
            .collect())
    }

    pub fn predict(&self, samples: &[Vec<f64>]) -> Result<Vec<Label>, ClassifierError> {
        Ok(self
            .predict_proba(samples)?
            .into_iter()
            .map(|p| if p > 0.5 { Label::Genuine } else { Label::Impostor })
            .collect())
    }
}
