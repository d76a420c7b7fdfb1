//! Loss computation and parameter updates for one training session.

use burn::module::AutodiffModule;
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer as BurnOptimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;

use crate::error::{Result, TrainError};

/// Mean-squared-error loss paired with an optional Adam optimizer.
///
/// Prediction-only sessions carry no optimizer: [`Optimization::compute_loss`]
/// always works, [`Optimization::optimize`] reports the missing optimizer.
pub struct Optimization<M: AutodiffModule<B>, B: AutodiffBackend> {
    loss: MseLoss,
    optimizer: Option<OptimizerAdaptor<Adam, M, B>>,
    learning_rate: Option<f64>,
}

impl<M: AutodiffModule<B>, B: AutodiffBackend> Optimization<M, B> {
    /// Create a training wrapper with Adam at `learning_rate`.
    pub fn new(learning_rate: f64) -> Self {
        let config = AdamConfig::new();
        Self {
            loss: MseLoss::new(),
            optimizer: Some(config.init()),
            learning_rate: Some(learning_rate),
        }
    }

    /// Create a loss-only wrapper for prediction sessions.
    pub fn without_optimizer() -> Self {
        Self {
            loss: MseLoss::new(),
            optimizer: None,
            learning_rate: None,
        }
    }

    /// Mean-squared error between a prediction and its ground truth, both in
    /// data layout. One call computes the full loss value.
    pub fn compute_loss(
        &self,
        prediction: Tensor<B, 5>,
        ground_truth: Tensor<B, 5>,
    ) -> Tensor<B, 1> {
        self.loss.forward(prediction, ground_truth, Reduction::Mean)
    }

    /// Backward pass and one optimizer step; returns the updated module.
    pub fn optimize(&mut self, loss: Tensor<B, 1>, module: M) -> Result<M> {
        let learning_rate = self.learning_rate.ok_or(TrainError::OptimizerUnavailable)?;
        let optimizer = self
            .optimizer
            .as_mut()
            .ok_or(TrainError::OptimizerUnavailable)?;
        let gradients = loss.backward();
        let gradients = GradientsParams::from_grads(gradients, &module);
        Ok(optimizer.step(learning_rate, module, gradients))
    }

    /// Current learning rate; `None` for loss-only sessions.
    pub fn learning_rate(&self) -> Option<f64> {
        self.learning_rate
    }

    /// Adjust the learning rate for subsequent steps.
    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        if self.optimizer.is_some() {
            self.learning_rate = Some(learning_rate);
        }
    }
}
