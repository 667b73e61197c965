//! Binary Cross-Entropy with Logits loss for adversarial training
//!
//! Combines a sigmoid activation with binary cross-entropy in a single,
//! numerically stable computation. The discriminator emits raw logits and
//! this loss scores them against real/fake labels.
//!
//! # Formula
//!
//! ```text
//! L_i = max(x_i, 0) - x_i * t_i + log(1 + exp(-|x_i|))
//! L = mean(L_i) over all i
//! ```
//!
//! Gradient: `∂L/∂x_i = (σ(x_i) - t_i) / N`

use std::cell::RefCell;
use std::rc::Rc;

use ndarray::Array1;

use crate::autograd::BackwardOp;
use crate::Tensor;

/// Trait for loss functions
pub trait LossFn {
    /// Compute loss given predictions and targets
    ///
    /// Returns a scalar loss value and wires up gradients for backpropagation
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor;

    /// Name of the loss function
    fn name(&self) -> &str;
}

/// Binary Cross-Entropy with Logits Loss.
///
/// Each prediction is an independent binary decision scored against a target
/// in `[0, 1]`. Soft targets (label smoothing) are supported directly: a
/// target of `0.9` pulls the sigmoid towards 0.9 rather than saturating at 1.
///
/// # Example
///
/// ```
/// use adversario::loss::{BCEWithLogitsLoss, LossFn};
/// use adversario::Tensor;
///
/// let loss_fn = BCEWithLogitsLoss;
/// let logits = Tensor::from_vec(vec![2.0, -1.0, 0.5], true);
/// let targets = Tensor::from_vec(vec![0.9, 0.1, 0.9], false);
///
/// let loss = loss_fn.forward(&logits, &targets);
/// assert!(loss.data()[0] > 0.0);
/// ```
pub struct BCEWithLogitsLoss;

impl BCEWithLogitsLoss {
    /// Element-wise sigmoid: σ(x) = 1 / (1 + exp(-x))
    pub(crate) fn sigmoid(x: &Array1<f32>) -> Array1<f32> {
        x.mapv(|v| {
            // Numerically stable sigmoid
            if v >= 0.0 {
                let exp_neg = (-v).exp();
                1.0 / (1.0 + exp_neg)
            } else {
                let exp_v = v.exp();
                exp_v / (1.0 + exp_v)
            }
        })
    }

    /// Numerically stable BCE: max(x, 0) - x*t + log(1 + exp(-|x|))
    fn stable_bce(logit: f32, target: f32) -> f32 {
        let relu = logit.max(0.0);
        let abs_x = logit.abs();
        relu - logit * target + (1.0 + (-abs_x).exp()).ln()
    }
}

struct BCEBackward {
    pred_grad_cell: Rc<RefCell<Option<Array1<f32>>>>,
    pred_op: Option<Rc<dyn BackwardOp>>,
    grad: Array1<f32>,
}

impl BackwardOp for BCEBackward {
    fn backward(&self) {
        {
            let mut pred_grad = self.pred_grad_cell.borrow_mut();
            if let Some(existing) = pred_grad.as_mut() {
                *existing = &*existing + &self.grad;
            } else {
                *pred_grad = Some(self.grad.clone());
            }
        }

        // Continue down the graph so gradients reach the network parameters
        if let Some(op) = &self.pred_op {
            op.backward();
        }
    }
}

impl LossFn for BCEWithLogitsLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        assert_eq!(
            predictions.len(),
            targets.len(),
            "Predictions and targets must have same length"
        );

        let total_loss: f32 = predictions
            .data()
            .iter()
            .zip(targets.data().iter())
            .map(|(&logit, &target)| Self::stable_bce(logit, target))
            .sum::<f32>()
            / predictions.len() as f32;

        let mut loss = Tensor::from_vec(vec![total_loss], true);

        if predictions.requires_grad() {
            // Gradient: ∂L/∂x_i = (σ(x_i) - t_i) / N
            let sigmoid_vals = Self::sigmoid(&predictions.data());
            let n = predictions.len() as f32;
            let grad = (&sigmoid_vals - &targets.data()) / n;

            loss.set_backward_op(Rc::new(BCEBackward {
                pred_grad_cell: predictions.grad_cell(),
                pred_op: predictions.backward_op(),
                grad,
            }));
        }

        loss
    }

    fn name(&self) -> &'static str {
        "BCEWithLogits"
    }
}
