//! Normalization autograd operations: batch_norm2d

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Shape arguments for [`batch_norm2d`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchNormDims {
    pub batch: usize,
    pub channels: usize,
    pub h: usize,
    pub w: usize,
}

impl BatchNormDims {
    /// Elements normalized together per channel
    fn group_len(&self) -> usize {
        self.batch * self.h * self.w
    }
}

/// Batch Normalization over a rank-4 batch
///
/// Per channel c, over all (batch, h, w) positions:
/// BN(x) = gamma_c * (x - mean_c) / sqrt(var_c + epsilon) + beta_c
///
/// Statistics are always computed from the current batch; this engine has no
/// separate inference mode with running statistics.
pub fn batch_norm2d(
    x: &Tensor,
    gamma: &Tensor,
    beta: &Tensor,
    dims: &BatchNormDims,
    epsilon: f32,
) -> Tensor {
    assert_eq!(
        x.len(),
        dims.batch * dims.channels * dims.h * dims.w,
        "batch_norm2d input size mismatch"
    );
    assert_eq!(gamma.len(), dims.channels, "gamma must have one scale per channel");
    assert_eq!(beta.len(), dims.channels, "beta must have one shift per channel");

    let n = dims.group_len() as f32;
    let x_data = x.data();
    let gamma_data = gamma.data();
    let beta_data = beta.data();
    let plane = dims.h * dims.w;

    let mut normalized = vec![0.0f32; x.len()];
    let mut out = vec![0.0f32; x.len()];
    let mut stds = vec![0.0f32; dims.channels];

    for c in 0..dims.channels {
        let mut mean = 0.0f32;
        for b in 0..dims.batch {
            let start = (b * dims.channels + c) * plane;
            for i in 0..plane {
                mean += x_data[start + i];
            }
        }
        mean /= n;

        let mut variance = 0.0f32;
        for b in 0..dims.batch {
            let start = (b * dims.channels + c) * plane;
            for i in 0..plane {
                variance += (x_data[start + i] - mean).powi(2);
            }
        }
        variance /= n;
        let std = (variance + epsilon).sqrt();
        stds[c] = std;

        for b in 0..dims.batch {
            let start = (b * dims.channels + c) * plane;
            for i in 0..plane {
                let norm = (x_data[start + i] - mean) / std;
                normalized[start + i] = norm;
                out[start + i] = gamma_data[c] * norm + beta_data[c];
            }
        }
    }

    let requires_grad = x.requires_grad() || gamma.requires_grad() || beta.requires_grad();
    let mut result = Tensor::new(Array1::from(out), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(BatchNorm2dBackward {
            x: x.clone(),
            gamma: gamma.clone(),
            beta: beta.clone(),
            normalized: Array1::from(normalized),
            stds,
            dims: *dims,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct BatchNorm2dBackward {
    x: Tensor,
    gamma: Tensor,
    beta: Tensor,
    normalized: Array1<f32>,
    stds: Vec<f32>,
    dims: BatchNormDims,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for BatchNorm2dBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let d = &self.dims;
            let n = d.group_len() as f32;
            let plane = d.h * d.w;
            let gamma_data = self.gamma.data();

            let mut grad_x = vec![0.0f32; self.x.len()];
            let mut grad_gamma = vec![0.0f32; d.channels];
            let mut grad_beta = vec![0.0f32; d.channels];

            for c in 0..d.channels {
                // Channel sums feeding the mean and variance terms
                let mut sum_grad = 0.0f32;
                let mut sum_grad_normalized = 0.0f32;
                for b in 0..d.batch {
                    let start = (b * d.channels + c) * plane;
                    for i in 0..plane {
                        let g = grad_output[start + i];
                        let norm = self.normalized[start + i];
                        sum_grad += g;
                        sum_grad_normalized += g * norm;
                        grad_beta[c] += g;
                        grad_gamma[c] += g * norm;
                    }
                }

                // ∂L/∂x_i = gamma/std * [g_i - (1/n)Σg - (1/n)·norm_i·Σ(g·norm)]
                let scale = gamma_data[c] / self.stds[c];
                for b in 0..d.batch {
                    let start = (b * d.channels + c) * plane;
                    for i in 0..plane {
                        let g = grad_output[start + i];
                        let norm = self.normalized[start + i];
                        grad_x[start + i] = scale
                            * (g - sum_grad / n - norm * sum_grad_normalized / n);
                    }
                }
            }

            if self.x.requires_grad() {
                self.x.accumulate_grad(Array1::from(grad_x));
            }
            if self.gamma.requires_grad() {
                self.gamma.accumulate_grad(Array1::from(grad_gamma));
            }
            if self.beta.requires_grad() {
                self.beta.accumulate_grad(Array1::from(grad_beta));
            }

            // Continue backward through the graph
            if let Some(op) = self.x.backward_op() {
                op.backward();
            }
            if let Some(op) = self.gamma.backward_op() {
                op.backward();
            }
            if let Some(op) = self.beta.backward_op() {
                op.backward();
            }
        }
    }
}
