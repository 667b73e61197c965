//! Activation autograd operations: relu, leaky_relu, tanh

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// ReLU activation
pub fn relu(a: &Tensor) -> Tensor {
    let data = a.data().mapv(|x| x.max(0.0));
    let requires_grad = a.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let a_clone = a.clone();
        let backward_op = Rc::new(ReluBackward {
            a: a_clone,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ReluBackward {
    a: Tensor,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for ReluBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂L/∂a = ∂L/∂out * (a > 0)
                let grad_a = grad * &self.a.data().mapv(|x| if x > 0.0 { 1.0 } else { 0.0 });
                self.a.accumulate_grad(grad_a);
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}

/// Leaky ReLU activation
///
/// `x` for positive input, `negative_slope * x` otherwise.
pub fn leaky_relu(a: &Tensor, negative_slope: f32) -> Tensor {
    let data = a
        .data()
        .mapv(|x| if x > 0.0 { x } else { negative_slope * x });
    let requires_grad = a.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let a_clone = a.clone();
        let backward_op = Rc::new(LeakyReluBackward {
            a: a_clone,
            negative_slope,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct LeakyReluBackward {
    a: Tensor,
    negative_slope: f32,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for LeakyReluBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂L/∂a = ∂L/∂out * (a > 0 ? 1 : slope)
                let slope = self.negative_slope;
                let grad_a = grad * &self.a.data().mapv(|x| if x > 0.0 { 1.0 } else { slope });
                self.a.accumulate_grad(grad_a);
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}

/// Hyperbolic tangent activation
pub fn tanh(a: &Tensor) -> Tensor {
    let data = a.data().mapv(f32::tanh);
    let requires_grad = a.requires_grad();

    let mut result = Tensor::new(data.clone(), requires_grad);

    if requires_grad {
        let a_clone = a.clone();
        let backward_op = Rc::new(TanhBackward {
            a: a_clone,
            output: data,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct TanhBackward {
    a: Tensor,
    output: Array1<f32>,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for TanhBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂L/∂a = ∂L/∂out * (1 - tanh(a)²)
                let grad_a = grad * &self.output.mapv(|y| 1.0 - y * y);
                self.a.accumulate_grad(grad_a);
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_relu_forward() {
        let a = Tensor::from_vec(vec![-1.0, 0.0, 2.0], false);
        let y = relu(&a);
        assert_eq!(y.to_vec(), vec![0.0, 0.0, 2.0]);
        assert!(y.backward_op().is_none());
    }

    #[test]
    fn test_relu_backward_masks_negative() {
        let a = Tensor::from_vec(vec![-1.0, 2.0], true);
        let y = relu(&a);
        y.set_grad(Array1::from(vec![1.0, 1.0]));
        y.backward_op().expect("tracked").backward();
        assert_eq!(a.grad().expect("grad"), Array1::from(vec![0.0, 1.0]));
    }

    #[test]
    fn test_leaky_relu_forward_and_backward() {
        let a = Tensor::from_vec(vec![-2.0, 3.0], true);
        let y = leaky_relu(&a, 0.2);
        assert_relative_eq!(y.data()[0], -0.4, epsilon = 1e-6);
        assert_relative_eq!(y.data()[1], 3.0, epsilon = 1e-6);

        y.set_grad(Array1::from(vec![1.0, 1.0]));
        y.backward_op().expect("tracked").backward();
        let grad = a.grad().expect("grad");
        assert_relative_eq!(grad[0], 0.2, epsilon = 1e-6);
        assert_relative_eq!(grad[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_tanh_bounds() {
        let a = Tensor::from_vec(vec![-100.0, 0.0, 100.0], false);
        let y = tanh(&a);
        assert_relative_eq!(y.data()[0], -1.0, epsilon = 1e-5);
        assert_relative_eq!(y.data()[1], 0.0, epsilon = 1e-6);
        assert_relative_eq!(y.data()[2], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_tanh_backward_matches_finite_difference() {
        let x0 = 0.37f32;
        let a = Tensor::from_vec(vec![x0], true);
        let y = tanh(&a);
        y.set_grad(Array1::from(vec![1.0]));
        y.backward_op().expect("tracked").backward();

        let eps = 1e-3f32;
        let numeric = ((x0 + eps).tanh() - (x0 - eps).tanh()) / (2.0 * eps);
        assert_relative_eq!(a.grad().expect("grad")[0], numeric, epsilon = 1e-4);
    }

    #[test]
    fn test_activation_chain_recurses() {
        // tanh(relu(a)): backward from the outer op must reach `a`
        let a = Tensor::from_vec(vec![0.5, -0.5], true);
        let h = relu(&a);
        let y = tanh(&h);
        y.set_grad(Array1::from(vec![1.0, 1.0]));
        y.backward_op().expect("tracked").backward();
        let grad = a.grad().expect("grad reaches input");
        assert!(grad[0] > 0.0);
        assert_eq!(grad[1], 0.0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn leaky_relu_is_identity_on_positives_and_scaled_on_negatives(
                xs in prop::collection::vec(-100.0f32..100.0, 1..64),
                slope in 0.0f32..1.0,
            ) {
                let a = Tensor::from_vec(xs.clone(), false);
                let y = leaky_relu(&a, slope);
                for (x, out) in xs.iter().zip(y.to_vec()) {
                    let expected = if *x > 0.0 { *x } else { slope * x };
                    prop_assert!((out - expected).abs() <= f32::EPSILON * x.abs().max(1.0));
                }
            }

            #[test]
            fn tanh_output_stays_in_unit_interval(
                xs in prop::collection::vec(-1000.0f32..1000.0, 1..64),
            ) {
                let y = tanh(&Tensor::from_vec(xs, false));
                prop_assert!(y.to_vec().iter().all(|v| (-1.0..=1.0).contains(v)));
            }
        }
    }
}
