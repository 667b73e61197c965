//! Shared tensor handle with gradient tape

use super::BackwardOp;
use ndarray::Array1;
use std::cell::{RefCell, RefMut};
use std::rc::Rc;

/// A flat `f32` tensor with shared storage and an optional gradient.
///
/// Cloning a `Tensor` is cheap and yields a handle to the same storage, the
/// same gradient cell, and the same backward op. Shape is carried by callers
/// (e.g. image batches track `(b, c, h, w)` alongside the flat data), the way
/// matrix ops take explicit `(m, k, n)` dimensions.
#[derive(Clone)]
pub struct Tensor {
    data: Rc<RefCell<Array1<f32>>>,
    grad: Rc<RefCell<Option<Array1<f32>>>>,
    backward_op: Rc<RefCell<Option<Rc<dyn BackwardOp>>>>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a tensor from an ndarray
    pub fn new(data: Array1<f32>, requires_grad: bool) -> Self {
        Self {
            data: Rc::new(RefCell::new(data)),
            grad: Rc::new(RefCell::new(None)),
            backward_op: Rc::new(RefCell::new(None)),
            requires_grad,
        }
    }

    /// Create a tensor from a `Vec`
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(data), requires_grad)
    }

    /// Create a zero-filled tensor
    pub fn zeros(len: usize, requires_grad: bool) -> Self {
        Self::new(Array1::zeros(len), requires_grad)
    }

    /// Create a constant-filled tensor (no gradient tracking)
    pub fn full(len: usize, value: f32) -> Self {
        Self::from_vec(vec![value; len], false)
    }

    /// Snapshot of the tensor data
    pub fn data(&self) -> Array1<f32> {
        self.data.borrow().clone()
    }

    /// Mutable access to the underlying storage (in-place parameter mutation)
    pub fn data_mut(&self) -> RefMut<'_, Array1<f32>> {
        self.data.borrow_mut()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    /// Whether the tensor has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First element, for scalar losses
    pub fn item(&self) -> f32 {
        self.data.borrow()[0]
    }

    /// Whether gradients are tracked for this tensor
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Snapshot of the accumulated gradient, if any
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    /// Overwrite the gradient
    pub fn set_grad(&self, grad: Array1<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Clear the gradient. Must run before every backward pass on a
    /// parameter, otherwise gradients accumulate across steps.
    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    /// Add into the gradient cell, initializing it on first use
    pub fn accumulate_grad(&self, grad: Array1<f32>) {
        let mut cell = self.grad.borrow_mut();
        if let Some(existing) = cell.as_mut() {
            *existing = &*existing + &grad;
        } else {
            *cell = Some(grad);
        }
    }

    /// Shared handle to the gradient cell, for backward ops
    pub fn grad_cell(&self) -> Rc<RefCell<Option<Array1<f32>>>> {
        Rc::clone(&self.grad)
    }

    /// The op that produced this tensor, if it is tracked
    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.borrow().clone()
    }

    /// Attach the producing op
    pub fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        *self.backward_op.borrow_mut() = Some(op);
    }

    /// A view of the same storage cut loose from the tape.
    ///
    /// The detached tensor shares data with `self` (no copy) but does not
    /// require gradients and has no backward op, so no backward pass through
    /// it can reach the producing network.
    pub fn detach(&self) -> Tensor {
        Tensor {
            data: Rc::clone(&self.data),
            grad: Rc::new(RefCell::new(None)),
            backward_op: Rc::new(RefCell::new(None)),
            requires_grad: false,
        }
    }

    /// Copy the data out as a `Vec`
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.borrow().to_vec()
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("len", &self.len())
            .field("requires_grad", &self.requires_grad)
            .field("has_grad", &self.grad.borrow().is_some())
            .finish()
    }
}
