//! Backward operation trait

/// A node on the gradient tape.
///
/// Implementations read the gradient of the tensor they produced, accumulate
/// gradients into the cells of their input tensors, and recurse into the
/// inputs' own backward ops.
pub trait BackwardOp {
    /// Propagate gradients to this operation's inputs
    fn backward(&self);
}
