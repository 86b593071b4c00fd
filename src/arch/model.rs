use ndarray::{Array2, ArrayView2};

use crate::Result;

/// A trainable model.
///
/// The model owns its trainable parameters and a gradient buffer of the same length. A
/// `forward` call records whatever the following `backward` needs; `predict` is the
/// inference path and records nothing.
pub trait Model {
    /// Returns the amount of trainable parameters in the model.
    fn size(&self) -> usize;

    /// Computes the model's prediction for `x`, keeping the state needed by `backward`.
    fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Computes the model's prediction for `x` without tracking gradients.
    fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Backpropagates `d`, the derivative of the loss with respect to the last prediction.
    ///
    /// Implementations must add to the gradient buffer rather than overwrite it, so several
    /// backward passes accumulate until `zero_grad` is called.
    fn backward(&mut self, d: Array2<f32>) -> Result<()>;

    /// The model's trainable parameters.
    fn params(&self) -> &[f32];

    /// The gradient accumulated since the last `zero_grad`.
    fn grad(&self) -> &[f32];

    /// Mutable parameters alongside the accumulated gradient, for the optimizer.
    fn params_and_grad(&mut self) -> (&mut [f32], &[f32]);

    /// Resets the accumulated gradient to zero.
    fn zero_grad(&mut self);
}
