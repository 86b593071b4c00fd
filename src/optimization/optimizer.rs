use crate::{Result, TrainErr};

/// Defines the strategy for updating model parameters based on calculated gradients.
///
/// An optimizer is bound to a fixed amount of parameters when it's created and refuses to
/// update any other amount.
pub trait Optimizer {
    /// Returns the amount of parameters this optimizer was created for.
    fn size(&self) -> usize;

    /// Updates the provided slice of parameters using the accumulated gradient.
    ///
    /// # Arguments
    /// * `grad` - A reference to the model's gradient.
    /// * `params` - The parameters to update.
    ///
    /// # Returns
    /// An error if `grad` or `params` don't have `size` values.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;
}

impl<O: Optimizer + ?Sized> Optimizer for Box<O> {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        (**self).update_params(grad, params)
    }
}

/// Checks that both slices have the length the optimizer was created for.
pub(super) fn check_lens(len: usize, grad: &[f32], params: &[f32]) -> Result<()> {
    if grad.len() != len {
        return Err(TrainErr::SizeMismatch {
            what: "gradient",
            got: grad.len(),
            expected: len,
        });
    }

    if params.len() != len {
        return Err(TrainErr::SizeMismatch {
            what: "parameters",
            got: params.len(),
            expected: len,
        });
    }

    Ok(())
}
