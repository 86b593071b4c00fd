use ndarray::{Array2, ArrayView2};

/// A loss function comparing a prediction against its target.
///
/// Implementors provide the unreduced, element-wise loss and its derivative. The scalar
/// `loss` is its mean-reduced counterpart.
pub trait LossFn {
    /// The loss of every element, same shape as the inputs.
    fn elementwise(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;

    /// The derivative of every element's loss with respect to its prediction.
    fn elementwise_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;

    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        self.elementwise(y_pred, y).mean().unwrap_or_default()
    }
}

impl<L: LossFn + ?Sized> LossFn for Box<L> {
    fn elementwise(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        (**self).elementwise(y_pred, y)
    }

    fn elementwise_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        (**self).elementwise_prime(y_pred, y)
    }
}
