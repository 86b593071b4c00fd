use ndarray::{Array2, ArrayView2};

use super::LossFn;

/// Mean absolute error loss function.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mae;

impl Mae {
    /// Returns a new `Mae`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Mae {
    fn elementwise(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        (&y_pred - &y).mapv(f32::abs)
    }

    // The subgradient at zero is taken as zero.
    fn elementwise_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        (&y_pred - &y).mapv(|x| if x == 0. { 0. } else { x.signum() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn mean_of_absolute_differences() {
        let y_pred = array![[1., -2.], [3., 4.]];
        let y = array![[1., 0.], [1., 5.]];

        assert_eq!(Mae.loss(y_pred.view(), y.view()), 1.25);
        assert_eq!(
            Mae.elementwise_prime(y_pred.view(), y.view()),
            array![[0., -1.], [1., -1.]]
        );
    }
}
