use super::{Optimizer, optimizer::check_lens};
use crate::Result;

/// Gradient descent optimization algorithm.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    len: usize,
    learning_rate: f32,
}

impl GradientDescent {
    /// Returns a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance updates.
    /// * `learning_rate` - The *length* of the steps taken on `update_params`.
    pub fn new(len: usize, learning_rate: f32) -> Self {
        Self { len, learning_rate }
    }
}

impl Optimizer for GradientDescent {
    fn size(&self) -> usize {
        self.len
    }

    /// Makes a step in the opposite direction of the gradient, with a length of
    /// `learning_rate`.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_lens(self.len, grad, params)?;
        let lr = self.learning_rate;

        for (w, g) in params.iter_mut().zip(grad) {
            *w -= lr * g;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrainErr;

    #[test]
    fn steps_against_the_gradient() {
        let mut gd = GradientDescent::new(2, 0.5);
        let mut params = [1., 1.];

        gd.update_params(&[2., -4.], &mut params).unwrap();
        assert_eq!(params, [0., 3.]);
    }

    #[test]
    fn foreign_lengths_are_rejected() {
        let mut gd = GradientDescent::new(2, 0.5);
        let mut params = [1., 1., 1.];

        let err = gd.update_params(&[1., 1., 1.], &mut params);
        assert!(matches!(
            err,
            Err(TrainErr::SizeMismatch { what: "gradient", got: 3, expected: 2 })
        ));
    }
}
