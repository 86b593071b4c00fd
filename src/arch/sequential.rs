use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Model, layers::Layer};
use crate::{Result, TrainErr, initialization::Init};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// All the layers' parameters live in a single flat buffer, each layer reading the slice that
/// follows the previous layer's.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
    params: Vec<f32>,
    grad: Vec<f32>,
}

impl Sequential {
    /// Creates a new `Sequential` with every parameter set to zero.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<Layer> = layers.into_iter().collect();
        let size = layers.iter().map(Layer::size).sum();

        Self {
            layers,
            params: vec![0.; size],
            grad: vec![0.; size],
        }
    }

    /// Creates a new `Sequential` with the given parameters.
    ///
    /// # Errors
    /// `SizeMismatch` if `params` doesn't have exactly as many values as the layers need.
    pub fn with_params<I>(layers: I, params: Vec<f32>) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let mut model = Self::new(layers);

        if params.len() != model.params.len() {
            return Err(TrainErr::SizeMismatch {
                what: "model parameters",
                got: params.len(),
                expected: model.params.len(),
            });
        }

        model.params = params;
        Ok(model)
    }

    /// Returns the layers of the model.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Overwrites every layer's parameters using the given initialization strategy.
    ///
    /// # Arguments
    /// * `init` - How to generate the parameters of each layer.
    /// * `rng` - The source of randomness for random strategies.
    pub fn initialize<R: Rng>(&mut self, init: Init, rng: &mut R) -> Result<()> {
        let mut offset = 0;

        for layer in &self.layers {
            let size = layer.size();
            let (fan_in, fan_out) = layer.dim();

            let mut param_gen = init.param_gen(rng, size, fan_in, fan_out)?;
            let sample = param_gen.sample(size).ok_or(TrainErr::SizeMismatch {
                what: "initialized parameters",
                got: 0,
                expected: size,
            })?;

            self.params[offset..offset + size].copy_from_slice(&sample);
            offset += size;
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.params.len()
    }

    fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut offset = 0;
        let mut a = x.to_owned();

        for layer in self.layers.iter_mut() {
            let size = layer.size();
            a = layer.forward(&self.params[offset..offset + size], a.view())?;
            offset += size;
        }

        Ok(a)
    }

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut offset = 0;
        let mut a = x.to_owned();

        for layer in &self.layers {
            let size = layer.size();
            a = layer.predict(&self.params[offset..offset + size], a.view())?;
            offset += size;
        }

        Ok(a)
    }

    fn backward(&mut self, mut d: Array2<f32>) -> Result<()> {
        let mut end = self.params.len();

        for layer in self.layers.iter_mut().rev() {
            let start = end - layer.size();
            d = layer.backward(&self.params[start..end], &mut self.grad[start..end], d)?;
            end = start;
        }

        Ok(())
    }

    fn params(&self) -> &[f32] {
        &self.params
    }

    fn grad(&self) -> &[f32] {
        &self.grad
    }

    fn params_and_grad(&mut self) -> (&mut [f32], &[f32]) {
        (&mut self.params, &self.grad)
    }

    fn zero_grad(&mut self) {
        self.grad.fill(0.);
    }
}
