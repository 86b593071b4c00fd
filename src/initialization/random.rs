use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use super::ParamGen;
use crate::{Result, TrainErr};

/// A parameter generator that follows a certain probabilistic distribution.
pub struct RandParamGen<'r, R: Rng, D: Distribution<f32>> {
    rng: &'r mut R,
    distribution: D,
    remaining: usize,
}

impl<'r, R: Rng, D: Distribution<f32>> RandParamGen<'r, R, D> {
    /// Creates a new `RandParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `distribution` - The distribution to sample the random numbers from.
    /// * `limit` - The maximum amount of numbers to generate.
    pub fn new(rng: &'r mut R, distribution: D, limit: usize) -> Self {
        Self {
            rng,
            distribution,
            remaining: limit,
        }
    }
}

impl<'r, R: Rng> RandParamGen<'r, R, Uniform<f32>> {
    /// Creates a new generator with a uniform distribution over `[low, high)`.
    ///
    /// # Returns
    /// An error if the range is invalid (low >= high).
    pub fn uniform(rng: &'r mut R, limit: usize, low: f32, high: f32) -> Result<Self> {
        let distribution =
            Uniform::new(low, high).map_err(|e| TrainErr::Distribution(e.to_string()))?;
        Ok(Self::new(rng, distribution, limit))
    }

    /// Creates a new generator using Xavier uniform initialization.
    ///
    /// # Arguments
    /// * `fan_in` - The number of input units in the weight tensor.
    /// * `fan_out` - The number of output units in the weight tensor.
    pub fn xavier_uniform(rng: &'r mut R, limit: usize, fan_in: usize, fan_out: usize) -> Result<Self> {
        let range = (6. / (fan_in + fan_out) as f32).sqrt();
        Self::uniform(rng, limit, -range, range)
    }

    /// Creates a new generator using LeCun uniform initialization.
    pub fn lecun_uniform(rng: &'r mut R, limit: usize, fan_in: usize) -> Result<Self> {
        let range = (3. / fan_in as f32).sqrt();
        Self::uniform(rng, limit, -range, range)
    }
}

impl<'r, R: Rng> RandParamGen<'r, R, Normal<f32>> {
    /// Creates a new generator with a normal distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is not finite (Nan or infinite).
    pub fn normal(rng: &'r mut R, limit: usize, mean: f32, std_dev: f32) -> Result<Self> {
        let distribution =
            Normal::new(mean, std_dev).map_err(|e| TrainErr::Distribution(e.to_string()))?;
        Ok(Self::new(rng, distribution, limit))
    }

    /// Creates a new generator using Kaiming normal initialization.
    pub fn kaiming(rng: &'r mut R, limit: usize, fan_in: usize) -> Result<Self> {
        let std_dev = (2. / fan_in as f32).sqrt();
        Self::normal(rng, limit, 0., std_dev)
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<'_, R, D> {
    fn sample(&mut self, mut n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        n = n.min(self.remaining);
        self.remaining -= n;

        let sample = (0..n)
            .map(|_| self.distribution.sample(&mut *self.rng))
            .collect();

        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn exact() {
        const SIZE: usize = 10;
        let mut rng = StdRng::seed_from_u64(42);

        let mut param_gen = RandParamGen::uniform(&mut rng, SIZE, -1., 1.).unwrap();
        let sample = param_gen.sample(SIZE).unwrap();

        assert_eq!(sample.len(), SIZE);
        assert!(sample.iter().all(|v| (-1.0..1.0).contains(v)));
        assert!(param_gen.sample(1).is_none());
    }

    #[test]
    fn xavier_range_depends_on_the_fans() {
        let mut rng = StdRng::seed_from_u64(42);

        let mut param_gen = RandParamGen::xavier_uniform(&mut rng, 100, 3, 3).unwrap();
        let sample = param_gen.sample(100).unwrap();

        assert!(sample.iter().all(|v| v.abs() <= 1.));
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        let mut rng = StdRng::seed_from_u64(42);

        assert!(RandParamGen::uniform(&mut rng, 1, 1., -1.).is_err());
        assert!(RandParamGen::normal(&mut rng, 1, 0., f32::NAN).is_err());
    }
}
