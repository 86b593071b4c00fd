/// Logistic function scaled by `amp`, so its image is `(0, amp)`.
#[derive(Clone, Debug, Default)]
pub struct Sigmoid {
    amp: f32,
}

impl Sigmoid {
    pub fn new(amp: f32) -> Self {
        Self { amp }
    }

    pub fn f(&self, z: f32) -> f32 {
        self.amp / (1. + (-z).exp())
    }

    pub fn df(&self, z: f32) -> f32 {
        let e = (-z).exp();
        (self.amp * e) / (e + 1.).powi(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_is_half_the_amplitude() {
        let s = Sigmoid::new(2.);
        assert_eq!(s.f(0.), 1.);
        assert_eq!(s.df(0.), 0.5);
    }
}
