use rand::{rngs::SmallRng, Rng, RngCore, SeedableRng};
use std::time::Duration;

pub struct DwellSampler {
    rng: SmallRng,
    min: f64,
    max: f64,
}

impl DwellSampler {
    pub fn new(min: f64, max: f64) -> Self {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        Self::from_seed(min, max, &seed)
    }

    pub fn from_seed(min: f64, max: f64, seed: &[u8; 32]) -> Self {
        Self {
            rng: SmallRng::from_seed(*seed),
            min,
            max,
        }
    }

    pub fn next_dwell(&mut self) -> Duration {
        let seconds = if self.max <= self.min {
            self.min
        } else {
            self.rng.random_range(self.min..=self.max)
        };
        Duration::from_secs_f64(seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_bounds_give_a_fixed_dwell() {
        let mut sampler = DwellSampler::from_seed(0.5, 0.5, &[7; 32]);
        for _ in 0..10 {
            assert_eq!(sampler.next_dwell(), Duration::from_secs_f64(0.5));
        }
    }

    #[test]
    fn samples_stay_inside_the_bounds() {
        let mut sampler = DwellSampler::from_seed(0.1, 0.3, &[7; 32]);
        for _ in 0..100 {
            let dwell = sampler.next_dwell();
            assert!(dwell >= Duration::from_secs_f64(0.1));
            assert!(dwell <= Duration::from_secs_f64(0.3));
        }
    }
}
