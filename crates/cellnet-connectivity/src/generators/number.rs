// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Stochastic number generators for connection counts, delays and weights.
*/

use std::fmt;

use rand::Rng;
use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};

use crate::types::{ConnError, ConnResult};

/// Upper bound on resampling a truncated Gaussian before falling back to its clamped mean
const MAX_GAUSSIAN_RESAMPLES: usize = 10_000;

/// Shape of a number generator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Distribution {
    Fixed { value: f32 },
    /// Uniform over `[min, max]`
    Uniform { min: f32, max: f32 },
    /// Normal distribution truncated to `(min, max)`
    Gaussian {
        mean: f32,
        std_dev: f32,
        min: f32,
        max: f32,
    },
}

/// Draws numbers from a [`Distribution`], optionally restricted to integers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumberGenerator {
    pub distribution: Distribution,
    pub integer: bool,
}

impl Default for NumberGenerator {
    fn default() -> Self {
        Self::fixed(1.0)
    }
}

impl NumberGenerator {
    pub fn fixed(value: f32) -> Self {
        Self {
            distribution: Distribution::Fixed { value },
            integer: false,
        }
    }

    pub fn uniform(min: f32, max: f32) -> Self {
        Self {
            distribution: Distribution::Uniform { min, max },
            integer: false,
        }
    }

    pub fn gaussian(mean: f32, std_dev: f32, min: f32, max: f32) -> Self {
        Self {
            distribution: Distribution::Gaussian {
                mean,
                std_dev,
                min,
                max,
            },
            integer: false,
        }
    }

    /// Restrict draws to integers
    pub fn as_integer(mut self) -> Self {
        self.integer = true;
        self
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.distribution, Distribution::Fixed { .. })
    }

    pub fn validate(&self) -> ConnResult<()> {
        let ok = match self.distribution {
            Distribution::Fixed { value } => value.is_finite(),
            Distribution::Uniform { min, max } => min.is_finite() && max.is_finite() && min <= max,
            Distribution::Gaussian {
                mean,
                std_dev,
                min,
                max,
            } => mean.is_finite() && std_dev.is_finite() && std_dev >= 0.0 && min <= max,
        };
        if ok {
            Ok(())
        } else {
            Err(ConnError::InvalidGenerator(self.to_string()))
        }
    }

    /// Largest value a draw can take, `None` for an unbounded Gaussian
    pub fn upper_bound(&self) -> Option<f32> {
        match self.distribution {
            Distribution::Fixed { value } => Some(value),
            Distribution::Uniform { max, .. } => Some(max),
            Distribution::Gaussian { max, .. } => max.is_finite().then_some(max),
        }
    }

    /// Expected value of a draw, ignoring Gaussian truncation
    pub fn expected(&self) -> f32 {
        let value = match self.distribution {
            Distribution::Fixed { value } => value,
            Distribution::Uniform { min, max } => (min + max) / 2.0,
            Distribution::Gaussian { mean, .. } => mean,
        };
        if self.integer && self.is_fixed() {
            round_half_up(value)
        } else {
            value
        }
    }

    pub fn next_number<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match self.distribution {
            Distribution::Fixed { value } => {
                if self.integer {
                    round_half_up(value)
                } else {
                    value
                }
            }
            Distribution::Uniform { min, max } => {
                if self.integer {
                    let low = min.round() as i64;
                    let high = (max.round() as i64).max(low);
                    rng.gen_range(low..=high) as f32
                } else {
                    min + rng.gen::<f32>() * (max - min)
                }
            }
            Distribution::Gaussian {
                mean,
                std_dev,
                min,
                max,
            } => self.next_gaussian(rng, mean, std_dev, min, max),
        }
    }

    fn next_gaussian<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        mean: f32,
        std_dev: f32,
        min: f32,
        max: f32,
    ) -> f32 {
        let clamped = mean.max(min).min(max);
        let fallback = if self.integer {
            round_half_up(clamped)
        } else {
            clamped
        };
        let normal = match Normal::new(mean, std_dev) {
            Ok(normal) => normal,
            Err(_) => return fallback,
        };
        for _ in 0..MAX_GAUSSIAN_RESAMPLES {
            let sample: f32 = normal.sample(rng);
            if self.integer {
                let rounded = round_half_up(sample);
                if rounded >= min && rounded <= max {
                    return rounded;
                }
            } else if sample > min && sample < max {
                return sample;
            }
        }
        fallback
    }
}

fn round_half_up(value: f32) -> f32 {
    (value + 0.5).floor()
}

impl fmt::Display for NumberGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.distribution {
            Distribution::Fixed { value } => write!(f, "{}", value)?,
            Distribution::Uniform { min, max } => write!(f, "{} -> {}", min, max)?,
            Distribution::Gaussian {
                mean,
                std_dev,
                min,
                max,
            } => write!(f, "{} +/- {} ({} -> {})", mean, std_dev, min, max)?,
        }
        if self.integer {
            write!(f, " (int)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fixed() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(NumberGenerator::fixed(2.5).next_number(&mut rng), 2.5);
        assert_eq!(
            NumberGenerator::fixed(2.5).as_integer().next_number(&mut rng),
            3.0
        );
    }

    #[test]
    fn test_upper_bound() {
        assert_eq!(NumberGenerator::fixed(2.0).upper_bound(), Some(2.0));
        assert_eq!(NumberGenerator::uniform(1.0, 4.0).upper_bound(), Some(4.0));
        assert_eq!(NumberGenerator::gaussian(3.0, 1.0, 0.0, 5.0).upper_bound(), Some(5.0));
        assert_eq!(
            NumberGenerator::gaussian(3.0, 1.0, 0.0, f32::INFINITY).upper_bound(),
            None
        );
    }

    #[test]
    fn test_uniform_float_in_range() {
        let generator = NumberGenerator::uniform(-2.0, 3.0);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let v = generator.next_number(&mut rng);
            assert!((-2.0..=3.0).contains(&v));
        }
    }

    #[test]
    fn test_uniform_integer_hits_both_ends() {
        let generator = NumberGenerator::uniform(1.0, 3.0).as_integer();
        let mut rng = StdRng::seed_from_u64(5);
        let mut seen = [false; 4];
        for _ in 0..500 {
            let v = generator.next_number(&mut rng);
            assert_eq!(v.fract(), 0.0);
            seen[v as usize] = true;
        }
        assert!(!seen[0]);
        assert!(seen[1] && seen[2] && seen[3]);
    }

    #[test]
    fn test_gaussian_is_truncated() {
        let generator = NumberGenerator::gaussian(0.0, 10.0, -1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..500 {
            let v = generator.next_number(&mut rng);
            assert!(v > -1.0 && v < 1.0);
        }
    }

    #[test]
    fn test_gaussian_impossible_window_falls_back_to_clamped_mean() {
        // Open interval (5, 5) admits nothing
        let generator = NumberGenerator::gaussian(3.0, 1.0, 5.0, 5.0);
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(generator.next_number(&mut rng), 5.0);
    }

    #[test]
    fn test_short_strings() {
        assert_eq!(NumberGenerator::fixed(5.0).to_string(), "5");
        assert_eq!(NumberGenerator::uniform(1.0, 2.5).to_string(), "1 -> 2.5");
        assert_eq!(
            NumberGenerator::gaussian(3.0, 0.5, 1.0, 5.0)
                .as_integer()
                .to_string(),
            "3 +/- 0.5 (1 -> 5) (int)"
        );
    }

    #[test]
    fn test_validate() {
        assert!(NumberGenerator::uniform(3.0, 1.0).validate().is_err());
        assert!(NumberGenerator::gaussian(0.0, -1.0, -5.0, 5.0)
            .validate()
            .is_err());
        assert!(NumberGenerator::fixed(f32::NAN).validate().is_err());
        assert!(NumberGenerator::gaussian(0.0, 1.0, -5.0, 5.0)
            .validate()
            .is_ok());
    }
}
