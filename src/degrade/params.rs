use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Fixed impairment settings for one run
///
/// Built once at session start and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationParams {
    /// Downscale ratio applied before everything else, in (0, 1]
    pub scale_factor: f64,

    /// Weight of the random noise frame in the blend, in [0, 1]
    pub noise_level: f64,

    /// JPEG quality for the round trip (0 = blockiest, 100 = near-lossless)
    pub compression_quality: u8,

    /// Probability that a frame is dropped, in [0, 1]
    pub drop_rate: f64,

    /// Upper bound of injected latency in seconds
    pub max_delay: f64,
}

impl Default for DegradationParams {
    fn default() -> Self {
        Self {
            scale_factor: 0.07,
            noise_level: 0.2,
            compression_quality: 30,
            drop_rate: 0.1,
            max_delay: 0.35,
        }
    }
}

impl DegradationParams {
    /// Upper delay bound; saturates for values `validate` would reject
    pub fn max_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.max_delay).unwrap_or(if self.max_delay > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.scale_factor > 0.0 && self.scale_factor <= 1.0) {
            return Err(invalid("degradation.scale_factor", self.scale_factor));
        }

        if !(0.0..=1.0).contains(&self.noise_level) {
            return Err(invalid("degradation.noise_level", self.noise_level));
        }

        if self.compression_quality > 100 {
            return Err(invalid("degradation.compression_quality", self.compression_quality));
        }

        if !(0.0..=1.0).contains(&self.drop_rate) {
            return Err(invalid("degradation.drop_rate", self.drop_rate));
        }

        if Duration::try_from_secs_f64(self.max_delay).is_err() {
            return Err(invalid("degradation.max_delay", self.max_delay));
        }

        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> crate::error::LofiCamError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_settings() {
        let params = DegradationParams::default();

        assert_eq!(params.scale_factor, 0.07);
        assert_eq!(params.noise_level, 0.2);
        assert_eq!(params.compression_quality, 30);
        assert_eq!(params.drop_rate, 0.1);
        assert_eq!(params.max_delay(), Duration::from_millis(350));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_boundaries_are_accepted() {
        let params = DegradationParams {
            scale_factor: 1.0,
            noise_level: 1.0,
            compression_quality: 100,
            drop_rate: 1.0,
            max_delay: 0.0,
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let base = DegradationParams::default();

        for params in [
            DegradationParams { scale_factor: 0.0, ..base },
            DegradationParams { scale_factor: 1.5, ..base },
            DegradationParams { scale_factor: f64::NAN, ..base },
            DegradationParams { noise_level: -0.1, ..base },
            DegradationParams { compression_quality: 101, ..base },
            DegradationParams { drop_rate: 1.01, ..base },
            DegradationParams { max_delay: -1.0, ..base },
            DegradationParams { max_delay: f64::INFINITY, ..base },
            DegradationParams { max_delay: f64::NAN, ..base },
            DegradationParams { max_delay: 1e20, ..base },
        ] {
            assert!(params.validate().is_err(), "{:?} should be invalid", params);
        }
    }

    #[test]
    fn test_unrepresentable_max_delay_does_not_panic() {
        let huge = DegradationParams { max_delay: 1e20, ..Default::default() };
        assert_eq!(huge.max_delay(), Duration::MAX);

        let nan = DegradationParams { max_delay: f64::NAN, ..Default::default() };
        assert_eq!(nan.max_delay(), Duration::ZERO);
    }
}
