//! Byte scaling.
//!
//! Linearly maps every value in `[min, max]` onto `[0, top]` and stores the
//! result as `u8`. Values at or above `max` become `top`, values at or below
//! `min` become 0, NaN becomes 0.
//!
//! Integer and floating point kinds use slightly different rounding:
//!
//! - integer: `floor(((top + 1) * (v - min) - 1) / (max - min))`
//! - float: `floor((top + 0.9999) * (v - min) / (max - min))`

use bon::Builder;
use ndarray::{Array, ArrayBase, Data, Dimension};

use crate::histogram::Sample;
use crate::utils::{RangeError, value_range};

/// Byte scaling errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScaleError {
    #[error("empty scaling range: max ({max}) must be greater than min ({min})")]
    EmptyRange { min: f64, max: f64 },

    #[error("{name} must be finite, got {value}")]
    NonFiniteBound { name: &'static str, value: f64 },

    #[error(transparent)]
    Range(#[from] RangeError),
}

/// Byte scaling parameters.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct ByteScaleConfig {
    /// Smallest value considered. Defaults to the data minimum.
    pub min: Option<f64>,

    /// Largest value considered. Defaults to the data maximum.
    pub max: Option<f64>,

    /// Largest output value. Default: 255.
    #[builder(default = 255)]
    pub top: u8,

    /// Ignore NaN and infinities when detecting the data range.
    #[builder(default)]
    pub skip_invalid: bool,
}

impl<S: byte_scale_config_builder::IsComplete> ByteScaleConfigBuilder<S> {
    /// Build and validate the configuration.
    pub fn build(self) -> Result<ByteScaleConfig, ScaleError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl ByteScaleConfig {
    fn validate(&self) -> Result<(), ScaleError> {
        for (name, bound) in [("min", self.min), ("max", self.max)] {
            if let Some(value) = bound.filter(|v| !v.is_finite()) {
                return Err(ScaleError::NonFiniteBound { name, value });
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if max <= min {
                return Err(ScaleError::EmptyRange { min, max });
            }
        }
        Ok(())
    }

    /// Resolve missing bounds from `samples` and return the scaler.
    pub fn scaler_for<T, I>(&self, samples: I) -> Result<ByteScaler, ScaleError>
    where
        T: Sample,
        I: IntoIterator<Item = T>,
    {
        self.validate()?;
        let (min, max) = match (self.min, self.max) {
            (Some(min), Some(max)) => (min, max),
            (min, max) => {
                let (lo, hi) = value_range(samples, self.skip_invalid)?;
                (min.unwrap_or(lo.as_f64()), max.unwrap_or(hi.as_f64()))
            }
        };
        ByteScaler::new(min, max, self.top, T::KIND.is_float())
    }
}

impl Default for ByteScaleConfig {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            top: 255,
            skip_invalid: false,
        }
    }
}

/// A resolved linear map from `[min, max]` onto `[0, top]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ByteScaler {
    min: f64,
    max: f64,
    top: u8,
    float: bool,
}

impl ByteScaler {
    /// # Errors
    ///
    /// [`ScaleError::EmptyRange`] unless `min < max`.
    pub fn new(min: f64, max: f64, top: u8, float: bool) -> Result<Self, ScaleError> {
        // Also rejects NaN bounds.
        if !(max > min) {
            return Err(ScaleError::EmptyRange { min, max });
        }
        Ok(Self {
            min,
            max,
            top,
            float,
        })
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[inline]
    pub fn top(&self) -> u8 {
        self.top
    }

    /// Scale one value.
    #[inline]
    pub fn scale<T: Sample>(&self, value: T) -> u8 {
        self.scale_f64(value.as_f64())
    }

    fn scale_f64(&self, value: f64) -> u8 {
        if value.is_nan() {
            return 0;
        }
        let v = value.clamp(self.min, self.max);
        let top = f64::from(self.top);
        let span = self.max - self.min;
        let scaled = if self.float {
            ((top + 0.9999) * (v - self.min) / span).floor()
        } else {
            (((top + 1.0) * (v - self.min) - 1.0) / span).floor()
        };
        scaled.clamp(0.0, top) as u8
    }
}

/// Byte-scale a sample sequence.
///
/// # Example
///
/// ```
/// use idl_functions::bytscl::{ByteScaleConfig, bytscl};
///
/// let out = bytscl(&[0i32, 1, 5, 10], &ByteScaleConfig::default()).unwrap();
/// assert_eq!(out, vec![0, 25, 127, 255]);
/// ```
pub fn bytscl<T: Sample>(samples: &[T], config: &ByteScaleConfig) -> Result<Vec<u8>, ScaleError> {
    let scaler = config.scaler_for(samples.iter().copied())?;
    Ok(samples.iter().map(|&v| scaler.scale(v)).collect())
}

/// Byte-scale an array, keeping its shape.
pub fn bytscl_array<T, S, D>(
    samples: &ArrayBase<S, D>,
    config: &ByteScaleConfig,
) -> Result<Array<u8, D>, ScaleError>
where
    T: Sample,
    S: Data<Elem = T>,
    D: Dimension,
{
    let scaler = config.scaler_for(samples.iter().copied())?;
    Ok(samples.map(|&v| scaler.scale(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rstest::rstest;

    #[rstest]
    #[case::lower(0, 0)]
    #[case::first_step(1, 25)]
    #[case::middle(5, 127)]
    #[case::upper(10, 255)]
    fn test_integer_formula(#[case] value: i32, #[case] expected: u8) {
        let scaler = ByteScaler::new(0.0, 10.0, 255, false).unwrap();
        assert_eq!(scaler.scale(value), expected);
    }

    #[test]
    fn test_float_formula() {
        let out = bytscl(&[0.0f32, 0.5, 1.0], &ByteScaleConfig::default()).unwrap();
        assert_eq!(out, vec![0, 127, 255]);
    }

    #[test]
    fn test_clips_outside_range() {
        let config = ByteScaleConfig::builder().min(10.0).max(20.0).build().unwrap();
        let out = bytscl(&[-5i16, 10, 20, 300], &config).unwrap();
        assert_eq!(out, vec![0, 0, 255, 255]);
    }

    #[test]
    fn test_top_caps_output() {
        let config = ByteScaleConfig::builder().top(200).build().unwrap();
        let data: Vec<f64> = (0..100).map(|i| f64::from(i) * 0.37 - 9.0).collect();
        let out = bytscl(&data, &config).unwrap();
        assert_eq!(out.iter().copied().max(), Some(200));
        assert_eq!(out.iter().copied().min(), Some(0));
    }

    #[test]
    fn test_max_keyword_saturates() {
        let data: Vec<u16> = (0..=255).collect();
        let config = ByteScaleConfig::builder().max(200.0).build().unwrap();
        let out = bytscl(&data, &config).unwrap();
        let saturated = out.iter().filter(|&&b| b == 255).count();
        assert_eq!(saturated, data.iter().filter(|&&v| v >= 200).count());
    }

    #[test]
    fn test_nan_handling() {
        let data = [f64::NAN, 0.0, 2.0, 4.0];
        assert!(matches!(
            bytscl(&data, &ByteScaleConfig::default()),
            Err(ScaleError::Range(RangeError::NonFinite { position: 0 }))
        ));

        let config = ByteScaleConfig::builder().skip_invalid(true).build().unwrap();
        let out = bytscl(&data, &config).unwrap();
        assert_eq!(out, vec![0, 0, 127, 255]);
    }

    #[test]
    fn test_empty_range() {
        assert_eq!(
            bytscl(&[3u8, 3, 3], &ByteScaleConfig::default()),
            Err(ScaleError::EmptyRange { min: 3.0, max: 3.0 })
        );
        assert!(ByteScaleConfig::builder().min(2.0).max(1.0).build().is_err());
    }

    #[test]
    fn test_array_keeps_shape() {
        let data = array![[0.0f64, 1.0], [2.0, 4.0]];
        let out = bytscl_array(&data, &ByteScaleConfig::default()).unwrap();
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out, array![[0u8, 63], [127, 255]]);
    }
}
