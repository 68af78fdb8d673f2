//! Numeric sample kinds and their binning arithmetic.
//!
//! Every supported scalar kind maps to a wider arithmetic type in which bin
//! boundaries, spans and indices are computed. Narrow integer kinds are
//! promoted so that `max - min` and `nbins * binsize + min` cannot overflow:
//!
//! | Sample kind         | Arithmetic |
//! |---------------------|------------|
//! | `i8`, `u8`, `i16`   | `i32`      |
//! | `u16`, `i32`        | `i64`      |
//! | `u32`, `i64`, `u64` | `i128`     |
//! | `f32`               | `f32`      |
//! | `f64`               | `f64`      |
//!
//! Floating point kinds keep their own precision.

use std::fmt::{Debug, Display};

use num_traits::{Num, NumCast, ToPrimitive};

// =============================================================================
// SampleKind
// =============================================================================

/// Scalar kind of a sample sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl SampleKind {
    /// Whether this is a floating point kind.
    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, SampleKind::F32 | SampleKind::F64)
    }

    /// Conventional lowercase name (`"uint8"`, `"float32"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            SampleKind::I8 => "int8",
            SampleKind::U8 => "uint8",
            SampleKind::I16 => "int16",
            SampleKind::U16 => "uint16",
            SampleKind::I32 => "int32",
            SampleKind::U32 => "uint32",
            SampleKind::I64 => "int64",
            SampleKind::U64 => "uint64",
            SampleKind::F32 => "float32",
            SampleKind::F64 => "float64",
        }
    }
}

impl Display for SampleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// BinArith
// =============================================================================

/// Arithmetic type in which binning is computed.
pub trait BinArith:
    Copy + PartialOrd + Debug + Display + Send + Sync + Num + NumCast + 'static
{
    /// `floor(self)` as a non-negative index, `None` if negative, not finite
    /// or too large for `usize`.
    fn floor_index(self) -> Option<usize>;

    /// Number of whole `step`s in a non-negative `self`, `None` when the
    /// quotient is not a valid index.
    ///
    /// Floating point kinds count a final step that lands within a few ULP
    /// of `self`, so `span / (span / k)` yields `k` rather than `k - 1`.
    fn whole_steps(self, step: Self) -> Option<usize>;

    /// `self * mul + add`, `None` on overflow.
    fn checked_mul_add(self, mul: Self, add: Self) -> Option<Self>;
}

macro_rules! impl_bin_arith_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl BinArith for $t {
                #[inline]
                fn floor_index(self) -> Option<usize> {
                    usize::try_from(self).ok()
                }

                #[inline]
                fn whole_steps(self, step: Self) -> Option<usize> {
                    (self / step).floor_index()
                }

                #[inline]
                fn checked_mul_add(self, mul: Self, add: Self) -> Option<Self> {
                    self.checked_mul(mul)?.checked_add(add)
                }
            }
        )*
    };
}

macro_rules! impl_bin_arith_float {
    ($($t:ty),* $(,)?) => {
        $(
            impl BinArith for $t {
                #[inline]
                fn floor_index(self) -> Option<usize> {
                    if self >= 0.0 {
                        self.floor().to_usize()
                    } else {
                        None
                    }
                }

                #[inline]
                fn whole_steps(self, step: Self) -> Option<usize> {
                    let steps = (self / step).floor_index()?;
                    let next = (steps + 1) as $t * step;
                    if (next - self).abs() <= 4.0 * <$t>::EPSILON * self.abs() {
                        Some(steps + 1)
                    } else {
                        Some(steps)
                    }
                }

                #[inline]
                fn checked_mul_add(self, mul: Self, add: Self) -> Option<Self> {
                    let out = self * mul + add;
                    out.is_finite().then_some(out)
                }
            }
        )*
    };
}

impl_bin_arith_int!(i32, i64, i128);
impl_bin_arith_float!(f32, f64);

// =============================================================================
// Sample
// =============================================================================

/// A scalar kind the histogram engine accepts.
///
/// Implemented for `i8`, `u8`, `i16`, `u16`, `i32`, `u32`, `i64`, `u64`,
/// `f32` and `f64`.
pub trait Sample:
    Copy + PartialOrd + Debug + Display + Send + Sync + NumCast + 'static
{
    /// Arithmetic type used for bin computations.
    type Wide: BinArith;

    const KIND: SampleKind;

    /// Lossless promotion to the arithmetic type.
    fn widen(self) -> Self::Wide;

    /// Narrow an arithmetic value back to this kind, saturating at the
    /// kind's bounds.
    fn saturate(wide: Self::Wide) -> Self;

    /// `false` for NaN and infinities. Integer kinds are always finite.
    fn is_finite(self) -> bool;

    #[inline]
    fn as_f64(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }
}

macro_rules! impl_sample_int {
    ($($t:ty => $wide:ty, $kind:ident);* $(;)?) => {
        $(
            impl Sample for $t {
                type Wide = $wide;
                const KIND: SampleKind = SampleKind::$kind;

                #[inline]
                fn widen(self) -> $wide {
                    <$wide as From<$t>>::from(self)
                }

                #[inline]
                fn saturate(wide: $wide) -> Self {
                    if wide > <$wide as From<$t>>::from(<$t>::MAX) {
                        <$t>::MAX
                    } else if wide < <$wide as From<$t>>::from(<$t>::MIN) {
                        <$t>::MIN
                    } else {
                        wide as $t
                    }
                }

                #[inline]
                fn is_finite(self) -> bool {
                    true
                }
            }
        )*
    };
}

macro_rules! impl_sample_float {
    ($($t:ty => $kind:ident);* $(;)?) => {
        $(
            impl Sample for $t {
                type Wide = $t;
                const KIND: SampleKind = SampleKind::$kind;

                #[inline]
                fn widen(self) -> $t {
                    self
                }

                #[inline]
                fn saturate(wide: $t) -> Self {
                    wide
                }

                #[inline]
                fn is_finite(self) -> bool {
                    <$t>::is_finite(self)
                }
            }
        )*
    };
}

impl_sample_int! {
    i8 => i32, I8;
    u8 => i32, U8;
    i16 => i32, I16;
    u16 => i64, U16;
    i32 => i64, I32;
    u32 => i128, U32;
    i64 => i128, I64;
    u64 => i128, U64;
}

impl_sample_float! {
    f32 => F32;
    f64 => F64;
}
