use std::cmp::{self, Ordering};
use std::fmt::{self, Debug, Display, LowerHex, UpperHex};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum IntRepr {
    /// Always non-negative.
    PosInt(u64),
    /// Always negative.
    NegInt(i64),
}

/// A MessagePack integer, holding either the full unsigned 64-bit range or
/// the full signed 64-bit range (never both at once — see §3 of the spec).
///
/// A `Value::Int` wraps one of these. Constructed via `From` for any of the
/// primitive integer types.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Integer {
    n: IntRepr,
}

impl Integer {
    /// The smallest representable value, `i64::MIN`.
    pub fn min_value() -> Integer {
        Integer {
            n: IntRepr::NegInt(i64::MIN),
        }
    }

    /// The largest representable value, `u64::MAX`.
    pub fn max_value() -> Integer {
        Integer {
            n: IntRepr::PosInt(u64::MAX),
        }
    }

    /// True if this value fits in `i64`.
    #[inline]
    pub fn is_i64(&self) -> bool {
        match self.n {
            IntRepr::PosInt(n) => n <= i64::MAX as u64,
            IntRepr::NegInt(..) => true,
        }
    }

    /// True if this value fits in `u64`.
    #[inline]
    pub fn is_u64(&self) -> bool {
        matches!(self.n, IntRepr::PosInt(..))
    }

    /// This value as `i64`, or `None` if it doesn't fit.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self.n {
            IntRepr::PosInt(n) => i64::try_from(n).ok(),
            IntRepr::NegInt(n) => Some(n),
        }
    }

    /// This value as `u64`, or `None` if it doesn't fit.
    #[inline]
    pub fn as_u64(&self) -> Option<u64> {
        match self.n {
            IntRepr::PosInt(n) => Some(n),
            IntRepr::NegInt(n) => u64::try_from(n).ok(),
        }
    }

    /// This value cast to `f64` (may lose precision for large magnitudes).
    #[inline]
    pub fn as_f64(&self) -> f64 {
        match self.n {
            IntRepr::PosInt(n) => n as f64,
            IntRepr::NegInt(n) => n as f64,
        }
    }

    /// True if non-negative (i.e. stored in the `PosInt` arm).
    #[inline]
    pub(crate) fn is_positive_repr(&self) -> bool {
        matches!(self.n, IntRepr::PosInt(..))
    }

    pub(crate) fn repr(&self) -> IntRepr {
        self.n
    }
}

impl Default for Integer {
    fn default() -> Self {
        Self {
            n: IntRepr::PosInt(0),
        }
    }
}

impl cmp::Ord for Integer {
    fn cmp(&self, other: &Integer) -> Ordering {
        match (self.n, other.n) {
            (IntRepr::NegInt(lhs), IntRepr::NegInt(rhs)) => lhs.cmp(&rhs),
            (IntRepr::NegInt(_), IntRepr::PosInt(_)) => Ordering::Less,
            (IntRepr::PosInt(_), IntRepr::NegInt(_)) => Ordering::Greater,
            (IntRepr::PosInt(lhs), IntRepr::PosInt(rhs)) => lhs.cmp(&rhs),
        }
    }
}

impl cmp::PartialOrd for Integer {
    fn partial_cmp(&self, other: &Integer) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Debug for Integer {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        Debug::fmt(&self.n, fmt)
    }
}

impl Display for Integer {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self.n {
            IntRepr::PosInt(v) => Display::fmt(&v, fmt),
            IntRepr::NegInt(v) => Display::fmt(&v, fmt),
        }
    }
}

impl UpperHex for Integer {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self.n {
            IntRepr::PosInt(v) => UpperHex::fmt(&v, fmt),
            IntRepr::NegInt(v) => UpperHex::fmt(&(v as u64), fmt),
        }
    }
}

impl LowerHex for Integer {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self.n {
            IntRepr::PosInt(v) => LowerHex::fmt(&v, fmt),
            IntRepr::NegInt(v) => LowerHex::fmt(&(v as u64), fmt),
        }
    }
}

macro_rules! impl_from_unsigned {
    ($t:ty) => {
        impl From<$t> for Integer {
            fn from(n: $t) -> Self {
                Integer {
                    n: IntRepr::PosInt(n as u64),
                }
            }
        }
    };
}

macro_rules! impl_from_signed {
    ($t:ty) => {
        impl From<$t> for Integer {
            fn from(n: $t) -> Self {
                if n < 0 {
                    Integer {
                        n: IntRepr::NegInt(n as i64),
                    }
                } else {
                    Integer {
                        n: IntRepr::PosInt(n as u64),
                    }
                }
            }
        }
    };
}

impl_from_unsigned!(u8);
impl_from_unsigned!(u16);
impl_from_unsigned!(u32);
impl_from_unsigned!(u64);
impl_from_unsigned!(usize);
impl_from_signed!(i8);
impl_from_signed!(i16);
impl_from_signed!(i32);
impl_from_signed!(i64);
impl_from_signed!(isize);

macro_rules! impl_try_from {
    ($t:ty) => {
        impl TryFrom<Integer> for $t {
            type Error = Integer;
            fn try_from(v: Integer) -> Result<Self, Self::Error> {
                match v.n {
                    IntRepr::PosInt(n) => <$t>::try_from(n).map_err(|_| v),
                    IntRepr::NegInt(n) => <$t>::try_from(n).map_err(|_| v),
                }
            }
        }
    };
}

impl_try_from!(u8);
impl_try_from!(u16);
impl_try_from!(u32);
impl_try_from!(u64);
impl_try_from!(usize);
impl_try_from!(i8);
impl_try_from!(i16);
impl_try_from!(i32);
impl_try_from!(i64);
impl_try_from!(isize);

impl serde::Serialize for Integer {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.n {
            IntRepr::PosInt(v) => serializer.serialize_u64(v),
            IntRepr::NegInt(v) => serializer.serialize_i64(v),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Integer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct IntVisitor;
        impl<'de> serde::de::Visitor<'de> for IntVisitor {
            type Value = Integer;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(fmt, "an integer")
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Integer::from(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Integer::from(v))
            }
        }

        deserializer.deserialize_any(IntVisitor)
    }
}
