//! Value objects: equality by structure, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.
//!
//! ## Structural equality
//!
//! Props describe themselves through [`Structural`], producing a [`Structure`] tree. Two
//! trees are compared with [`deep_equals`]:
//!
//! - instants compare by UTC instant, whatever offset they were built with
//! - a list is never equal to a non-list
//! - maps need identical key sets and recursively equal values
//! - integers compare exactly; an integer equals a float only when the float is that
//!   exact integral value
//!
//! ## Immutability
//!
//! [`ValueObject`] takes ownership of its props and exposes no mutation API. To "modify"
//! a value object, create a new one with the new values.
//!
//! ```ignore
//! #[derive(Debug, Clone)]
//! struct Money {
//!     amount: i64,
//!     currency: String,
//! }
//!
//! impl Structural for Money {
//!     fn structure(&self) -> Option<Structure> {
//!         Some(Structure::map([
//!             ("amount", self.amount.structure()),
//!             ("currency", self.currency.structure()),
//!         ]))
//!     }
//! }
//!
//! let m1 = ValueObject::new(Money { amount: 100, currency: "USD".into() });
//! let m2 = ValueObject::new(Money { amount: 100, currency: "USD".into() });
//! assert!(m1.equals(Some(&m2)));
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value as JsonValue;

/// Structural snapshot of a value, used for deep equality.
#[derive(Debug, Clone)]
pub enum Structure {
    Null,
    Bool(bool),
    /// Any integer up to `u64`, held without loss.
    Int(i128),
    Float(f64),
    Text(String),
    /// A point in time, normalised to UTC.
    Instant(DateTime<Utc>),
    List(Vec<Structure>),
    Map(BTreeMap<String, Structure>),
}

impl Structure {
    /// Build a map node from `(key, value)` pairs; `None` values are stored as `Null`.
    pub fn map<K, It>(entries: It) -> Self
    where
        K: Into<String>,
        It: IntoIterator<Item = (K, Option<Structure>)>,
    {
        Structure::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.unwrap_or(Structure::Null)))
                .collect(),
        )
    }
}

impl PartialEq for Structure {
    fn eq(&self, other: &Self) -> bool {
        deep_equals(self, other)
    }
}

/// Deep structural equality between two snapshots.
pub fn deep_equals(a: &Structure, b: &Structure) -> bool {
    match (a, b) {
        (Structure::Null, Structure::Null) => true,
        (Structure::Bool(x), Structure::Bool(y)) => x == y,
        (Structure::Int(x), Structure::Int(y)) => x == y,
        (Structure::Float(x), Structure::Float(y)) => x == y,
        (Structure::Int(i), Structure::Float(f)) | (Structure::Float(f), Structure::Int(i)) => {
            float_is_exactly(*f, *i)
        }
        (Structure::Text(x), Structure::Text(y)) => x == y,
        (Structure::Instant(x), Structure::Instant(y)) => x == y,
        (Structure::List(xs), Structure::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equals(x, y))
        }
        (Structure::Map(xs), Structure::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| deep_equals(x, y)))
        }
        _ => false,
    }
}

/// `f` is integral, in range and equal to `i` without rounding.
fn float_is_exactly(f: f64, i: i128) -> bool {
    // 2^127: every integral f64 below this converts to i128 exactly
    const LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;
    f.is_finite() && f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) && f as i128 == i
}

/// Types that can describe themselves as a [`Structure`].
///
/// Returning `None` means "no structural snapshot"; such a value never compares equal.
pub trait Structural {
    fn structure(&self) -> Option<Structure>;
}

impl Structural for Structure {
    fn structure(&self) -> Option<Structure> {
        Some(self.clone())
    }
}

impl Structural for bool {
    fn structure(&self) -> Option<Structure> {
        Some(Structure::Bool(*self))
    }
}

macro_rules! impl_structural_int {
    ($($t:ty),*) => {
        $(
            impl Structural for $t {
                fn structure(&self) -> Option<Structure> {
                    Some(Structure::Int(i128::from(*self)))
                }
            }
        )*
    };
}

impl_structural_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl Structural for f32 {
    fn structure(&self) -> Option<Structure> {
        Some(Structure::Float(f64::from(*self)))
    }
}

impl Structural for f64 {
    fn structure(&self) -> Option<Structure> {
        Some(Structure::Float(*self))
    }
}

impl Structural for str {
    fn structure(&self) -> Option<Structure> {
        Some(Structure::Text(self.to_string()))
    }
}

impl Structural for String {
    fn structure(&self) -> Option<Structure> {
        self.as_str().structure()
    }
}

impl<Tz: TimeZone> Structural for DateTime<Tz> {
    fn structure(&self) -> Option<Structure> {
        Some(Structure::Instant(self.with_timezone(&Utc)))
    }
}

impl Structural for NaiveDate {
    fn structure(&self) -> Option<Structure> {
        let midnight = self.and_hms_opt(0, 0, 0)?;
        Some(Structure::Instant(Utc.from_utc_datetime(&midnight)))
    }
}

impl<T: Structural> Structural for Option<T> {
    fn structure(&self) -> Option<Structure> {
        match self {
            Some(v) => v.structure(),
            None => Some(Structure::Null),
        }
    }
}

impl<T: Structural + ?Sized> Structural for &T {
    fn structure(&self) -> Option<Structure> {
        (**self).structure()
    }
}

impl<T: Structural + ?Sized> Structural for Box<T> {
    fn structure(&self) -> Option<Structure> {
        (**self).structure()
    }
}

impl<T: Structural> Structural for Vec<T> {
    fn structure(&self) -> Option<Structure> {
        self.as_slice().structure()
    }
}

impl<T: Structural> Structural for [T] {
    fn structure(&self) -> Option<Structure> {
        Some(Structure::List(
            self.iter()
                .map(|v| v.structure().unwrap_or(Structure::Null))
                .collect(),
        ))
    }
}

impl<K: AsRef<str>, V: Structural> Structural for BTreeMap<K, V> {
    fn structure(&self) -> Option<Structure> {
        Some(Structure::map(
            self.iter().map(|(k, v)| (k.as_ref().to_string(), v.structure())),
        ))
    }
}

impl<K: AsRef<str>, V: Structural, S> Structural for HashMap<K, V, S> {
    fn structure(&self) -> Option<Structure> {
        Some(Structure::map(
            self.iter().map(|(k, v)| (k.as_ref().to_string(), v.structure())),
        ))
    }
}

impl Structural for JsonValue {
    fn structure(&self) -> Option<Structure> {
        Some(match self {
            JsonValue::Null => Structure::Null,
            JsonValue::Bool(b) => Structure::Bool(*b),
            JsonValue::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Structure::Int(i128::from(i)),
                (None, Some(u)) => Structure::Int(i128::from(u)),
                (None, None) => Structure::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Structure::Text(s.clone()),
            JsonValue::Array(items) => {
                Structure::List(items.iter().filter_map(Structural::structure).collect())
            }
            JsonValue::Object(fields) => Structure::map(
                fields.iter().map(|(k, v)| (k.clone(), v.structure())),
            ),
        })
    }
}

/// Immutable value holder compared by deep structural equality.
#[derive(Debug, Clone)]
pub struct ValueObject<P> {
    props: P,
}

impl<P> ValueObject<P> {
    pub fn new(props: P) -> Self {
        Self { props }
    }

    /// Read-only view of the props.
    pub fn props(&self) -> &P {
        &self.props
    }
}

impl<P: Clone> ValueObject<P> {
    /// Owned copy of the props, detached from this value object.
    pub fn to_json(&self) -> P {
        self.props.clone()
    }
}

impl<P: Structural> ValueObject<P> {
    pub fn equals(&self, other: Option<&ValueObject<P>>) -> bool {
        let Some(theirs) = other.and_then(|o| o.props.structure()) else {
            return false;
        };
        self.props
            .structure()
            .is_some_and(|ours| deep_equals(&ours, &theirs))
    }
}

impl<P: Structural> PartialEq for ValueObject<P> {
    fn eq(&self, other: &Self) -> bool {
        self.equals(Some(other))
    }
}

impl<P: Structural> Structural for ValueObject<P> {
    fn structure(&self) -> Option<Structure> {
        self.props.structure()
    }
}
