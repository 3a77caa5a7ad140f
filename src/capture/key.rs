//! Typed capture keys and the value representation they share.

use serde::{Deserialize, Serialize};

use crate::event::Vec3;

/// A stored capture value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaptureValue {
    /// Boolean flag
    Bool(bool),
    /// Integer counter
    Int(i64),
    /// Floating point measurement
    Float(f64),
    /// Free text
    Text(String),
    /// World-space vector
    Vector(Vec3),
}

impl CaptureValue {
    /// Name of the value kind, used in diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => bool::KIND,
            Self::Int(_) => i64::KIND,
            Self::Float(_) => f64::KIND,
            Self::Text(_) => String::KIND,
            Self::Vector(_) => Vec3::KIND,
        }
    }
}

/// A Rust type that can be stored in a capture container.
pub trait Capturable: Clone {
    /// Kind name, unique per implementing type.
    const KIND: &'static str;

    /// Wraps the value.
    fn into_value(self) -> CaptureValue;

    /// Unwraps a value of the matching kind.
    fn from_value(value: &CaptureValue) -> Option<Self>;
}

impl Capturable for bool {
    const KIND: &'static str = "bool";

    fn into_value(self) -> CaptureValue {
        CaptureValue::Bool(self)
    }

    fn from_value(value: &CaptureValue) -> Option<Self> {
        match value {
            CaptureValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl Capturable for i64 {
    const KIND: &'static str = "int";

    fn into_value(self) -> CaptureValue {
        CaptureValue::Int(self)
    }

    fn from_value(value: &CaptureValue) -> Option<Self> {
        match value {
            CaptureValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl Capturable for f64 {
    const KIND: &'static str = "float";

    fn into_value(self) -> CaptureValue {
        CaptureValue::Float(self)
    }

    fn from_value(value: &CaptureValue) -> Option<Self> {
        match value {
            CaptureValue::Float(n) => Some(*n),
            _ => None,
        }
    }
}

impl Capturable for String {
    const KIND: &'static str = "text";

    fn into_value(self) -> CaptureValue {
        CaptureValue::Text(self)
    }

    fn from_value(value: &CaptureValue) -> Option<Self> {
        match value {
            CaptureValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl Capturable for Vec3 {
    const KIND: &'static str = "vector";

    fn into_value(self) -> CaptureValue {
        CaptureValue::Vector(self)
    }

    fn from_value(value: &CaptureValue) -> Option<Self> {
        match value {
            CaptureValue::Vector(v) => Some(*v),
            _ => None,
        }
    }
}

/// A named, typed capture key with a default value.
///
/// Keys are usually declared as constants next to the check that
/// produces them:
///
/// ```
/// use vigil::capture::CaptureKey;
///
/// const SPEED_MODIFIER: CaptureKey<f64> = CaptureKey::new("speed-modifier", 1.0);
/// assert_eq!(SPEED_MODIFIER.name(), "speed-modifier");
/// ```
#[derive(Debug, Clone)]
pub struct CaptureKey<T> {
    name: &'static str,
    default: T,
}

impl<T: Capturable> CaptureKey<T> {
    /// Declares a key.
    #[must_use]
    pub const fn new(name: &'static str, default: T) -> Self {
        Self { name, default }
    }

    /// Key name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The declared default.
    #[must_use]
    pub fn default_value(&self) -> T {
        self.default.clone()
    }

    /// Type-erased form, used to seed containers.
    #[must_use]
    pub fn declared(&self) -> DeclaredKey {
        DeclaredKey {
            name: self.name,
            default: self.default.clone().into_value(),
        }
    }
}

/// A capture key with its type erased.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredKey {
    /// Key name
    pub name: &'static str,
    /// Default value; its variant is the key's kind
    pub default: CaptureValue,
}

impl DeclaredKey {
    /// Kind name of the key.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        self.default.kind_name()
    }
}
