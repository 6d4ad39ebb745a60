//! # Configuration values
//!
//! Dynamically typed values produced by the binder and the declared types
//! they are converted to. Element text is converted with [`ValueType::parse`].

use std::{
    fmt::{self, Display},
    num::{ParseFloatError, ParseIntError},
    str::ParseBoolError,
    time::Duration,
};

use crate::component::{Capability, Component};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Simple types that are written as element or attribute text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    Bool,
    Int32,
    Int64,
    Float64,
    /// The only reference type: empty text binds to [`Value::Null`].
    String,
    Duration,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int32 => "i32",
            Primitive::Int64 => "i64",
            Primitive::Float64 => "f64",
            Primitive::String => "String",
            Primitive::Duration => "Duration",
        }
    }

    /// Value bound from an empty element.
    pub fn empty_value(self) -> Value {
        match self {
            Primitive::Bool => Value::Bool(false),
            Primitive::Int32 => Value::Int32(0),
            Primitive::Int64 => Value::Int64(0),
            Primitive::Float64 => Value::Float64(0.0),
            Primitive::String => Value::Null,
            Primitive::Duration => Value::Duration(Duration::ZERO),
        }
    }

    /// Parses non-empty, already trimmed text.
    pub fn parse(self, text: &str) -> Result<Value, ValueError> {
        let value = match self {
            Primitive::Bool => Value::Bool(text.to_ascii_lowercase().parse()?),
            Primitive::Int32 => Value::Int32(text.parse()?),
            Primitive::Int64 => Value::Int64(text.parse()?),
            Primitive::Float64 => Value::Float64(text.parse()?),
            Primitive::String => Value::String(text.to_string()),
            Primitive::Duration => Value::Duration(parse_duration(text)?),
        };
        Ok(value)
    }
}

/// Component types a property or collection element can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentType {
    /// A concrete registered type, identified by its registered type name.
    /// Constructible without a `Type` attribute.
    Named(&'static str),
    /// Any registered type implementing the capability. Never constructible
    /// on its own.
    Capability(Capability),
}

impl ComponentType {
    pub fn of<T: Component>() -> Self {
        ComponentType::Named(std::any::type_name::<T>())
    }
}

impl From<Capability> for ComponentType {
    fn from(capability: Capability) -> Self {
        ComponentType::Capability(capability)
    }
}

/// Declared type of a property or collection element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    Primitive(Primitive),
    /// Optional primitive; empty text and `null` bind to [`Value::Null`].
    Nullable(Primitive),
    Component(ComponentType),
}

impl ValueType {
    /// Converts trimmed element or attribute text to this type.
    pub fn parse(&self, text: &str) -> Result<Value, ValueError> {
        match self {
            ValueType::Primitive(primitive) if text.is_empty() => Ok(primitive.empty_value()),
            ValueType::Primitive(primitive) => primitive.parse(text),
            ValueType::Nullable(_) if text.is_empty() || text.eq_ignore_ascii_case("null") => {
                Ok(Value::Null)
            }
            ValueType::Nullable(primitive) => primitive.parse(text),
            ValueType::Component(_) if text.is_empty() => Ok(Value::Null),
            ValueType::Component(_) => Err(ValueError::NotAValue),
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Primitive(primitive) => f.write_str(primitive.name()),
            ValueType::Nullable(primitive) => write!(f, "Option<{}>", primitive.name()),
            ValueType::Component(ComponentType::Named(name)) => f.write_str(name),
            ValueType::Component(ComponentType::Capability(capability)) => {
                f.write_str(capability.name())
            }
        }
    }
}

/// A bound configuration value.
#[derive(Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Duration(Duration),
    Component(Box<dyn Component>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "i32",
            Value::Int64(_) => "i64",
            Value::Float64(_) => "f64",
            Value::String(_) => "String",
            Value::Duration(_) => "Duration",
            Value::Component(_) => "component",
        }
    }

    pub fn as_component(&self) -> Option<&dyn Component> {
        match self {
            Value::Component(component) => Some(&**component),
            _ => None,
        }
    }

    /// `Null` converts to `None`; any other non-component value is a mismatch.
    pub fn into_component(self) -> Result<Option<Box<dyn Component>>, ValueError> {
        match self {
            Value::Null => Ok(None),
            Value::Component(component) => Ok(Some(component)),
            other => Err(ValueError::Mismatch {
                expected: "component",
                found: other.kind(),
            }),
        }
    }
}

impl From<Option<Box<dyn Component>>> for Value {
    fn from(component: Option<Box<dyn Component>>) -> Self {
        component.map_or(Value::Null, Value::Component)
    }
}

/// Failure to convert text or a [`Value`] into a declared type.
#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("invalid integer: {0}")]
    Int(#[from] ParseIntError),
    #[error("invalid floating point number: {0}")]
    Float(#[from] ParseFloatError),
    #[error("invalid boolean: {0}")]
    Bool(#[from] ParseBoolError),
    #[error("expected `[d.]hh:mm[:ss[.fffffff]]` or a whole number of days")]
    InvalidDuration,
    #[error("negative durations are not supported")]
    NegativeDuration,
    #[error("components cannot be written as text, use a `Type` attribute or nested elements")]
    NotAValue,
    #[error("expected {expected} value, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Types that can be read back out of a bound [`Value`].
pub trait FromValue: Sized {
    const VALUE_TYPE: ValueType;

    fn from_value(value: Value) -> Result<Self, ValueError>;
}

/// Types that can be handed to the binder as the current property value.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

macro_rules! primitive_value {
    ($ty:ty, $primitive:ident, $variant:ident) => {
        impl FromValue for $ty {
            const VALUE_TYPE: ValueType = ValueType::Primitive(Primitive::$primitive);

            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    Value::Null => Ok(<$ty>::default()),
                    other => Err(ValueError::Mismatch {
                        expected: Primitive::$primitive.name(),
                        found: other.kind(),
                    }),
                }
            }
        }

        impl FromValue for Option<$ty> {
            const VALUE_TYPE: ValueType = ValueType::Nullable(Primitive::$primitive);

            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::Null => Ok(None),
                    other => <$ty>::from_value(other).map(Some),
                }
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }

        impl IntoValue for Option<$ty> {
            fn into_value(self) -> Value {
                self.map_or(Value::Null, IntoValue::into_value)
            }
        }
    };
}

primitive_value!(bool, Bool, Bool);
primitive_value!(i32, Int32, Int32);
primitive_value!(i64, Int64, Int64);
primitive_value!(f64, Float64, Float64);
primitive_value!(Duration, Duration, Duration);

impl FromValue for String {
    const VALUE_TYPE: ValueType = ValueType::Primitive(Primitive::String);

    fn from_value(value: Value) -> Result<Self, ValueError> {
        Option::<String>::from_value(value).map(Option::unwrap_or_default)
    }
}

impl FromValue for Option<String> {
    const VALUE_TYPE: ValueType = ValueType::Primitive(Primitive::String);

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            Value::String(inner) => Ok(Some(inner)),
            other => Err(ValueError::Mismatch {
                expected: Primitive::String.name(),
                found: other.kind(),
            }),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for Option<String> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, Value::String)
    }
}

/// Parses duration text.
///
/// Text containing a colon uses the `[d.]hh:mm[:ss[.fffffff]]` layout; a bare
/// integer is a number of whole days.
pub fn parse_duration(text: &str) -> Result<Duration, ValueError> {
    if text.starts_with('-') {
        return Err(ValueError::NegativeDuration);
    }

    if !text.contains(':') {
        let days = parse_digits(text)?;
        return days
            .checked_mul(SECONDS_PER_DAY)
            .map(Duration::from_secs)
            .ok_or(ValueError::InvalidDuration);
    }

    let mut parts = text.split(':');
    let (days, hours) = match parts.next() {
        Some(head) => match head.split_once('.') {
            Some((days, hours)) => (parse_digits(days)?, parse_digits(hours)?),
            None => (0, parse_digits(head)?),
        },
        None => return Err(ValueError::InvalidDuration),
    };
    let minutes = parts
        .next()
        .ok_or(ValueError::InvalidDuration)
        .and_then(parse_digits)?;
    let (seconds, nanos) = match parts.next() {
        Some(seconds) => parse_seconds(seconds)?,
        None => (0, 0),
    };
    if parts.next().is_some() || hours > 23 || minutes > 59 || seconds > 59 {
        return Err(ValueError::InvalidDuration);
    }

    let total = days
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|secs| secs.checked_add(hours * 3600 + minutes * 60 + seconds))
        .ok_or(ValueError::InvalidDuration)?;
    Ok(Duration::new(total, nanos))
}

fn parse_seconds(text: &str) -> Result<(u64, u32), ValueError> {
    let Some((seconds, fraction)) = text.split_once('.') else {
        return Ok((parse_digits(text)?, 0));
    };
    // Up to seven fractional digits, i.e. 100ns ticks.
    if fraction.is_empty() || fraction.len() > 7 || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ValueError::InvalidDuration);
    }
    let nanos = format!("{fraction:0<9}")
        .parse::<u32>()
        .map_err(|_| ValueError::InvalidDuration)?;
    Ok((parse_digits(seconds)?, nanos))
}

fn parse_digits(text: &str) -> Result<u64, ValueError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValueError::InvalidDuration);
    }
    text.parse().map_err(|_| ValueError::InvalidDuration)
}
