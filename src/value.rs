//! Values stored in records and the declared types that describe them.
//!
//! A [`Value`] is what a property read produces and what a record cell holds.
//! A [`DataType`] is what a field, getter or record-store property declares.
//! `Null` is accepted by every declared type.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::bean::{BeanRef, TypeHandle};

/// Possible values a property can hold.
///
/// # Examples
///
/// ```
/// use beanbind::Value;
///
/// let flag = Value::Bool(true);
/// let count = Value::from(42);
/// let name = Value::from("hello");
///
/// assert!(flag.is_bool());
/// assert_eq!(count.as_int(), Some(42));
/// assert_eq!(name.as_text(), Some("hello"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Point in time, UTC.
    Timestamp(DateTime<Utc>),
    /// Shared reference to a bean.
    Bean(BeanRef),
    /// Ordered values.
    List(Vec<Value>),
}

impl Value {
    /// Wraps a bean as a value.
    pub fn bean<T: crate::bean::Bean>(bean: T) -> Self {
        Self::Bean(BeanRef::new(bean))
    }

    /// Wraps an optional bean, mapping `None` to `Null`.
    pub fn optional_bean<T: crate::bean::Bean + Clone>(bean: Option<&T>) -> Self {
        bean.map_or(Self::Null, |b| Self::bean(b.clone()))
    }

    /// Returns true for `Null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true for `Bool`.
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// Returns true for `Int`.
    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    /// Returns true for `Float`.
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    /// Returns true for `Text`.
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Returns true for `Bean`.
    pub const fn is_bean(&self) -> bool {
        matches!(self, Self::Bean(_))
    }

    /// The boolean, if this is one.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The integer, if this is one.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The number as a float; integers are widened.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// The text, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// The timestamp, if this is one.
    pub const fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Timestamp(v) => Some(v),
            _ => None,
        }
    }

    /// The bean reference, if this is one.
    pub const fn as_bean(&self) -> Option<&BeanRef> {
        match self {
            Self::Bean(v) => Some(v),
            _ => None,
        }
    }

    /// The elements, if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::Bean(_) => "bean",
            Self::List(_) => "list",
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Text(_) => 3,
            Self::Timestamp(_) => 4,
            Self::Bean(_) => 5,
            Self::List(_) => 6,
        }
    }

    /// Total order used by sortable stores.
    ///
    /// `Null` sorts first; ints and floats compare numerically; values of
    /// unrelated types order by type; beans have no natural order.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Int(_) | Self::Float(_), Self::Int(_) | Self::Float(_)) => {
                let a = self.as_float().unwrap_or_default();
                let b = other.as_float().unwrap_or_default();
                a.total_cmp(&b)
            }
            (Self::List(a), Self::List(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| x.sort_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// JSON rendering used by store snapshots. Beans render as their type name.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Self::Null => Json::Null,
            Self::Bool(v) => Json::Bool(*v),
            Self::Int(v) => Json::from(*v),
            Self::Float(v) => serde_json::Number::from_f64(*v).map_or(Json::Null, Json::Number),
            Self::Text(v) => Json::String(v.clone()),
            Self::Timestamp(v) => Json::String(v.to_rfc3339()),
            Self::Bean(b) => serde_json::json!({ "bean": b.bean_type().name() }),
            Self::List(items) => Json::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Bean(b) => write!(f, "{b}"),
            Self::List(v) => write!(f, "list[{}]", v.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<BeanRef> for Value {
    fn from(v: BeanRef) -> Self {
        Self::Bean(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

/// Declared type of a field, getter or store property.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    /// Accepts any value; cannot be navigated into.
    Any,
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Floating point number.
    Float,
    /// UTF-8 text.
    Text,
    /// Point in time, UTC.
    Timestamp,
    /// A bean of the given type or one of its descendants.
    Bean(TypeHandle),
    /// List whose elements have the given type.
    List(Box<DataType>),
}

impl DataType {
    /// Bean type declared by `T`.
    #[must_use]
    pub fn bean<T: crate::bean::Bean>() -> Self {
        Self::Bean(TypeHandle::of::<T>())
    }

    /// List of the given element type.
    #[must_use]
    pub fn list(element: Self) -> Self {
        Self::List(Box::new(element))
    }

    /// Returns true if a record cell of this type may hold `value`.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _) | (_, Value::Null) => true,
            (Self::Bool, Value::Bool(_))
            | (Self::Int, Value::Int(_))
            | (Self::Float, Value::Float(_) | Value::Int(_))
            | (Self::Text, Value::Text(_))
            | (Self::Timestamp, Value::Timestamp(_)) => true,
            (Self::Bean(handle), Value::Bean(bean)) => bean.bean_type().is_a(handle.get()),
            (Self::List(element), Value::List(items)) => items.iter().all(|v| element.accepts(v)),
            _ => false,
        }
    }

    /// Returns true if values of this type have a meaningful sort order.
    #[must_use]
    pub const fn is_sortable(&self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Int | Self::Float | Self::Text | Self::Timestamp
        )
    }

    /// The bean type behind this declaration, if any.
    #[must_use]
    pub fn bean_type(&self) -> Option<&'static crate::bean::BeanType> {
        match self {
            Self::Bean(handle) => Some(handle.get()),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Bean(handle) => write!(f, "{}", handle.get().name()),
            Self::List(element) => write!(f, "list<{element}>"),
        }
    }
}
