//! Dotted attribute path resolution.
//!
//! A path such as `address.country.code` is resolved segment by segment: each
//! segment names a field on the current type or one of its ancestors, and the
//! field's declared type becomes the current type for the next segment. Depth
//! is unbounded.
//!
//! Resolution happens once ([`ResolvedPath`]); reading a value afterwards
//! reuses the located fields' accessors and only falls back to a by-name
//! lookup when the runtime bean is of a different Rust type than the one the
//! path was resolved on.

use std::fmt;

use tracing::trace;

use crate::bean::{BeanRef, BeanType, FieldLocation};
use crate::error::{BindResult, SchemaError, ValidationError};
use crate::value::{DataType, Value};

#[derive(Debug, Clone)]
struct Step {
    segment: String,
    location: FieldLocation,
}

/// A dotted path resolved against a bean type.
#[derive(Clone)]
pub struct ResolvedPath {
    path: String,
    root: String,
    steps: Vec<Step>,
    data_type: DataType,
}

impl ResolvedPath {
    /// The dotted path as written.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Declared type of the last segment.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    /// Reads the path from a bean.
    ///
    /// A `Null` intermediate value short-circuits to `Null`.
    pub fn read(&self, bean: &BeanRef) -> BindResult<Value> {
        let mut current = bean.clone();
        let last = self.steps.len() - 1;
        for (i, step) in self.steps.iter().enumerate() {
            let value = match step.location.read(current.instance()) {
                Some(value) => value,
                None => current
                    .bean_type()
                    .read_field(current.instance(), &step.segment)?,
            };
            if i == last {
                return Ok(value);
            }
            match value {
                Value::Bean(next) => current = next,
                Value::Null => return Ok(Value::Null),
                other => {
                    return Err(SchemaError::NotNavigable {
                        segment: self.steps[i + 1].segment.clone(),
                        type_name: other.type_name().to_string(),
                    }
                    .into())
                }
            }
        }
        Ok(Value::Null)
    }
}

impl fmt::Debug for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedPath")
            .field("root", &self.root)
            .field("path", &self.path)
            .field("data_type", &self.data_type)
            .finish_non_exhaustive()
    }
}

/// Resolves dotted attribute paths against bean types and bean instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedPathResolver;

impl NestedPathResolver {
    /// Resolves `path` against `bean_type`.
    ///
    /// # Errors
    /// - `InvalidArgument` for a blank path or an empty segment (`a..b`)
    /// - `NoSuchField` for the first segment that cannot be located
    pub fn resolve(bean_type: &BeanType, path: &str) -> BindResult<ResolvedPath> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::invalid("path", "cannot be blank").into());
        }

        let segments: Vec<&str> = trimmed.split('.').map(str::trim).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ValidationError::invalid(
                "path",
                format!("'{trimmed}' contains an empty segment"),
            )
            .into());
        }

        let mut steps = Vec::with_capacity(segments.len());
        let mut current: &BeanType = bean_type;
        let mut data_type = DataType::Any;
        for (i, segment) in segments.iter().enumerate() {
            let location = current
                .find_field(segment)
                .ok_or_else(|| SchemaError::NoSuchField {
                    segment: (*segment).to_string(),
                    class: current.name().to_string(),
                })?;
            data_type = location.data_type.clone();
            steps.push(Step {
                segment: (*segment).to_string(),
                location,
            });

            if let Some(next) = segments.get(i + 1) {
                current = data_type.bean_type().ok_or_else(|| SchemaError::NoSuchField {
                    segment: (*next).to_string(),
                    class: data_type.to_string(),
                })?;
            }
        }

        trace!(root = bean_type.name(), path = trimmed, %data_type, "resolved path");
        Ok(ResolvedPath {
            path: segments.join("."),
            root: bean_type.name().to_string(),
            steps,
            data_type,
        })
    }

    /// Declared type at the end of `path`.
    pub fn resolve_type(bean_type: &BeanType, path: &str) -> BindResult<DataType> {
        Self::resolve(bean_type, path).map(|p| p.data_type)
    }

    /// Runtime value at the end of `path`, resolved against the bean's own type.
    pub fn resolve_value(bean: &BeanRef, path: &str) -> BindResult<Value> {
        Self::resolve(bean.bean_type(), path)?.read(bean)
    }
}
