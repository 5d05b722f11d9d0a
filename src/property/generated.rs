//! Computed properties.
//!
//! A generated property has no backing field; its value is computed from the
//! bean when a record is written. Populators declare them after the reader
//! algorithm's properties and before the back-reference.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::bean::{BeanRef, BeanType};
use crate::error::{BindResult, SchemaError, ValidationError};
use crate::path::NestedPathResolver;
use crate::value::{DataType, Value};

use super::{PropertyAccessor, PropertyMetadata};

/// Computes a property value from a bean.
pub type GeneratorFn = Arc<dyn Fn(&BeanRef) -> BindResult<Value> + Send + Sync>;

/// A named, typed computed property.
#[derive(Clone)]
pub struct GeneratedProperty {
    name: String,
    data_type: DataType,
    generator: GeneratorFn,
}

impl GeneratedProperty {
    /// A property computed by `generator` for every bean.
    pub fn new<F>(name: impl Into<String>, data_type: DataType, generator: F) -> Self
    where
        F: Fn(&BeanRef) -> BindResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            data_type,
            generator: Arc::new(generator),
        }
    }

    /// Property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type of the generated values.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Converts into metadata reading through the generator.
    #[must_use]
    pub fn into_metadata(self) -> PropertyMetadata {
        PropertyMetadata::new(
            self.name,
            self.data_type,
            PropertyAccessor::Generated(self.generator),
        )
    }
}

impl fmt::Debug for GeneratedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedProperty")
            .field("name", &self.name)
            .field("data_type", &self.data_type)
            .finish_non_exhaustive()
    }
}

fn parse_timestamp(text: &str, pattern: &str) -> Option<Value> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, pattern)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, pattern)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|dt| Value::Timestamp(dt.and_utc()))
}

/// A timestamp property parsed from a text attribute with a chrono format
/// pattern, e.g. `"%d/%m/%Y"`.
///
/// The source path is resolved once against `bean_type`. Text that does not
/// match the pattern yields `Null`.
///
/// # Errors
/// - `InvalidArgument` for a blank pattern
/// - any path resolution error
/// - `TypeMismatch` if the source attribute is not declared as text
pub fn date_from_text(
    bean_type: &BeanType,
    name: impl Into<String>,
    source_path: &str,
    pattern: impl Into<String>,
) -> BindResult<GeneratedProperty> {
    let pattern = pattern.into();
    if pattern.trim().is_empty() {
        return Err(ValidationError::invalid("pattern", "cannot be blank").into());
    }
    let path = NestedPathResolver::resolve(bean_type, source_path)?;
    if !matches!(path.data_type(), DataType::Text | DataType::Any) {
        return Err(SchemaError::TypeMismatch {
            expected: DataType::Text.to_string(),
            actual: path.data_type().to_string(),
        }
        .into());
    }

    Ok(GeneratedProperty::new(
        name,
        DataType::Timestamp,
        move |bean: &BeanRef| {
            let value = path.read(bean)?;
            let Some(text) = value.as_text() else {
                return Ok(Value::Null);
            };
            Ok(parse_timestamp(text, &pattern).unwrap_or_else(|| {
                debug!(path = path.path(), text, pattern = %pattern, "unparsable date");
                Value::Null
            }))
        },
    ))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::bean::fixtures::Person;
    use crate::bean::Bean;

    #[test]
    fn test_generated_property_metadata() {
        let prop = GeneratedProperty::new("label", DataType::Text, |bean: &BeanRef| {
            Ok(Value::from(format!("#{}", bean.bean_type().name())))
        });
        assert_eq!(prop.name(), "label");
        let meta = prop.into_metadata();
        assert_eq!(meta.data_type(), &DataType::Text);
        let bean = BeanRef::new(Person::new(1, "Ada", 36));
        assert_eq!(meta.read(&bean).unwrap(), Value::from("#Person"));
    }

    #[test]
    fn test_date_from_text_parses_dates_and_datetimes() {
        let prop = date_from_text(Person::bean_type(), "born", "name", "%Y-%m-%d").unwrap();
        let meta = prop.into_metadata();
        let bean = BeanRef::new(Person::new(1, "1815-12-10", 36));
        let expected = Utc.with_ymd_and_hms(1815, 12, 10, 0, 0, 0).unwrap();
        assert_eq!(meta.read(&bean).unwrap(), Value::Timestamp(expected));

        let prop =
            date_from_text(Person::bean_type(), "seen", "name", "%Y-%m-%d %H:%M").unwrap();
        let bean = BeanRef::new(Person::new(1, "2024-03-01 14:30", 36));
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        assert_eq!(
            prop.into_metadata().read(&bean).unwrap(),
            Value::Timestamp(expected)
        );
    }

    #[test]
    fn test_unparsable_date_is_null() {
        let meta = date_from_text(Person::bean_type(), "born", "name", "%Y-%m-%d")
            .unwrap()
            .into_metadata();
        let bean = BeanRef::new(Person::new(1, "Ada", 36));
        assert_eq!(meta.read(&bean).unwrap(), Value::Null);
    }

    #[test]
    fn test_missing_source_is_null() {
        let meta = date_from_text(Person::bean_type(), "moved", "address.street", "%Y")
            .unwrap()
            .into_metadata();
        let bean = BeanRef::new(Person::new(1, "Ada", 36));
        assert_eq!(meta.read(&bean).unwrap(), Value::Null);
    }

    #[test]
    fn test_date_from_text_validates_source() {
        let err = date_from_text(Person::bean_type(), "x", "age", "%Y").unwrap_err();
        assert!(err.is_schema());
        let err = date_from_text(Person::bean_type(), "x", "nope", "%Y").unwrap_err();
        assert!(err.is_schema());
        let err = date_from_text(Person::bean_type(), "x", "name", " ").unwrap_err();
        assert!(err.is_validation());
    }
}
