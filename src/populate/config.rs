//! Plain-data populator settings.

use serde::{Deserialize, Serialize};

use crate::error::{BindResult, ValidationError};

/// Name of the back-reference property unless configured otherwise.
pub const DEFAULT_BACK_REFERENCE: &str = "bean";

/// What to do when reading a bean's children fails during population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildrenPolicy {
    /// Fail the whole population.
    #[default]
    Propagate,
    /// Log a warning and treat the bean as childless.
    TreatAsEmpty,
}

/// Populator settings that can be loaded from a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulatorConfig {
    /// Property holding the source bean of each record.
    pub back_reference: String,
    /// What to do when a children accessor fails.
    pub children_policy: ChildrenPolicy,
    /// Dotted path whose value becomes the item id. Ids are generated when absent.
    pub id_property: Option<String>,
}

impl Default for PopulatorConfig {
    fn default() -> Self {
        Self {
            back_reference: DEFAULT_BACK_REFERENCE.to_string(),
            children_policy: ChildrenPolicy::default(),
            id_property: None,
        }
    }
}

impl PopulatorConfig {
    /// Parses a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    /// `InvalidArgument` for malformed JSON or settings that fail [`Self::validate`].
    pub fn from_json(json: &str) -> BindResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ValidationError::invalid("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Back-reference name, with a blank name falling back to the default.
    #[must_use]
    pub fn back_reference(&self) -> &str {
        let name = self.back_reference.trim();
        if name.is_empty() {
            DEFAULT_BACK_REFERENCE
        } else {
            name
        }
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(path) = &self.id_property {
            if path.trim().is_empty() {
                return Err(ValidationError::invalid(
                    "id_property",
                    "must not be blank when set",
                ));
            }
            if path.trim() == self.back_reference() {
                return Err(ValidationError::invalid(
                    "id_property",
                    "must differ from the back-reference property",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PopulatorConfig::default();
        assert_eq!(config.back_reference(), "bean");
        assert_eq!(config.children_policy, ChildrenPolicy::Propagate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_back_reference_falls_back() {
        let config = PopulatorConfig {
            back_reference: "  ".to_string(),
            ..PopulatorConfig::default()
        };
        assert_eq!(config.back_reference(), "bean");
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            PopulatorConfig::from_json(r#"{"children_policy": "treat_as_empty", "id_property": "name"}"#)
                .unwrap();
        assert_eq!(config.children_policy, ChildrenPolicy::TreatAsEmpty);
        assert_eq!(config.id_property.as_deref(), Some("name"));
        assert_eq!(config.back_reference(), "bean");
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        let err = PopulatorConfig::from_json("{not json").unwrap_err();
        assert!(err.is_validation());
        let err = PopulatorConfig::from_json(r#"{"id_property": " "}"#).unwrap_err();
        assert!(err.is_validation());
        let err = PopulatorConfig::from_json(r#"{"id_property": "bean"}"#).unwrap_err();
        assert!(err.is_validation());
    }
}
