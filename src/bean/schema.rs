//! Declarative property schemas attached to bean types.
//!
//! A schema lists named properties, each tagged with the views it belongs to
//! and an optional dotted source path. Schemas can be built in code or
//! deserialized, e.g. from a JSON document shipped next to the application.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Consumer-defined view label, such as `SUMMARY` or `DETAIL`.
///
/// Applications with their own label enum convert through `From`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewLabel(Cow<'static, str>);

impl ViewLabel {
    /// Compact listing view.
    pub const SUMMARY: Self = Self(Cow::Borrowed("SUMMARY"));
    /// Full detail view.
    pub const DETAIL: Self = Self(Cow::Borrowed("DETAIL"));

    /// Creates a label from any string.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(Cow::Owned(label.into()))
    }

    /// The label text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ViewLabel {
    fn from(label: &'static str) -> Self {
        Self(Cow::Borrowed(label))
    }
}

impl From<String> for ViewLabel {
    fn from(label: String) -> Self {
        Self(Cow::Owned(label))
    }
}

/// One declared property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDeclaration {
    /// Property name in the store.
    pub name: String,
    /// Views this property belongs to. Empty means every default view.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<ViewLabel>,
    /// Dotted source path; the property name when absent or blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl PropertyDeclaration {
    /// Declares a property readable from the same-named attribute, in every default view.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
            attribute: None,
        }
    }

    /// Adds a view label.
    #[must_use]
    pub fn label(mut self, label: impl Into<ViewLabel>) -> Self {
        let label = label.into();
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
        self
    }

    /// Sets the dotted source path.
    #[must_use]
    pub fn attribute(mut self, path: impl Into<String>) -> Self {
        self.attribute = Some(path.into());
        self
    }

    /// The path values are read from.
    #[must_use]
    pub fn source_attribute(&self) -> &str {
        match self.attribute.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => path,
            _ => &self.name,
        }
    }

    /// Returns true if the property belongs to `label`'s view.
    ///
    /// Undeclared labels default to both `SUMMARY` and `DETAIL`.
    #[must_use]
    pub fn in_view(&self, label: &ViewLabel) -> bool {
        if self.labels.is_empty() {
            *label == ViewLabel::SUMMARY || *label == ViewLabel::DETAIL
        } else {
            self.labels.contains(label)
        }
    }
}

/// Schema attached to a bean type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDeclaration {
    /// Declared properties, in order.
    #[serde(default)]
    pub properties: Vec<PropertyDeclaration>,
}

impl SchemaDeclaration {
    /// An empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a property declaration.
    #[must_use]
    pub fn property(mut self, property: PropertyDeclaration) -> Self {
        self.properties.push(property);
        self
    }

    /// Parses a schema from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
