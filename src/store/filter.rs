//! Item filters for filterable stores.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::value::Value;

use super::StoreError;

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A condition on one property. Items whose value fails it are hidden.
#[derive(Clone)]
pub enum Filter {
    /// Exact value equality.
    Equals {
        /// Property the filter reads.
        property: String,
        /// Value to compare with.
        value: Value,
    },
    /// Substring (or prefix) match on the value's text rendering. Null never matches.
    Text {
        /// Property the filter reads.
        property: String,
        /// Text to look for.
        text: String,
        /// Compare case-insensitively.
        ignore_case: bool,
        /// Only match at the start.
        prefix_only: bool,
    },
    /// Regular expression search on the value's text rendering. Null never matches.
    Matches {
        /// Property the filter reads.
        property: String,
        /// Compiled pattern.
        pattern: Regex,
    },
    /// Arbitrary predicate.
    Custom {
        /// Property the filter reads.
        property: String,
        /// Test applied to the value.
        predicate: Predicate,
    },
}

impl Filter {
    /// Keeps items whose `property` equals `value`.
    pub fn equals(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            property: property.into(),
            value: value.into(),
        }
    }

    /// Keeps items whose `property` renders to text containing `text`.
    pub fn text(
        property: impl Into<String>,
        text: impl Into<String>,
        ignore_case: bool,
        prefix_only: bool,
    ) -> Self {
        Self::Text {
            property: property.into(),
            text: text.into(),
            ignore_case,
            prefix_only,
        }
    }

    /// # Errors
    /// `InvalidPattern` if the pattern does not compile.
    pub fn matches(property: impl Into<String>, pattern: &str) -> Result<Self, StoreError> {
        let pattern = Regex::new(pattern).map_err(|e| StoreError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::Matches {
            property: property.into(),
            pattern,
        })
    }

    /// Keeps items whose `property` satisfies `predicate`.
    pub fn custom<F>(property: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::Custom {
            property: property.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// The property this filter reads.
    #[must_use]
    pub fn property(&self) -> &str {
        match self {
            Self::Equals { property, .. }
            | Self::Text { property, .. }
            | Self::Matches { property, .. }
            | Self::Custom { property, .. } => property,
        }
    }

    /// Returns true if an item with `value` in the filtered property passes.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Equals { value: expected, .. } => value == expected,
            Self::Text {
                text,
                ignore_case,
                prefix_only,
                ..
            } => {
                if value.is_null() {
                    return false;
                }
                let rendered = value.to_string();
                let (haystack, needle) = if *ignore_case {
                    (rendered.to_lowercase(), text.to_lowercase())
                } else {
                    (rendered, text.clone())
                };
                if *prefix_only {
                    haystack.starts_with(&needle)
                } else {
                    haystack.contains(&needle)
                }
            }
            Self::Matches { pattern, .. } => {
                !value.is_null() && pattern.is_match(&value.to_string())
            }
            Self::Custom { predicate, .. } => predicate(value),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals { property, value } => write!(f, "Equals({property} == {value})"),
            Self::Text {
                property,
                text,
                ignore_case,
                prefix_only,
            } => write!(
                f,
                "Text({property} ~ {text:?}, ignore_case={ignore_case}, prefix_only={prefix_only})"
            ),
            Self::Matches { property, pattern } => write!(f, "Matches({property} =~ /{pattern}/)"),
            Self::Custom { property, .. } => write!(f, "Custom({property})"),
        }
    }
}
