//! Field mappings and value transformation
//!
//! A [`FieldMapping`] declares how one source field becomes one target
//! field; the [`FieldTransformer`] performs the value conversion.

mod transformer;

pub use transformer::{FieldTransformer, TransformError, TransformFn};

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Value shapes a mapped field can carry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Boolean,
    Array,
    #[serde(alias = "json")]
    Object,
    /// RFC 3339 timestamp carried as a string
    Date,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Date => "date",
        };
        f.write_str(name)
    }
}

/// Declares how one source field maps to one target field.
///
/// Immutable once built; both construction and deserialization reject
/// blank field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldMappingSpec", into = "FieldMappingSpec")]
pub struct FieldMapping {
    source_field: String,
    target_field: String,
    source_type: FieldType,
    target_type: FieldType,
    bidirectional: bool,
    required: bool,
    default_value: Option<Value>,
    transform: Option<String>,
}

impl FieldMapping {
    /// Create a string-to-string mapping between two fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFieldMapping`] if either name is blank.
    pub fn new(source_field: impl Into<String>, target_field: impl Into<String>) -> Result<Self> {
        let source_field = source_field.into();
        let target_field = target_field.into();

        if source_field.trim().is_empty() {
            return Err(Error::InvalidFieldMapping {
                message: "source_field must not be empty".into(),
            });
        }
        if target_field.trim().is_empty() {
            return Err(Error::InvalidFieldMapping {
                message: format!("target_field for '{}' must not be empty", source_field),
            });
        }

        Ok(Self {
            source_field,
            target_field,
            source_type: FieldType::default(),
            target_type: FieldType::default(),
            bidirectional: true,
            required: false,
            default_value: None,
            transform: None,
        })
    }

    pub fn with_types(mut self, source_type: FieldType, target_type: FieldType) -> Self {
        self.source_type = source_type;
        self.target_type = target_type;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_transform(mut self, name: impl Into<String>) -> Self {
        self.transform = Some(name.into());
        self
    }

    pub fn one_way(mut self) -> Self {
        self.bidirectional = false;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn source_field(&self) -> &str {
        &self.source_field
    }

    pub fn target_field(&self) -> &str {
        &self.target_field
    }

    pub fn source_type(&self) -> FieldType {
        self.source_type
    }

    pub fn target_type(&self) -> FieldType {
        self.target_type
    }

    pub fn is_bidirectional(&self) -> bool {
        self.bidirectional
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn transform(&self) -> Option<&str> {
        self.transform.as_deref()
    }

    /// The target→source view of this mapping.
    ///
    /// Returns `None` for one-way mappings. Named transforms are not carried
    /// over since they are not generally invertible, and the reversed
    /// mapping is never required.
    pub fn reversed(&self) -> Option<Self> {
        if !self.bidirectional {
            return None;
        }
        Some(Self {
            source_field: self.target_field.clone(),
            target_field: self.source_field.clone(),
            source_type: self.target_type,
            target_type: self.source_type,
            bidirectional: true,
            required: false,
            default_value: None,
            transform: None,
        })
    }
}

/// Serialized form of a [`FieldMapping`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMappingSpec {
    pub source_field: String,
    pub target_field: String,
    #[serde(default)]
    pub source_type: FieldType,
    #[serde(default)]
    pub target_type: FieldType,
    #[serde(default = "default_true")]
    pub bidirectional: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
}

fn default_true() -> bool {
    true
}

impl TryFrom<FieldMappingSpec> for FieldMapping {
    type Error = Error;

    fn try_from(spec: FieldMappingSpec) -> Result<Self> {
        let mut mapping = FieldMapping::new(spec.source_field, spec.target_field)?
            .with_types(spec.source_type, spec.target_type);
        mapping.bidirectional = spec.bidirectional;
        mapping.required = spec.required;
        mapping.default_value = spec.default_value.filter(|v| !v.is_null());
        mapping.transform = spec.transform.filter(|t| !t.trim().is_empty());
        Ok(mapping)
    }
}

impl From<FieldMapping> for FieldMappingSpec {
    fn from(m: FieldMapping) -> Self {
        Self {
            source_field: m.source_field,
            target_field: m.target_field,
            source_type: m.source_type,
            target_type: m.target_type,
            bidirectional: m.bidirectional,
            required: m.required,
            default_value: m.default_value,
            transform: m.transform,
        }
    }
}
