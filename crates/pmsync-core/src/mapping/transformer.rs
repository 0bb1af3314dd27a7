//! Type-aware value conversion between mapped fields

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde_json::{Number, Value};

use super::{FieldMapping, FieldType};
use FieldType as F;

/// A named conversion applied instead of the built-in type coercion
pub type TransformFn = Arc<dyn Fn(&Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Failure to convert one field's value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("Cannot convert field '{field}' from {from} to {to}: {reason}")]
    Conversion {
        field: String,
        from: FieldType,
        to: FieldType,
        reason: String,
    },

    #[error("Field '{field}': no conversion from {from} to {to}")]
    Unsupported {
        field: String,
        from: FieldType,
        to: FieldType,
    },

    #[error("Required field '{field}' has no value and no default")]
    MissingRequired { field: String },

    #[error("Transform '{name}' failed on field '{field}': {reason}")]
    Custom {
        field: String,
        name: String,
        reason: String,
    },
}

/// Converts values between field types using built-in coercions and a
/// registry of named transforms.
#[derive(Clone)]
pub struct FieldTransformer {
    transforms: HashMap<String, TransformFn>,
}

impl fmt::Debug for FieldTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.transforms.keys().collect();
        names.sort();
        f.debug_struct("FieldTransformer")
            .field("transforms", &names)
            .finish()
    }
}

impl Default for FieldTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldTransformer {
    /// Create a transformer with the built-in named transforms
    /// (`uppercase`, `lowercase`, `trim`) registered.
    pub fn new() -> Self {
        let mut transformer = Self {
            transforms: HashMap::new(),
        };
        transformer.register_transformer("uppercase", |v| map_str(v, str::to_uppercase));
        transformer.register_transformer("lowercase", |v| map_str(v, str::to_lowercase));
        transformer.register_transformer("trim", |v| map_str(v, |s| s.trim().to_string()));
        transformer
    }

    /// Register (or replace) a named transform.
    pub fn register_transformer<T>(&mut self, name: impl Into<String>, f: T)
    where
        T: Fn(&Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.transforms.insert(name.into(), Arc::new(f));
    }

    pub fn has_transformer(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Convert `value` according to `mapping`.
    ///
    /// An absent or null value yields the mapping's default (which may be
    /// `None`). A registered named transform takes precedence over the
    /// built-in type coercion.
    pub fn transform(
        &self,
        value: Option<&Value>,
        mapping: &FieldMapping,
    ) -> Result<Option<Value>, TransformError> {
        let value = match value.filter(|v| !v.is_null()) {
            Some(v) => v,
            None => {
                return match mapping.default_value() {
                    Some(default) => Ok(Some(default.clone())),
                    None if mapping.is_required() => Err(TransformError::MissingRequired {
                        field: mapping.source_field().to_string(),
                    }),
                    None => Ok(None),
                };
            }
        };

        if let Some(name) = mapping.transform() {
            match self.transforms.get(name) {
                Some(f) => {
                    return f(value).map(Some).map_err(|reason| TransformError::Custom {
                        field: mapping.source_field().to_string(),
                        name: name.to_string(),
                        reason,
                    });
                }
                None => tracing::warn!(
                    field = mapping.source_field(),
                    transform = name,
                    "Unknown transform, falling back to type conversion"
                ),
            }
        }

        convert(value, mapping).map(Some)
    }
}

fn map_str(value: &Value, f: impl Fn(&str) -> String) -> std::result::Result<Value, String> {
    match value {
        Value::String(s) => Ok(Value::String(f(s))),
        other => Err(format!("expected a string, got {}", shape_name(other))),
    }
}

fn convert(value: &Value, mapping: &FieldMapping) -> Result<Value, TransformError> {
    let from = mapping.source_type();
    let to = mapping.target_type();
    let field = mapping.source_field();

    if from == to {
        return Ok(value.clone());
    }

    let fail = |reason: String| TransformError::Conversion {
        field: field.to_string(),
        from,
        to,
        reason,
    };

    check_shape(value, from).map_err(&fail)?;

    match (from, to) {
        (F::String, F::Number) => parse_number(as_str(value)).map_err(fail),
        (F::String, F::Boolean) => Ok(Value::Bool(parse_bool(as_str(value)))),
        (F::String, F::Array) => Ok(split_list(as_str(value))),
        (F::String, F::Object) => match serde_json::from_str::<Value>(as_str(value)) {
            Ok(obj @ Value::Object(_)) => Ok(obj),
            Ok(other) => Err(fail(format!("decoded {} instead of an object", shape_name(&other)))),
            Err(e) => Err(fail(e.to_string())),
        },
        (F::String, F::Date) => parse_date(as_str(value))
            .map(|dt| Value::String(format_date(dt)))
            .map_err(fail),

        (F::Number, F::String) | (F::Boolean, F::String) | (F::Date, F::String) => Ok(Value::String(
            value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()),
        )),
        (F::Array, F::String) => Ok(Value::String(join_list(value))),
        (F::Object, F::String) => serde_json::to_string(value)
            .map(Value::String)
            .map_err(|e| fail(e.to_string())),

        (F::Number, F::Boolean) => Ok(Value::Bool(value.as_f64().is_some_and(|n| n != 0.0))),
        (F::Boolean, F::Number) => Ok(Value::from(if value.as_bool() == Some(true) { 1 } else { 0 })),

        (F::Number, F::Date) => {
            let secs = value
                .as_i64()
                .or_else(|| value.as_f64().map(|f| f.trunc() as i64))
                .ok_or_else(|| fail("timestamp out of range".into()))?;
            Utc.timestamp_opt(secs, 0)
                .single()
                .map(|dt| Value::String(format_date(dt)))
                .ok_or_else(|| fail(format!("{} is not a valid Unix timestamp", secs)))
        }
        (F::Date, F::Number) => parse_date(as_str(value))
            .map(|dt| Value::from(dt.timestamp()))
            .map_err(fail),

        _ => Err(TransformError::Unsupported {
            field: field.to_string(),
            from,
            to,
        }),
    }
}

fn check_shape(value: &Value, expected: FieldType) -> std::result::Result<(), String> {
    let ok = match expected {
        FieldType::String | FieldType::Date => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Array => value.is_array(),
        FieldType::Object => value.is_object(),
    };
    if ok {
        Ok(())
    } else {
        Err(format!("expected {} value, got {}", expected, shape_name(value)))
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn as_str(value: &Value) -> &str {
    value.as_str().unwrap_or_default()
}

fn parse_number(s: &str) -> std::result::Result<Value, String> {
    let s = s.trim();
    let is_float = s.contains(['.', 'e', 'E']);
    if !is_float {
        if let Ok(n) = s.parse::<i64>() {
            return Ok(Value::from(n));
        }
    }
    let f: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| format!("'{}' is not a finite number", s))
}

fn parse_bool(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1")
}

fn split_list(s: &str) -> Value {
    Value::Array(
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect(),
    )
}

fn join_list(value: &Value) -> String {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_default()
}

fn parse_date(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("'{}' is not an RFC 3339 timestamp or YYYY-MM-DD date", s))
}

fn format_date(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn mapping(from: FieldType, to: FieldType) -> FieldMapping {
        FieldMapping::new("src", "dst").unwrap().with_types(from, to)
    }

    #[rstest]
    #[case(FieldType::String, FieldType::Number, json!("42"), json!(42))]
    #[case(FieldType::String, FieldType::Number, json!(" 3.5 "), json!(3.5))]
    #[case(FieldType::Number, FieldType::String, json!(7), json!("7"))]
    #[case(FieldType::Number, FieldType::String, json!(2.25), json!("2.25"))]
    #[case(FieldType::Array, FieldType::String, json!(["a", "b", 3]), json!("a,b,3"))]
    #[case(FieldType::String, FieldType::Array, json!("a, b ,c"), json!(["a", "b", "c"]))]
    #[case(FieldType::String, FieldType::Array, json!(""), json!([]))]
    #[case(FieldType::Boolean, FieldType::String, json!(true), json!("true"))]
    #[case(FieldType::Boolean, FieldType::String, json!(false), json!("false"))]
    #[case(FieldType::String, FieldType::Boolean, json!("Yes"), json!(true))]
    #[case(FieldType::String, FieldType::Boolean, json!("1"), json!(true))]
    #[case(FieldType::String, FieldType::Boolean, json!("TRUE"), json!(true))]
    #[case(FieldType::String, FieldType::Boolean, json!("nope"), json!(false))]
    #[case(FieldType::Object, FieldType::String, json!({"k": 1}), json!(r#"{"k":1}"#))]
    #[case(FieldType::String, FieldType::Object, json!(r#"{"k": 1}"#), json!({"k": 1}))]
    #[case(FieldType::String, FieldType::Date, json!("2024-03-01"), json!("2024-03-01T00:00:00Z"))]
    #[case(FieldType::String, FieldType::Date, json!("2024-03-01T12:30:00+02:00"), json!("2024-03-01T10:30:00Z"))]
    #[case(FieldType::Number, FieldType::Date, json!(0), json!("1970-01-01T00:00:00Z"))]
    #[case(FieldType::Date, FieldType::Number, json!("1970-01-02T00:00:00Z"), json!(86400))]
    #[case(FieldType::Number, FieldType::Boolean, json!(0), json!(false))]
    #[case(FieldType::Boolean, FieldType::Number, json!(true), json!(1))]
    fn builtin_conversions(
        #[case] from: FieldType,
        #[case] to: FieldType,
        #[case] input: Value,
        #[case] expected: Value,
    ) {
        let t = FieldTransformer::new();
        let out = t.transform(Some(&input), &mapping(from, to)).unwrap();
        assert_eq!(out, Some(expected));
    }

    #[test]
    fn same_type_passes_value_through() {
        let t = FieldTransformer::new();
        let value = json!({"nested": [1, 2]});
        let out = t
            .transform(Some(&value), &mapping(FieldType::Object, FieldType::Object))
            .unwrap();
        assert_eq!(out, Some(value));
    }

    #[test]
    fn non_numeric_string_fails_with_field_name() {
        let t = FieldTransformer::new();
        let err = t
            .transform(Some(&json!("abc")), &mapping(FieldType::String, FieldType::Number))
            .unwrap_err();
        assert!(matches!(err, TransformError::Conversion { ref field, .. } if field == "src"));
        assert!(err.to_string().contains("string to number"));
    }

    #[test]
    fn string_that_is_not_an_object_fails() {
        let t = FieldTransformer::new();
        let err = t
            .transform(Some(&json!("[1,2]")), &mapping(FieldType::String, FieldType::Object))
            .unwrap_err();
        assert!(matches!(err, TransformError::Conversion { .. }));
    }

    #[test]
    fn mismatched_input_shape_fails() {
        let t = FieldTransformer::new();
        let err = t
            .transform(Some(&json!(5)), &mapping(FieldType::String, FieldType::Number))
            .unwrap_err();
        assert!(err.to_string().contains("expected string value, got number"));
    }

    #[test]
    fn unsupported_pair_fails() {
        let t = FieldTransformer::new();
        let err = t
            .transform(Some(&json!(true)), &mapping(FieldType::Boolean, FieldType::Array))
            .unwrap_err();
        assert!(matches!(err, TransformError::Unsupported { .. }));
    }

    #[test]
    fn none_returns_default_value() {
        let t = FieldTransformer::new();
        let m = mapping(FieldType::String, FieldType::String).with_default(json!("open"));
        assert_eq!(t.transform(None, &m).unwrap(), Some(json!("open")));
        assert_eq!(t.transform(Some(&Value::Null), &m).unwrap(), Some(json!("open")));
    }

    #[test]
    fn none_without_default_is_none() {
        let t = FieldTransformer::new();
        let m = mapping(FieldType::String, FieldType::Number);
        assert_eq!(t.transform(None, &m).unwrap(), None);
    }

    #[test]
    fn required_field_without_value_fails() {
        let t = FieldTransformer::new();
        let m = mapping(FieldType::String, FieldType::String).required();
        let err = t.transform(None, &m).unwrap_err();
        assert_eq!(
            err,
            TransformError::MissingRequired {
                field: "src".into()
            }
        );
    }

    #[test]
    fn custom_transform_takes_precedence() {
        let mut t = FieldTransformer::new();
        t.register_transformer("priority_label", |v| {
            Ok(json!(format!("P{}", v.as_i64().unwrap_or(0))))
        });
        let m = mapping(FieldType::Number, FieldType::Number).with_transform("priority_label");
        assert_eq!(t.transform(Some(&json!(2)), &m).unwrap(), Some(json!("P2")));
    }

    #[test]
    fn register_overwrites_existing_transform() {
        let mut t = FieldTransformer::new();
        t.register_transformer("uppercase", |_| Ok(json!("replaced")));
        let m = mapping(FieldType::String, FieldType::String).with_transform("uppercase");
        assert_eq!(t.transform(Some(&json!("x")), &m).unwrap(), Some(json!("replaced")));
    }

    #[test]
    fn builtin_named_transforms() {
        let t = FieldTransformer::new();
        let up = mapping(FieldType::String, FieldType::String).with_transform("uppercase");
        let trim = mapping(FieldType::String, FieldType::String).with_transform("trim");
        assert_eq!(t.transform(Some(&json!("open")), &up).unwrap(), Some(json!("OPEN")));
        assert_eq!(t.transform(Some(&json!("  x ")), &trim).unwrap(), Some(json!("x")));
    }

    #[test]
    fn failing_custom_transform_is_reported() {
        let t = FieldTransformer::new();
        let m = mapping(FieldType::String, FieldType::String).with_transform("lowercase");
        let err = t.transform(Some(&json!(3)), &m).unwrap_err();
        assert!(matches!(err, TransformError::Custom { ref name, .. } if name == "lowercase"));
    }

    #[test]
    fn unknown_transform_falls_back_to_conversion() {
        let t = FieldTransformer::new();
        let m = mapping(FieldType::String, FieldType::Number).with_transform("does_not_exist");
        assert_eq!(t.transform(Some(&json!("9")), &m).unwrap(), Some(json!(9)));
    }
}
