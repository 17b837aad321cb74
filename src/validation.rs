//! Schema validation helpers.
//!
//! Validates a `serde_json::Value` against a [`Schema`] and reports every
//! problem as a [`Diagnostic`] pointing at the offending attribute.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_getstream::schema::{Attribute, Schema, StringFormat};
//! use hemmer_provider_getstream::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("sqs_url", Attribute::required_string().with_format(StringFormat::Url));
//!
//! let diagnostics = validate(&schema, &json!({"sqs_url": "https://sqs.eu-west-1.amazonaws.com/1/q"}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"sqs_url": "not a url"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("sqs_url".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema, StringFormat};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - String formats (e.g. URLs) must parse
/// - Attributes not in the schema are rejected
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        },
    };

    let mut names: Vec<&String> = schema.block.attributes.keys().collect();
    names.sort();
    for name in names {
        let attr = &schema.block.attributes[name];
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    let mut unknown: Vec<&String> = obj
        .keys()
        .filter(|key| !schema.block.attributes.contains_key(*key))
        .collect();
    unknown.sort();
    for key in unknown {
        diagnostics.push(
            Diagnostic::error(format!("Unsupported attribute '{}'", key))
                .with_detail("An attribute with this name is not expected here")
                .with_attribute(key.as_str()),
        );
    }

    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Computed-only attributes are set by the provider
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            if let Some(diag) = check_type(attr.attr_type, v, path) {
                diagnostics.push(diag);
            } else if let (Some(format), Some(s)) = (attr.format, v.as_str()) {
                if let Some(diag) = check_format(format, s, path) {
                    diagnostics.push(diag);
                }
            }
        },
    }
}

fn check_type(attr_type: AttributeType, value: &Value, path: &str) -> Option<Diagnostic> {
    let ok = match attr_type {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => value.is_i64() || value.is_u64(),
        AttributeType::Bool => value.is_boolean(),
    };
    if ok {
        return None;
    }
    let expected = match attr_type {
        AttributeType::String => "string",
        AttributeType::Int64 => "int64",
        AttributeType::Bool => "bool",
    };
    Some(
        Diagnostic::error(format!("Invalid type for attribute '{}'", path))
            .with_detail(format!("Expected {}, got {}", expected, value_type_name(value)))
            .with_attribute(path),
    )
}

fn check_format(format: StringFormat, value: &str, path: &str) -> Option<Diagnostic> {
    match format {
        StringFormat::Url => match url::Url::parse(value) {
            Ok(parsed) if parsed.has_host() => None,
            Ok(_) => Some(
                Diagnostic::error(format!("Invalid URL for attribute '{}'", path))
                    .with_detail("URL must include a host")
                    .with_attribute(path),
            ),
            Err(e) => Some(
                Diagnostic::error(format!("Invalid URL for attribute '{}'", path))
                    .with_detail(e.to_string())
                    .with_attribute(path),
            ),
        },
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
