//! Form-field definitions
//!
//! Each AMLO form is described by an ordered list of field definitions:
//! the same list drives the form schema delivered to the UI, the per-field
//! validator run before a reservation persists, and the PDF fill order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use core_kernel::FieldDefId;
use domain_compliance::ReportType;

use crate::error::{FieldViolation, ReportingError};

/// Field data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Text,
    Number,
    Date,
    Choice,
}

/// Validation constraints attached to a field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraints {
    pub required: bool,
    pub max_len: Option<usize>,
    /// Decimal places allowed on number fields
    pub precision: Option<u32>,
    /// Legal values for choice fields
    pub choices: Option<Vec<String>>,
}

/// One field of a report form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: FieldDefId,
    pub report_type: ReportType,
    /// Semantic field name, the key into `form_data`
    pub name: String,
    pub data_type: DataType,
    pub constraints: FieldConstraints,
    /// Grouping tag for UI layout
    pub field_group: String,
    /// Position in the template fill order
    pub fill_order: i32,
    /// Display labels per locale tag
    pub labels: HashMap<String, String>,
}

/// Validates a form payload against its field definitions
///
/// Runs every field and reports all violations at once rather than failing
/// on the first, so the operator can fix the whole form in one pass.
pub fn validate_form(
    definitions: &[FieldDefinition],
    form_data: &Value,
) -> Result<(), ReportingError> {
    let map = match form_data.as_object() {
        Some(map) => map,
        None => {
            return Err(ReportingError::FieldValidation(vec![FieldViolation {
                field: String::new(),
                message: "form data must be a JSON object".to_string(),
            }]))
        }
    };

    let mut violations = Vec::new();
    for def in definitions {
        let value = map.get(&def.name);
        let present = value.map_or(false, |v| !is_blank(v));

        if def.constraints.required && !present {
            violations.push(FieldViolation {
                field: def.name.clone(),
                message: "required field is missing".to_string(),
            });
            continue;
        }
        let value = match value {
            Some(v) if present => v,
            _ => continue,
        };

        match def.data_type {
            DataType::Text => {
                if let Some(text) = value.as_str() {
                    if let Some(max) = def.constraints.max_len {
                        if text.chars().count() > max {
                            violations.push(FieldViolation {
                                field: def.name.clone(),
                                message: format!("longer than {max} characters"),
                            });
                        }
                    }
                } else {
                    violations.push(FieldViolation {
                        field: def.name.clone(),
                        message: "expected text".to_string(),
                    });
                }
            }
            DataType::Number => match decimal_of(value) {
                Some(n) => {
                    if let Some(precision) = def.constraints.precision {
                        if n.scale() > precision {
                            violations.push(FieldViolation {
                                field: def.name.clone(),
                                message: format!("more than {precision} decimal places"),
                            });
                        }
                    }
                }
                None => violations.push(FieldViolation {
                    field: def.name.clone(),
                    message: "expected a number".to_string(),
                }),
            },
            DataType::Date => {
                let ok = value
                    .as_str()
                    .map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
                    .unwrap_or(false);
                if !ok {
                    violations.push(FieldViolation {
                        field: def.name.clone(),
                        message: "expected an ISO date (YYYY-MM-DD)".to_string(),
                    });
                }
            }
            DataType::Choice => {
                let legal = def.constraints.choices.as_deref().unwrap_or(&[]);
                let ok = value
                    .as_str()
                    .map(|s| legal.iter().any(|c| c == s))
                    .unwrap_or(false);
                if !ok {
                    violations.push(FieldViolation {
                        field: def.name.clone(),
                        message: format!("not one of {legal:?}"),
                    });
                }
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ReportingError::FieldValidation(violations))
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn decimal_of(value: &Value) -> Option<rust_decimal::Decimal> {
    use std::str::FromStr;
    match value {
        Value::Number(n) => rust_decimal::Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => rust_decimal::Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}
