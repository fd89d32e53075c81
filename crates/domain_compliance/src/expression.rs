//! Rule expression trees
//!
//! An expression is either a predicate over one snapshot field or a logical
//! group of sub-expressions. The set of cases is closed; evaluation pattern
//! matches exhaustively. Trees persist as JSON and are shape-validated at
//! rule-load time, not per evaluation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ComplianceError;

/// Group combinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    And,
    Or,
}

/// Predicate operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "contains")]
    Contains,
}

/// A rule expression: a predicate leaf or a logical group
///
/// JSON shape, chosen so persisted rules read naturally:
///
/// ```json
/// { "logic": "AND", "conditions": [
///     { "field": "local_amount", "operator": ">=", "value": "2000000" },
///     { "field": "direction", "operator": "=", "value": "buy" }
/// ]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleExpr {
    Group {
        logic: Logic,
        conditions: Vec<RuleExpr>,
    },
    Predicate {
        field: String,
        #[serde(rename = "operator")]
        op: Op,
        value: Value,
    },
}

impl RuleExpr {
    /// Convenience constructor for a predicate leaf
    pub fn predicate(field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        RuleExpr::Predicate {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Convenience constructor for an AND group
    pub fn all(conditions: Vec<RuleExpr>) -> Self {
        RuleExpr::Group {
            logic: Logic::And,
            conditions,
        }
    }

    /// Convenience constructor for an OR group
    pub fn any(conditions: Vec<RuleExpr>) -> Self {
        RuleExpr::Group {
            logic: Logic::Or,
            conditions,
        }
    }

    /// Validates the shape of a loaded tree
    ///
    /// Catches authoring mistakes once at load: empty field names, `in`
    /// predicates whose value is not a list, and pathological nesting.
    pub fn validate(&self) -> Result<(), ComplianceError> {
        self.validate_at_depth(0)
    }

    fn validate_at_depth(&self, depth: usize) -> Result<(), ComplianceError> {
        const MAX_DEPTH: usize = 16;
        if depth > MAX_DEPTH {
            return Err(ComplianceError::InvalidExpression(format!(
                "expression nesting exceeds {MAX_DEPTH} levels"
            )));
        }
        match self {
            RuleExpr::Group { conditions, .. } => {
                for child in conditions {
                    child.validate_at_depth(depth + 1)?;
                }
                Ok(())
            }
            RuleExpr::Predicate { field, op, value } => {
                if field.trim().is_empty() {
                    return Err(ComplianceError::InvalidExpression(
                        "predicate field name is empty".to_string(),
                    ));
                }
                if *op == Op::In && !value.is_array() {
                    return Err(ComplianceError::InvalidExpression(format!(
                        "'in' predicate on field '{field}' requires a list value"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Parses and shape-validates a persisted tree
    pub fn from_json(raw: &Value) -> Result<Self, ComplianceError> {
        let expr: RuleExpr = serde_json::from_value(raw.clone())
            .map_err(|e| ComplianceError::InvalidExpression(e.to_string()))?;
        expr.validate()?;
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_predicate_json_shape() {
        let expr = RuleExpr::predicate("local_amount", Op::Ge, json!("2000000"));
        let encoded = serde_json::to_value(&expr).unwrap();
        assert_eq!(
            encoded,
            json!({ "field": "local_amount", "operator": ">=", "value": "2000000" })
        );
    }

    #[test]
    fn test_group_json_roundtrip() {
        let expr = RuleExpr::all(vec![
            RuleExpr::predicate("direction", Op::Eq, json!("buy")),
            RuleExpr::any(vec![
                RuleExpr::predicate("currency_code", Op::In, json!(["USD", "EUR"])),
                RuleExpr::predicate("local_amount", Op::Gt, json!(5_000_000)),
            ]),
        ]);

        let encoded = serde_json::to_value(&expr).unwrap();
        let decoded = RuleExpr::from_json(&encoded).unwrap();
        assert_eq!(decoded, expr);
    }

    #[test]
    fn test_validate_rejects_in_without_list() {
        let raw = json!({ "field": "currency_code", "operator": "in", "value": "USD" });
        assert!(RuleExpr::from_json(&raw).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_field() {
        let raw = json!({ "field": "  ", "operator": "=", "value": 1 });
        assert!(RuleExpr::from_json(&raw).is_err());
    }

    #[test]
    fn test_validate_rejects_deep_nesting() {
        let mut expr = RuleExpr::predicate("x", Op::Eq, json!(1));
        for _ in 0..20 {
            expr = RuleExpr::all(vec![expr]);
        }
        assert!(expr.validate().is_err());
    }
}
