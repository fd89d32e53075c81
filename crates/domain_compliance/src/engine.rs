//! Rule evaluation
//!
//! Pure function over `(rules, snapshot)`. The evaluation contract:
//!
//! - a predicate over a missing field is false;
//! - `contains` and `in` compare raw strings, case-sensitively; `in`
//!   requires a list-valued rule operand;
//! - ordering operators compare as decimals; operands that do not parse as
//!   decimals make the predicate false (money never goes through f64);
//! - groups short-circuit left to right; an empty AND group is true, an
//!   empty OR group is false;
//! - the verdict's `allow_continue` is the conjunction over matched rules:
//!   one blocking rule blocks the trade;
//! - a rule whose evaluation errs is treated as non-matching, the error is
//!   logged, and the remaining rules still run.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tracing::warn;

use core_kernel::RuleId;

use crate::error::ComplianceError;
use crate::expression::{Logic, Op, RuleExpr};
use crate::rules::{ReportType, TriggerRule};
use crate::snapshot::DataSnapshot;

/// One matched rule in a verdict
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRule {
    pub id: RuleId,
    pub name: String,
    pub report_type: ReportType,
    pub allow_continue: bool,
    pub warning: Option<String>,
}

/// Result of evaluating a rule set against a snapshot
#[derive(Debug, Clone, Default)]
pub struct RuleVerdict {
    pub triggered: bool,
    pub matched: Vec<MatchedRule>,
    /// First match in evaluation order (priority descending, id ascending)
    pub highest_priority_rule: Option<RuleId>,
    /// False when any matched rule blocks the trade
    pub allow_continue: bool,
}

impl RuleVerdict {
    fn clear() -> Self {
        Self {
            triggered: false,
            matched: Vec::new(),
            highest_priority_rule: None,
            allow_continue: true,
        }
    }
}

/// Evaluates rules (already scoped and ordered) against a snapshot
///
/// The caller passes the output of [`crate::rules::rules_in_scope`]; this
/// function does not re-filter by branch or activity.
pub fn evaluate(rules: &[&TriggerRule], snapshot: &DataSnapshot) -> RuleVerdict {
    let mut verdict = RuleVerdict::clear();

    for rule in rules {
        let matched = match eval_expr(&rule.expression, snapshot) {
            Ok(matched) => matched,
            Err(e) => {
                // Failure model: a broken rule must not take the branch
                // offline. Treat as non-matching and keep going.
                warn!(rule = %rule.id, error = %e, "rule evaluation failed, treated as non-matching");
                false
            }
        };
        if matched {
            verdict.triggered = true;
            verdict.allow_continue &= rule.allow_continue;
            if verdict.highest_priority_rule.is_none() {
                verdict.highest_priority_rule = Some(rule.id);
            }
            verdict.matched.push(MatchedRule {
                id: rule.id,
                name: rule.display_name("en").to_string(),
                report_type: rule.report_type,
                allow_continue: rule.allow_continue,
                warning: rule.warning("en").map(str::to_string),
            });
        }
    }

    verdict
}

fn eval_expr(expr: &RuleExpr, snapshot: &DataSnapshot) -> Result<bool, ComplianceError> {
    match expr {
        RuleExpr::Group { logic, conditions } => match logic {
            Logic::And => {
                for child in conditions {
                    if !eval_expr(child, snapshot)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Logic::Or => {
                for child in conditions {
                    if eval_expr(child, snapshot)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        },
        RuleExpr::Predicate { field, op, value } => {
            let actual = match snapshot.get(field) {
                Some(actual) => actual,
                None => return Ok(false),
            };
            Ok(eval_predicate(actual, *op, value))
        }
    }
}

fn eval_predicate(actual: &Value, op: Op, expected: &Value) -> bool {
    match op {
        Op::Eq => values_equal(actual, expected),
        Op::Ne => !values_equal(actual, expected),
        Op::Gt | Op::Ge | Op::Lt | Op::Le => {
            let (a, b) = match (as_decimal(actual), as_decimal(expected)) {
                (Some(a), Some(b)) => (a, b),
                _ => return false,
            };
            match op {
                Op::Gt => a > b,
                Op::Ge => a >= b,
                Op::Lt => a < b,
                Op::Le => a <= b,
                _ => unreachable!("ordering arm"),
            }
        }
        Op::In => match expected.as_array() {
            Some(choices) => {
                let raw = match raw_string(actual) {
                    Some(raw) => raw,
                    None => return false,
                };
                choices
                    .iter()
                    .filter_map(raw_string)
                    .any(|choice| choice == raw)
            }
            None => false,
        },
        Op::Contains => match (raw_string(actual), raw_string(expected)) {
            (Some(haystack), Some(needle)) => haystack.contains(&needle),
            _ => false,
        },
    }
}

/// Equality: exact decimal comparison when both operands are numeric,
/// raw-string comparison otherwise, bools as bools.
fn values_equal(actual: &Value, expected: &Value) -> bool {
    if let (Some(a), Some(b)) = (as_decimal(actual), as_decimal(expected)) {
        return a == b;
    }
    match (actual, expected) {
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => match (raw_string(actual), raw_string(expected)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// Parses a JSON value as an exact decimal
///
/// Numbers go through their literal representation; strings parse
/// directly. Anything else is not numeric.
fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn raw_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::RuleExpr;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn rule_with(id: u128, priority: i32, allow_continue: bool, expression: RuleExpr) -> TriggerRule {
        TriggerRule {
            id: RuleId::from_uuid(Uuid::from_u128(id)),
            name: HashMap::from([("en".to_string(), format!("rule-{id}"))]),
            report_type: ReportType::Amlo101,
            expression,
            priority,
            allow_continue,
            warnings: HashMap::new(),
            branch_id: None,
            active: true,
            branch_scope_aggregates: false,
        }
    }

    fn snapshot() -> DataSnapshot {
        let mut s = DataSnapshot::new();
        s.set("direction", json!("buy"))
            .set("currency_code", json!("USD"))
            .set_decimal("local_amount", dec!(2000000))
            .set_decimal("cumulative_with_current", dec!(5165000))
            .set("transaction_count_24h", json!(3));
        s
    }

    #[test]
    fn test_threshold_exactness() {
        // A >= threshold triggers at exactly the threshold; > does not.
        let ge = RuleExpr::predicate("local_amount", Op::Ge, json!("2000000"));
        let gt = RuleExpr::predicate("local_amount", Op::Gt, json!("2000000"));
        let lt = RuleExpr::predicate("local_amount", Op::Lt, json!("2000000"));

        let s = snapshot();
        assert!(eval_expr(&ge, &s).unwrap());
        assert!(!eval_expr(&gt, &s).unwrap());
        assert!(!eval_expr(&lt, &s).unwrap());
    }

    #[test]
    fn test_missing_field_is_false() {
        let expr = RuleExpr::predicate("no_such_field", Op::Eq, json!("x"));
        assert!(!eval_expr(&expr, &snapshot()).unwrap());

        // Even for != the missing field does not match
        let ne = RuleExpr::predicate("no_such_field", Op::Ne, json!("x"));
        assert!(!eval_expr(&ne, &snapshot()).unwrap());
    }

    #[test]
    fn test_numeric_compare_is_decimal_not_float() {
        let mut s = DataSnapshot::new();
        s.set_decimal("amount", dec!(0.30));
        // 0.1 + 0.2 style value written exactly; decimal equality holds
        let expr = RuleExpr::predicate("amount", Op::Eq, json!("0.3"));
        assert!(eval_expr(&expr, &s).unwrap());
    }

    #[test]
    fn test_non_numeric_operand_fails_ordering() {
        let expr = RuleExpr::predicate("direction", Op::Ge, json!("100"));
        assert!(!eval_expr(&expr, &snapshot()).unwrap());
    }

    #[test]
    fn test_in_is_case_sensitive() {
        let hit = RuleExpr::predicate("currency_code", Op::In, json!(["USD", "EUR"]));
        let miss = RuleExpr::predicate("currency_code", Op::In, json!(["usd", "eur"]));
        assert!(eval_expr(&hit, &snapshot()).unwrap());
        assert!(!eval_expr(&miss, &snapshot()).unwrap());
    }

    #[test]
    fn test_contains_is_case_sensitive() {
        let mut s = DataSnapshot::new();
        s.set("customer_name", json!("Somchai Trading Ltd"));
        let hit = RuleExpr::predicate("customer_name", Op::Contains, json!("Trading"));
        let miss = RuleExpr::predicate("customer_name", Op::Contains, json!("trading"));
        assert!(eval_expr(&hit, &s).unwrap());
        assert!(!eval_expr(&miss, &s).unwrap());
    }

    #[test]
    fn test_empty_group_identities() {
        let and = RuleExpr::all(vec![]);
        let or = RuleExpr::any(vec![]);
        let s = snapshot();
        assert!(eval_expr(&and, &s).unwrap());
        assert!(!eval_expr(&or, &s).unwrap());
    }

    #[test]
    fn test_group_short_circuit() {
        // The OR short-circuits before the malformed second branch matters
        let expr = RuleExpr::any(vec![
            RuleExpr::predicate("direction", Op::Eq, json!("buy")),
            RuleExpr::predicate("missing", Op::Eq, json!("x")),
        ]);
        assert!(eval_expr(&expr, &snapshot()).unwrap());
    }

    #[test]
    fn test_allow_continue_is_conjunction() {
        let blocking = rule_with(
            1,
            10,
            false,
            RuleExpr::predicate("local_amount", Op::Ge, json!("2000000")),
        );
        let advisory = rule_with(
            2,
            20,
            true,
            RuleExpr::predicate("direction", Op::Eq, json!("buy")),
        );

        let rules: Vec<&TriggerRule> = vec![&advisory, &blocking];
        let verdict = evaluate(&rules, &snapshot());

        assert!(verdict.triggered);
        assert_eq!(verdict.matched.len(), 2);
        assert!(!verdict.allow_continue);
        // Highest priority rule is the first in evaluation order
        assert_eq!(verdict.highest_priority_rule, Some(advisory.id));
    }

    #[test]
    fn test_no_match_allows_continue() {
        let rule = rule_with(
            1,
            10,
            false,
            RuleExpr::predicate("local_amount", Op::Ge, json!("99000000")),
        );
        let rules: Vec<&TriggerRule> = vec![&rule];
        let verdict = evaluate(&rules, &snapshot());

        assert!(!verdict.triggered);
        assert!(verdict.allow_continue);
        assert!(verdict.matched.is_empty());
    }

    #[test]
    fn test_cumulative_str_scenario() {
        // Customer with 4.1M THB history buys ~1.065M THB more; the
        // projected cumulative crosses the 5M STR threshold.
        let str_rule = rule_with(
            1,
            50,
            false,
            RuleExpr::predicate("cumulative_with_current", Op::Gt, json!("5000000")),
        );
        let rules: Vec<&TriggerRule> = vec![&str_rule];
        let verdict = evaluate(&rules, &snapshot());
        assert!(verdict.triggered);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let rule = rule_with(
            1,
            10,
            false,
            RuleExpr::all(vec![
                RuleExpr::predicate("direction", Op::Eq, json!("buy")),
                RuleExpr::predicate("local_amount", Op::Ge, json!("2000000")),
            ]),
        );
        let rules: Vec<&TriggerRule> = vec![&rule];
        let s = snapshot();

        let first = evaluate(&rules, &s);
        let second = evaluate(&rules, &s);
        assert_eq!(first.triggered, second.triggered);
        assert_eq!(first.matched, second.matched);
        assert_eq!(first.allow_continue, second.allow_continue);
    }
}
