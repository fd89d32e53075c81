//! Trigger-rule and field-definition persistence
//!
//! Rules persist as JSON expression trees and are shape-validated once at
//! load. A malformed rule is logged and skipped rather than taking the
//! branch offline; the remaining rules still evaluate.

use serde_json::Value;
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use core_kernel::{BranchId, FieldDefId, RuleId};
use domain_compliance::{ReportType, RuleExpr, TriggerRule};
use domain_reporting::{DataType, FieldConstraints, FieldDefinition};

use crate::error::DatabaseError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct RuleRow {
    id: Uuid,
    name: Value,
    report_type: String,
    expression: Value,
    priority: i32,
    allow_continue: bool,
    warnings: Value,
    branch_id: Option<Uuid>,
    active: bool,
    branch_scope_aggregates: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct FieldDefRow {
    id: Uuid,
    report_type: String,
    name: String,
    data_type: String,
    required: bool,
    max_len: Option<i32>,
    num_precision: Option<i32>,
    choices: Option<Value>,
    field_group: String,
    fill_order: i32,
    labels: Value,
}

/// Repository over trigger rules and field definitions
#[derive(Debug, Clone)]
pub struct RuleRepository {
    pool: PgPool,
}

impl RuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads every active rule visible to a branch (its own plus global)
    ///
    /// Rows whose expression fails shape validation are skipped with an
    /// error log; scoping and ordering happen at evaluation time.
    pub async fn load_active(&self, branch_id: Uuid) -> Result<Vec<TriggerRule>, DatabaseError> {
        let rows: Vec<RuleRow> = sqlx::query_as(
            "SELECT id, name, report_type, expression, priority, allow_continue, \
                    warnings, branch_id, active, branch_scope_aggregates \
             FROM trigger_rules \
             WHERE active = TRUE AND (branch_id IS NULL OR branch_id = $1)",
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            match Self::row_to_rule(row) {
                Ok(rule) => rules.push(rule),
                Err((id, e)) => {
                    error!(rule = %id, error = %e, "skipping malformed trigger rule");
                }
            }
        }
        Ok(rules)
    }

    fn row_to_rule(row: RuleRow) -> Result<TriggerRule, (Uuid, String)> {
        let expression = RuleExpr::from_json(&row.expression).map_err(|e| (row.id, e.to_string()))?;
        let report_type =
            ReportType::parse(&row.report_type).map_err(|e| (row.id, e.to_string()))?;
        let name = serde_json::from_value(row.name).unwrap_or_default();
        let warnings = serde_json::from_value(row.warnings).unwrap_or_default();
        Ok(TriggerRule {
            id: RuleId::from_uuid(row.id),
            name,
            report_type,
            expression,
            priority: row.priority,
            allow_continue: row.allow_continue,
            warnings,
            branch_id: row.branch_id.map(BranchId::from_uuid),
            active: row.active,
            branch_scope_aggregates: row.branch_scope_aggregates,
        })
    }

    /// Persists a rule, validating the expression shape first
    pub async fn insert(&self, rule: &TriggerRule) -> Result<(), DatabaseError> {
        rule.expression
            .validate()
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO trigger_rules (\
                 id, name, report_type, expression, priority, allow_continue, \
                 warnings, branch_id, active, branch_scope_aggregates) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(*rule.id.as_uuid())
        .bind(serde_json::to_value(&rule.name).unwrap_or_default())
        .bind(rule.report_type.code())
        .bind(
            serde_json::to_value(&rule.expression)
                .map_err(|e| DatabaseError::SerializationError(e.to_string()))?,
        )
        .bind(rule.priority)
        .bind(rule.allow_continue)
        .bind(serde_json::to_value(&rule.warnings).unwrap_or_default())
        .bind(rule.branch_id.map(|b| *b.as_uuid()))
        .bind(rule.active)
        .bind(rule.branch_scope_aggregates)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Field definitions of one report type, in fill order
    pub async fn field_definitions(
        &self,
        report_type: ReportType,
    ) -> Result<Vec<FieldDefinition>, DatabaseError> {
        let rows: Vec<FieldDefRow> = sqlx::query_as(
            "SELECT id, report_type, name, data_type, required, max_len, \
                    num_precision, choices, field_group, fill_order, labels \
             FROM field_definitions WHERE report_type = $1 ORDER BY fill_order",
        )
        .bind(report_type.code())
        .fetch_all(&self.pool)
        .await?;

        let mut definitions = Vec::with_capacity(rows.len());
        for row in rows {
            let data_type = match row.data_type.as_str() {
                "text" => DataType::Text,
                "number" => DataType::Number,
                "date" => DataType::Date,
                "choice" => DataType::Choice,
                other => {
                    error!(field = %row.name, data_type = other, "skipping field with unknown type");
                    continue;
                }
            };
            definitions.push(FieldDefinition {
                id: FieldDefId::from_uuid(row.id),
                report_type,
                name: row.name,
                data_type,
                constraints: FieldConstraints {
                    required: row.required,
                    max_len: row.max_len.map(|n| n as usize),
                    precision: row.num_precision.map(|n| n as u32),
                    choices: row
                        .choices
                        .and_then(|v| serde_json::from_value(v).ok()),
                },
                field_group: row.field_group,
                fill_order: row.fill_order,
                labels: serde_json::from_value(row.labels).unwrap_or_default(),
            });
        }
        Ok(definitions)
    }
}
