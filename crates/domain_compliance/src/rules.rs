//! Trigger rules and report-type taxonomy

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use core_kernel::{BranchId, RuleId};

use crate::error::ComplianceError;
use crate::expression::RuleExpr;

/// The three AMLO report families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportType {
    /// 1-01 cash transaction report (CTR)
    Amlo101,
    /// 1-02 asset transaction report (ATR)
    Amlo102,
    /// 1-03 suspicious transaction report (STR)
    Amlo103,
}

impl ReportType {
    pub const ALL: [ReportType; 3] = [ReportType::Amlo101, ReportType::Amlo102, ReportType::Amlo103];

    /// The filing form code, as printed on the report
    pub fn code(&self) -> &'static str {
        match self {
            ReportType::Amlo101 => "AMLO-1-01",
            ReportType::Amlo102 => "AMLO-1-02",
            ReportType::Amlo103 => "AMLO-1-03",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ComplianceError> {
        match s {
            "AMLO-1-01" => Ok(ReportType::Amlo101),
            "AMLO-1-02" => Ok(ReportType::Amlo102),
            "AMLO-1-03" => Ok(ReportType::Amlo103),
            other => Err(ComplianceError::UnknownReportType(other.to_string())),
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The four monthly BOT forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BotForm {
    BuyFx,
    SellFx,
    Fcd,
    Provider,
}

impl BotForm {
    pub const ALL: [BotForm; 4] = [BotForm::BuyFx, BotForm::SellFx, BotForm::Fcd, BotForm::Provider];

    pub fn code(&self) -> &'static str {
        match self {
            BotForm::BuyFx => "BOT_BUY_FX",
            BotForm::SellFx => "BOT_SELL_FX",
            BotForm::Fcd => "BOT_FCD",
            BotForm::Provider => "BOT_PROVIDER",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ComplianceError> {
        match s {
            "BOT_BUY_FX" => Ok(BotForm::BuyFx),
            "BOT_SELL_FX" => Ok(BotForm::SellFx),
            "BOT_FCD" => Ok(BotForm::Fcd),
            "BOT_PROVIDER" => Ok(BotForm::Provider),
            other => Err(ComplianceError::UnknownReportType(other.to_string())),
        }
    }
}

impl std::fmt::Display for BotForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A configured trigger rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRule {
    pub id: RuleId,
    /// Display name per locale tag ("th", "en")
    pub name: HashMap<String, String>,
    pub report_type: ReportType,
    pub expression: RuleExpr,
    /// Higher priority evaluates first
    pub priority: i32,
    /// Whether a triggered trade may proceed without auditor approval
    pub allow_continue: bool,
    /// Operator-facing warnings per locale tag
    pub warnings: HashMap<String, String>,
    /// Branch scope; None applies to every branch
    pub branch_id: Option<BranchId>,
    pub active: bool,
    /// When set, cumulative aggregates for this rule are computed within
    /// the requesting branch only instead of across branches
    pub branch_scope_aggregates: bool,
}

impl TriggerRule {
    /// Name in the given locale, falling back to any available entry
    pub fn display_name(&self, locale: &str) -> &str {
        self.name
            .get(locale)
            .or_else(|| self.name.values().next())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Warning in the given locale, if configured
    pub fn warning(&self, locale: &str) -> Option<&str> {
        self.warnings
            .get(locale)
            .or_else(|| self.warnings.values().next())
            .map(String::as_str)
    }
}

/// Filters and orders the rules applicable to one evaluation
///
/// Inactive rules are skipped; branch-scoped rules apply only to their own
/// branch while global rules always apply. Order is priority descending,
/// then rule id ascending so that evaluation order is total.
pub fn rules_in_scope(rules: &[TriggerRule], branch_id: BranchId) -> Vec<&TriggerRule> {
    let mut scoped: Vec<&TriggerRule> = rules
        .iter()
        .filter(|r| r.active)
        .filter(|r| r.branch_id.map_or(true, |b| b == branch_id))
        .collect();
    scoped.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
    });
    scoped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Op;
    use serde_json::json;
    use uuid::Uuid;

    fn rule(id: u128, priority: i32, branch: Option<BranchId>, active: bool) -> TriggerRule {
        TriggerRule {
            id: RuleId::from_uuid(Uuid::from_u128(id)),
            name: HashMap::from([("en".to_string(), format!("rule-{id}"))]),
            report_type: ReportType::Amlo101,
            expression: RuleExpr::predicate("local_amount", Op::Ge, json!("2000000")),
            priority,
            allow_continue: false,
            warnings: HashMap::new(),
            branch_id: branch,
            active,
            branch_scope_aggregates: false,
        }
    }

    #[test]
    fn test_report_type_codes_roundtrip() {
        for rt in ReportType::ALL {
            assert_eq!(ReportType::parse(rt.code()).unwrap(), rt);
        }
        assert!(ReportType::parse("AMLO-9-99").is_err());
    }

    #[test]
    fn test_bot_form_codes_roundtrip() {
        for form in BotForm::ALL {
            assert_eq!(BotForm::parse(form.code()).unwrap(), form);
        }
    }

    #[test]
    fn test_scope_skips_inactive_and_foreign_branches() {
        let mine = BranchId::new();
        let other = BranchId::new();
        let rules = vec![
            rule(1, 10, None, true),
            rule(2, 20, Some(mine), true),
            rule(3, 30, Some(other), true),
            rule(4, 40, None, false),
        ];

        let scoped = rules_in_scope(&rules, mine);
        let ids: Vec<u128> = scoped.iter().map(|r| r.id.as_uuid().as_u128()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_scope_orders_by_priority_then_id() {
        let rules = vec![rule(2, 10, None, true), rule(1, 10, None, true), rule(3, 99, None, true)];
        let scoped = rules_in_scope(&rules, BranchId::new());
        let ids: Vec<u128> = scoped.iter().map(|r| r.id.as_uuid().as_u128()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
