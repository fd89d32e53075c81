//! Trade validation and execution
//!
//! `validate` is the pre-trade gate: rate lookup, paying-side sufficiency,
//! the approved-reservation envelope, and the AMLO trigger rules over the
//! customer's cumulative history. `execute` re-runs the same checks under
//! row locks inside one database transaction: both balance legs, the
//! transaction insert, envelope consumption and the regulatory post
//! triggers commit together or not at all.
//!
//! Balance rows are always locked in ascending `(branch_id, currency_id)`
//! order; sequence rows only after balance rows. Post-trigger failures are
//! contained in a savepoint and never fail the trade: BOT events are
//! reconstructible monthly and the AMLO rules already ran at validation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use core_kernel::temporal::bangkok_today;
use core_kernel::{ExchangeRate, TransactionId};
use domain_compliance::{
    engine::{evaluate, RuleVerdict},
    rules_in_scope, AggregateScope, CustomerAggregates, DataSnapshot, TriggerRule,
};
use domain_exchange::{
    lock_order, ComplianceOutcome, ExchangeError, ExecuteRequest, ExecuteResult,
    RegimeOutcome, ShortSide, SignedLegs, SplitOrder, TradeDirection, TriggerDetail,
    ValidateRequest, ValidateResult,
};
use domain_reporting::{BotClassifier, CustomerTypeCode, IdType};

use crate::error::DatabaseError;
use crate::pool::apply_statement_timeout;
use crate::repositories::{
    balances::{BalanceRepository, NewAdjustment},
    master::MasterDataRepository,
    rates::RateRepository,
    reports::{BotFcdEventRow, BotFxEventRow, BotProviderEventRow, ReportRepository},
    reservations::ReservationRepository,
    rules::RuleRepository,
    transactions::{NewTransaction, TransactionRepository},
};
use crate::services::config::CoreConfig;
use crate::services::ServiceError;

/// The facts about a planned trade the rule snapshot is built from
struct TradeFacts<'a> {
    direction: TradeDirection,
    currency_code: &'a str,
    foreign_amount: Decimal,
    local_amount: Decimal,
    rate: Decimal,
    customer_id: &'a str,
    customer_country: &'a str,
}

impl TradeFacts<'_> {
    fn snapshot(&self, aggregates: &CustomerAggregates) -> DataSnapshot {
        DataSnapshot::for_trade(
            self.direction.as_str(),
            self.currency_code,
            self.foreign_amount,
            self.local_amount,
            self.rate,
            self.customer_id,
            self.customer_country,
            aggregates,
        )
    }
}

/// Evaluates scoped rules, switching aggregates per rule scope
///
/// Rules opted into branch-local aggregates see the branch window; the
/// rest see the cross-branch window. Merge preserves evaluation order, so
/// the highest-priority rule is the first match overall.
fn merged_verdict(
    scoped: &[&TriggerRule],
    facts: &TradeFacts<'_>,
    cross: &CustomerAggregates,
    branch_local: Option<&CustomerAggregates>,
) -> RuleVerdict {
    let cross_snapshot = facts.snapshot(cross);
    let local_snapshot = branch_local.map(|aggregates| facts.snapshot(aggregates));

    let mut verdict = RuleVerdict {
        triggered: false,
        matched: Vec::new(),
        highest_priority_rule: None,
        allow_continue: true,
    };
    for rule in scoped {
        let snapshot = if rule.branch_scope_aggregates {
            local_snapshot.as_ref().unwrap_or(&cross_snapshot)
        } else {
            &cross_snapshot
        };
        let single = evaluate(&[*rule], snapshot);
        if single.triggered {
            verdict.triggered = true;
            verdict.allow_continue &= single.allow_continue;
            if verdict.highest_priority_rule.is_none() {
                verdict.highest_priority_rule = single.highest_priority_rule;
            }
            verdict.matched.extend(single.matched);
        }
    }
    verdict
}

fn trigger_details(verdict: &RuleVerdict) -> Vec<TriggerDetail> {
    verdict
        .matched
        .iter()
        .map(|m| TriggerDetail {
            rule_name: m.name.clone(),
            report_type: m.report_type.code().to_string(),
            allow_continue: m.allow_continue,
            warning: m.warning.clone(),
        })
        .collect()
}

/// Validates and executes trades against branch inventories
#[derive(Debug, Clone)]
pub struct ExecutorService {
    pool: PgPool,
    config: CoreConfig,
    balances: BalanceRepository,
    transactions: TransactionRepository,
    reservations: ReservationRepository,
    rules: RuleRepository,
    rates: RateRepository,
    master: MasterDataRepository,
    classifier: BotClassifier,
}

impl ExecutorService {
    pub fn new(pool: PgPool, config: CoreConfig) -> Self {
        let classifier = BotClassifier::new(
            config.provider_threshold_usd,
            config.usd_fallback_rate,
        );
        Self {
            balances: BalanceRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            reservations: ReservationRepository::new(pool.clone()),
            rules: RuleRepository::new(pool.clone()),
            rates: RateRepository::new(pool.clone()),
            master: MasterDataRepository::new(pool.clone()),
            classifier,
            pool,
            config,
        }
    }

    /// Pre-trade validation; mutates nothing
    pub async fn validate(&self, req: &ValidateRequest) -> Result<ValidateResult, ServiceError> {
        let now = Utc::now();
        let today = bangkok_today(now);
        let branch = *req.branch_id.as_uuid();
        let currency = self.master.currency(*req.currency_id.as_uuid()).await?;
        let local_currency = self.master.currency_by_code("THB").await?;

        let rate_row = self
            .rates
            .rate_for(branch, currency.id, today)
            .await?
            .ok_or_else(|| ExchangeError::NoRateToday {
                branch: req.branch_id.to_string(),
                currency_code: currency.code.clone(),
                date: today,
            })?;

        let rate = match req.direction {
            TradeDirection::Buy => rate_row.buy_rate,
            TradeDirection::Sell => rate_row.sell_rate,
        };
        let local_amount = ExchangeRate::new(rate)?.convert(req.amount);

        // Paying side: a branch buy pays out baht, a branch sell pays out
        // foreign notes.
        let (side, paying_currency, required) = match req.direction {
            TradeDirection::Buy => (ShortSide::Local, local_currency.id, local_amount),
            TradeDirection::Sell => (ShortSide::Foreign, currency.id, req.amount),
        };
        let available = self.balances.get(branch, paying_currency).await?;
        if available < required {
            let code = match side {
                ShortSide::Local => local_currency.code.as_str(),
                ShortSide::Foreign => currency.code.as_str(),
            };
            return Err(ExchangeError::insufficient(side, available, required, code).into());
        }

        // Approved envelope short-circuits the rules: the auditor already
        // passed on this customer up to the approved amount.
        if let Some(reservation) = self
            .reservations
            .find_approved_for_customer(&req.customer_id)
            .await?
        {
            if local_amount <= reservation.local_amount {
                return Ok(ValidateResult {
                    ok: true,
                    buy_rate: Some(rate_row.buy_rate),
                    sell_rate: Some(rate_row.sell_rate),
                    available_amount: available,
                    triggered: false,
                    trigger_details: Vec::new(),
                    bypass_reservation: Some(reservation.id.into()),
                });
            }
            return Err(ExchangeError::AmountExceedsApproved {
                approved: reservation.local_amount,
                requested: local_amount,
            }
            .into());
        }

        let rules = self.rules.load_active(branch).await?;
        let scoped = rules_in_scope(&rules, req.branch_id);
        let facts = TradeFacts {
            direction: req.direction,
            currency_code: &currency.code,
            foreign_amount: req.amount,
            local_amount,
            rate,
            customer_id: &req.customer_id,
            customer_country: "",
        };
        let cross = TransactionRepository::customer_aggregates(
            &self.pool,
            &req.customer_id,
            branch,
            AggregateScope::CrossBranch,
            now,
        )
        .await?;
        let branch_local = if scoped.iter().any(|r| r.branch_scope_aggregates) {
            Some(
                TransactionRepository::customer_aggregates(
                    &self.pool,
                    &req.customer_id,
                    branch,
                    AggregateScope::BranchLocal,
                    now,
                )
                .await?,
            )
        } else {
            None
        };

        let verdict = merged_verdict(&scoped, &facts, &cross, branch_local.as_ref());
        Ok(ValidateResult {
            ok: !verdict.triggered || verdict.allow_continue,
            buy_rate: Some(rate_row.buy_rate),
            sell_rate: Some(rate_row.sell_rate),
            available_amount: available,
            triggered: verdict.triggered,
            trigger_details: trigger_details(&verdict),
            bypass_reservation: None,
        })
    }

    /// Executes a trade atomically, retrying transient conflicts
    pub async fn execute(&self, req: &ExecuteRequest) -> Result<ExecuteResult, ServiceError> {
        let mut attempt = 0;
        loop {
            match self.execute_once(req).await {
                Err(e) if e.is_retriable() && attempt + 1 < self.config.execute_retry_bound => {
                    attempt += 1;
                    warn!(attempt, error = %e, "transient conflict, retrying trade");
                }
                other => return other,
            }
        }
    }

    async fn execute_once(&self, req: &ExecuteRequest) -> Result<ExecuteResult, ServiceError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        apply_statement_timeout(&mut tx, self.config.statement_timeout()).await?;

        let (transaction, compliance) = self
            .execute_leg(&mut tx, req, None, now)
            .await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        info!(
            transaction_no = transaction.transaction_no,
            amlo = compliance.amlo.triggered,
            bot = compliance.bot.triggered,
            "trade committed"
        );
        Ok(ExecuteResult {
            transaction,
            compliance,
            executed_at: now,
        })
    }

    /// Executes a mixed-denomination order as one atomic group
    ///
    /// Every leg runs the full execute protocol inside a single database
    /// transaction; the legs share a `business_group_id` and number from 1.
    pub async fn execute_split(
        &self,
        req: &ExecuteRequest,
        order: &SplitOrder,
    ) -> Result<Vec<ExecuteResult>, ServiceError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        apply_statement_timeout(&mut tx, self.config.statement_timeout()).await?;

        let mut results = Vec::with_capacity(order.legs.len());
        for leg in &order.legs {
            let leg_req = ExecuteRequest {
                amount: leg.foreign_amount,
                local_amount: leg.local_amount,
                exchange_rate: leg.rate,
                ..req.clone()
            };
            let (transaction, compliance) = self
                .execute_leg(
                    &mut tx,
                    &leg_req,
                    Some((*order.group_id.as_uuid(), leg.group_sequence)),
                    now,
                )
                .await?;
            results.push(ExecuteResult {
                transaction,
                compliance,
                executed_at: now,
            });
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        info!(legs = results.len(), "split order committed");
        Ok(results)
    }

    /// One trade inside the caller's open transaction
    async fn execute_leg(
        &self,
        conn: &mut PgConnection,
        req: &ExecuteRequest,
        group: Option<(Uuid, i32)>,
        now: DateTime<Utc>,
    ) -> Result<(domain_exchange::ExchangeTransaction, ComplianceOutcome), ServiceError> {
        let branch = *req.branch_id.as_uuid();
        let currency = self.master.currency(*req.currency_id.as_uuid()).await?;
        let local_currency = self.master.currency_by_code("THB").await?;

        let legs = SignedLegs::for_trade(req.direction, req.amount, req.local_amount)?;

        // Both balance rows, locked and mutated in canonical ascending
        // order; the shared baht row serializes all trades of the branch.
        let foreign_key = (branch, currency.id);
        let local_key = (branch, local_currency.id);
        let deltas = [
            (foreign_key, legs.foreign_delta),
            (local_key, legs.local_delta),
        ];
        let ordered = order_deltas(deltas);

        let mut mutations = [None, None];
        for (slot, ((b, c), delta)) in ordered.iter().enumerate() {
            // Overdraw is enforced here after the fact so the caller gets
            // the precise shortfall rather than a bare constraint error.
            let mutation = BalanceRepository::mutate(conn, *b, *c, *delta, true, true).await?;
            mutations[slot] = Some(((*b, *c), mutation));
        }
        if !self.config.allow_overdraw {
            for entry in mutations.iter().flatten() {
                let ((_, c), mutation) = entry;
                if mutation.after < Decimal::ZERO {
                    let (side, code) = if *c == currency.id {
                        (ShortSide::Foreign, currency.code.as_str())
                    } else {
                        (ShortSide::Local, local_currency.code.as_str())
                    };
                    return Err(ExchangeError::insufficient(
                        side,
                        mutation.before,
                        -(mutation.after - mutation.before),
                        code,
                    )
                    .into());
                }
            }
        }

        // Envelope re-check under lock; consumption happens after the
        // transaction row exists so the link can be written atomically.
        let reservation = ReservationRepository::lock_approved_for_customer(conn, &req.customer_id)
            .await?;
        let bypass = match &reservation {
            Some(row) if req.local_amount <= row.local_amount => Some(row.clone()),
            Some(row) => {
                return Err(ExchangeError::AmountExceedsApproved {
                    approved: row.local_amount,
                    requested: req.local_amount,
                }
                .into());
            }
            None => None,
        };

        let transaction_no = TransactionRepository::next_transaction_no(conn, branch).await?;
        let txn_id = TransactionId::new_v7();
        let new = NewTransaction {
            id: *txn_id.as_uuid(),
            branch_id: branch,
            currency_id: currency.id,
            currency_code: currency.code.clone(),
            direction: req.direction.as_str().to_string(),
            foreign_amount: req.direction.foreign_sign() * req.amount,
            local_amount: req.direction.local_sign() * req.local_amount,
            rate: req.exchange_rate,
            customer_id: req.customer_id.clone(),
            customer_name: req.customer_name.clone(),
            customer_country: req.customer_country.clone(),
            executed_at: now,
            operator_id: *req.operator_id.as_uuid(),
            business_group_id: group.map(|(id, _)| id),
            group_sequence: group.map(|(_, seq)| seq),
            reversal_of: None,
        };
        let row = TransactionRepository::insert(conn, transaction_no, &new).await?;

        let mut amlo = RegimeOutcome::default();
        if let Some(reservation_row) = &bypass {
            let consumed = ReservationRepository::update_status(
                conn,
                reservation_row.id,
                "approved",
                "completed",
                reservation_row.auditor_id,
                Some(now),
                None,
                Some(row.id),
            )
            .await?;
            if !consumed {
                // The lock should have made this impossible; treat as a bug
                return Err(domain_reservation::ReservationError::AlreadyConsumed.into());
            }
            ReportRepository::link_amlo_transaction(conn, reservation_row.id, row.id).await?;
            amlo.triggered = true;
            if let Some(report) =
                ReportRepository::find_amlo_by_reservation(conn, reservation_row.id).await?
            {
                amlo.reports.push(report.report_no);
            }
        } else {
            // No envelope in play: re-run the rules on the persisted facts
            // so warn-only triggers still flag the trade.
            match self.amlo_post_trigger(conn, req, &currency.code, now).await {
                Ok(triggered) => amlo.triggered = triggered,
                Err(e) => {
                    warn!(error = %e, "AMLO post-trigger failed; trade proceeds");
                }
            }
        }

        // BOT events are derived data; a failure here is contained in a
        // savepoint and repaired by the monthly rebuild pass.
        let bot = match self.bot_post_trigger(conn, req, &currency.code, &row.id, now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "BOT post-trigger failed; trade proceeds");
                RegimeOutcome::default()
            }
        };
        let fcd_flag = req.fcd_account.is_some() && bot.triggered;

        TransactionRepository::set_flags(conn, row.id, amlo.triggered, bot.triggered, fcd_flag)
            .await?;

        let mut transaction = row_to_domain(row)?;
        transaction.amlo_flag = amlo.triggered;
        transaction.bot_flag = bot.triggered;
        transaction.fcd_flag = fcd_flag;

        Ok((transaction, ComplianceOutcome { amlo, bot }))
    }

    /// Re-evaluates the AMLO rules against the executed trade
    async fn amlo_post_trigger(
        &self,
        conn: &mut PgConnection,
        req: &ExecuteRequest,
        currency_code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        let branch = *req.branch_id.as_uuid();
        let rules = self.rules.load_active(branch).await?;
        let scoped = rules_in_scope(&rules, req.branch_id);
        if scoped.is_empty() {
            return Ok(false);
        }

        let facts = TradeFacts {
            direction: req.direction,
            currency_code,
            foreign_amount: req.amount,
            local_amount: req.local_amount,
            rate: req.exchange_rate,
            customer_id: &req.customer_id,
            customer_country: &req.customer_country,
        };
        let cross = TransactionRepository::customer_aggregates(
            &mut *conn,
            &req.customer_id,
            branch,
            AggregateScope::CrossBranch,
            now,
        )
        .await?;
        let branch_local = if scoped.iter().any(|r| r.branch_scope_aggregates) {
            Some(
                TransactionRepository::customer_aggregates(
                    &mut *conn,
                    &req.customer_id,
                    branch,
                    AggregateScope::BranchLocal,
                    now,
                )
                .await?,
            )
        } else {
            None
        };
        let verdict = merged_verdict(&scoped, &facts, &cross, branch_local.as_ref());
        Ok(verdict.triggered)
    }

    /// Classifies the trade for BOT and inserts the event rows
    ///
    /// Runs inside a savepoint: a constraint failure rolls back only the
    /// event inserts, never the trade.
    async fn bot_post_trigger(
        &self,
        conn: &mut PgConnection,
        req: &ExecuteRequest,
        currency_code: &str,
        transaction_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<RegimeOutcome, ServiceError> {
        let mut savepoint = conn.begin().await.map_err(DatabaseError::from)?;

        let id_type = IdType::infer(&req.customer_id);
        let customer_type = CustomerTypeCode::from_id_type(id_type);
        let usd_rate = self
            .rates
            .usd_rate_for(*req.branch_id.as_uuid(), bangkok_today(now))
            .await?
            .map(|r| r.sell_rate);
        let usd_equivalent = self.classifier.usd_equivalent(
            core_kernel::CurrencyCode::new(currency_code)?,
            req.amount,
            req.exchange_rate,
            usd_rate,
        );

        let mut outcome = RegimeOutcome {
            triggered: true,
            reports: Vec::new(),
        };

        let fx_row = BotFxEventRow {
            id: Uuid::new_v4(),
            branch_id: *req.branch_id.as_uuid(),
            transaction_id: *transaction_id,
            customer_type: customer_type.as_str().to_string(),
            customer_name: req.customer_name.clone(),
            id_type: id_type.code().to_string(),
            id_number: req.customer_id.clone(),
            country_code: req.customer_country.clone(),
            currency_code: currency_code.to_string(),
            rate: req.exchange_rate,
            foreign_amount: req.amount,
            local_amount: req.local_amount,
            usd_equivalent,
            payment_method: req
                .purpose
                .clone()
                .unwrap_or_else(|| "CASH".to_string()),
            remarks: req.remarks.clone(),
            event_time: now,
            is_reported: false,
            reported_at: None,
            created_at: now,
        };
        let form = match req.direction {
            TradeDirection::Buy => domain_compliance::BotForm::BuyFx,
            TradeDirection::Sell => domain_compliance::BotForm::SellFx,
        };
        ReportRepository::insert_bot_fx(&mut savepoint, form, &fx_row).await?;
        outcome.reports.push(form.code().to_string());

        if let Some(fcd) = &req.fcd_account {
            let fcd_row = BotFcdEventRow {
                id: Uuid::new_v4(),
                branch_id: *req.branch_id.as_uuid(),
                transaction_id: *transaction_id,
                event_date: bangkok_today(now),
                bank_name: fcd.bank_name.clone(),
                account_no: fcd.account_no.clone(),
                currency_code: currency_code.to_string(),
                balance: fcd.balance,
                amount: req.amount,
                remarks: req.remarks.clone(),
                event_time: now,
                is_reported: false,
                reported_at: None,
                created_at: now,
            };
            ReportRepository::insert_bot_fcd(&mut savepoint, &fcd_row).await?;
            outcome.reports.push(domain_compliance::BotForm::Fcd.code().to_string());
        }

        savepoint.commit().await.map_err(DatabaseError::from)?;
        Ok(outcome)
    }

    /// Reverses a committed trade with a new opposite-signed row
    ///
    /// The original row is never touched; the reversal carries a
    /// `reversal_of` back-reference and unwinds both balance legs in the
    /// same transaction.
    pub async fn reverse_transaction(
        &self,
        transaction_id: Uuid,
        operator_id: Uuid,
    ) -> Result<domain_exchange::ExchangeTransaction, ServiceError> {
        let now = Utc::now();
        let original = self
            .transactions
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Transaction", transaction_id))?;
        let local_currency = self.master.currency_by_code("THB").await?;

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        apply_statement_timeout(&mut tx, self.config.statement_timeout()).await?;

        // Unwind both legs under the canonical lock order
        let deltas = [
            ((original.branch_id, original.currency_id), -original.foreign_amount),
            ((original.branch_id, local_currency.id), -original.local_amount),
        ];
        for ((b, c), delta) in order_deltas(deltas) {
            BalanceRepository::mutate(&mut tx, b, c, delta, true, self.config.allow_overdraw)
                .await?;
        }

        let transaction_no =
            TransactionRepository::next_transaction_no(&mut tx, original.branch_id).await?;
        let new = NewTransaction {
            id: Uuid::new_v4(),
            branch_id: original.branch_id,
            currency_id: original.currency_id,
            currency_code: original.currency_code.trim().to_string(),
            direction: original.direction.clone(),
            foreign_amount: -original.foreign_amount,
            local_amount: -original.local_amount,
            rate: original.rate,
            customer_id: original.customer_id.clone(),
            customer_name: original.customer_name.clone(),
            customer_country: original.customer_country.clone(),
            executed_at: now,
            operator_id,
            business_group_id: None,
            group_sequence: None,
            reversal_of: Some(original.id),
        };
        let row = TransactionRepository::insert(&mut tx, transaction_no, &new).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        info!(
            original_no = original.transaction_no,
            reversal_no = row.transaction_no,
            "trade reversed"
        );
        row_to_domain(row).map_err(Into::into)
    }

    /// Records a manual inventory adjustment and its Provider event
    ///
    /// Increases at or above the USD-equivalent threshold produce a BOT
    /// Provider row referencing the adjustment; decreases and small
    /// movements only move the balance.
    pub async fn adjust_balance(
        &self,
        branch_id: Uuid,
        currency_id: Uuid,
        delta: Decimal,
        operator_id: Uuid,
        remarks: Option<String>,
    ) -> Result<Decimal, ServiceError> {
        let now = Utc::now();
        let currency = self.master.currency(currency_id).await?;

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        apply_statement_timeout(&mut tx, self.config.statement_timeout()).await?;

        let mutation = BalanceRepository::mutate(
            &mut tx,
            branch_id,
            currency_id,
            delta,
            true,
            self.config.allow_overdraw,
        )
        .await?;

        let adjustment = NewAdjustment {
            id: Uuid::new_v4(),
            branch_id,
            currency_id,
            delta,
            operator_id,
            remarks: remarks.clone(),
            adjusted_at: now,
        };
        BalanceRepository::insert_adjustment(&mut tx, &adjustment).await?;

        let today = bangkok_today(now);
        let currency_rate = self
            .rates
            .rate_for(branch_id, currency_id, today)
            .await?
            .map(|r| r.buy_rate);
        let usd_rate = self
            .rates
            .usd_rate_for(branch_id, today)
            .await?
            .map(|r| r.sell_rate);

        let code = core_kernel::CurrencyCode::new(&currency.code)?;
        match currency_rate {
            Some(rate) => {
                if let Some(usd_equivalent) =
                    self.classifier
                        .classify_adjustment(code, delta, rate, usd_rate)
                {
                    let event = BotProviderEventRow {
                        id: Uuid::new_v4(),
                        branch_id,
                        adjustment_id: adjustment.id,
                        currency_code: currency.code.clone(),
                        delta_amount: delta,
                        usd_equivalent,
                        remarks,
                        event_time: now,
                        is_reported: false,
                        reported_at: None,
                        created_at: now,
                    };
                    ReportRepository::insert_bot_provider(&mut tx, &event).await?;
                }
            }
            None if code != core_kernel::CurrencyCode::USD => {
                warn!(
                    currency = %currency.code,
                    "no rate for adjusted currency today; Provider classification skipped"
                );
            }
            None => {
                // USD adjustments need no cross rate
                if let Some(usd_equivalent) =
                    self.classifier
                        .classify_adjustment(code, delta, Decimal::ONE, usd_rate)
                {
                    let event = BotProviderEventRow {
                        id: Uuid::new_v4(),
                        branch_id,
                        adjustment_id: adjustment.id,
                        currency_code: currency.code.clone(),
                        delta_amount: delta,
                        usd_equivalent,
                        remarks,
                        event_time: now,
                        is_reported: false,
                        reported_at: None,
                        created_at: now,
                    };
                    ReportRepository::insert_bot_provider(&mut tx, &event).await?;
                }
            }
        }

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(mutation.after)
    }
}

/// Sorts the two balance deltas into canonical lock order
///
/// Delegates the ordering rule to [`lock_order`] so the executor and the
/// domain cannot drift apart on deadlock avoidance.
fn order_deltas(
    deltas: [((Uuid, Uuid), Decimal); 2],
) -> [((Uuid, Uuid), Decimal); 2] {
    use core_kernel::{BranchId, CurrencyId};

    let [a, b] = deltas;
    let key = |pair: (Uuid, Uuid)| (BranchId::from_uuid(pair.0), CurrencyId::from_uuid(pair.1));
    let (first, _) = lock_order(key(a.0), key(b.0));
    if (*first.0.as_uuid(), *first.1.as_uuid()) == a.0 {
        [a, b]
    } else {
        [b, a]
    }
}

fn row_to_domain(
    row: crate::repositories::transactions::TransactionRow,
) -> Result<domain_exchange::ExchangeTransaction, DatabaseError> {
    use core_kernel::{BranchId, CurrencyCode, CurrencyId, GroupId, OperatorId};

    Ok(domain_exchange::ExchangeTransaction {
        id: TransactionId::from_uuid(row.id),
        transaction_no: row.transaction_no,
        branch_id: BranchId::from_uuid(row.branch_id),
        currency_id: CurrencyId::from_uuid(row.currency_id),
        currency_code: CurrencyCode::new(row.currency_code.trim())
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?,
        direction: TradeDirection::parse(&row.direction)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?,
        foreign_amount: row.foreign_amount,
        local_amount: row.local_amount,
        rate: row.rate,
        customer_id: row.customer_id,
        customer_name: row.customer_name,
        customer_country: row.customer_country,
        executed_at: row.executed_at,
        operator_id: OperatorId::from_uuid(row.operator_id),
        business_group_id: row.business_group_id.map(GroupId::from_uuid),
        group_sequence: row.group_sequence,
        amlo_flag: row.amlo_flag,
        bot_flag: row.bot_flag,
        fcd_flag: row.fcd_flag,
        reversal_of: row.reversal_of.map(TransactionId::from_uuid),
    })
}
