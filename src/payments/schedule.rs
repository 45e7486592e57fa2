use chrono::{Datelike, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ScheduleConfig;
use crate::errors::{Result, SettlementError};
use crate::events::{Event, EventLog};
use crate::lease::Contract;
use crate::payments::Payment;
use crate::store::{Constraint, PaymentStore};
use crate::types::CompetenceMonth;

/// which months to schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleWindow {
    /// every month from the start date to the end (or termination) date
    FullTerm,
    /// `n` months from the current month, never before the start date
    MonthsAhead(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub window: ScheduleWindow,
    /// keep scheduling past a termination date, up to the contract end date
    pub beyond_termination: bool,
}

impl ScheduleRequest {
    pub fn full_term() -> Self {
        Self {
            window: ScheduleWindow::FullTerm,
            beyond_termination: false,
        }
    }

    pub fn months_ahead(months: u32) -> Self {
        Self {
            window: ScheduleWindow::MonthsAhead(months),
            beyond_termination: false,
        }
    }

    pub fn beyond_termination(mut self) -> Self {
        self.beyond_termination = true;
        self
    }
}

/// one month the generator intends to charge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedPayment {
    pub competence: CompetenceMonth,
    pub due_date: NaiveDate,
}

/// monthly payment generator, idempotent per (contract, month)
pub struct ScheduleGenerator {
    payments: Arc<dyn PaymentStore>,
    config: ScheduleConfig,
    events: Arc<EventLog>,
}

impl ScheduleGenerator {
    pub fn new(payments: Arc<dyn PaymentStore>, config: ScheduleConfig, events: Arc<EventLog>) -> Self {
        Self {
            payments,
            config,
            events,
        }
    }

    /// months and due dates for a contract, without touching the store
    pub fn plan(
        &self,
        contract: &Contract,
        request: &ScheduleRequest,
        today: NaiveDate,
    ) -> Result<Vec<PlannedPayment>> {
        let (start, end) = contract.validate_for_schedule()?;

        let cap = if request.beyond_termination {
            end
        } else {
            contract.effective_end().unwrap_or(end)
        };
        let start_month = CompetenceMonth::from_date(start);
        let cap_month = CompetenceMonth::from_date(cap);

        let (first, last) = match request.window {
            ScheduleWindow::FullTerm => (start_month, cap_month),
            ScheduleWindow::MonthsAhead(0) => {
                return Err(SettlementError::validation("months ahead must be at least 1"));
            }
            ScheduleWindow::MonthsAhead(n) => {
                let first = CompetenceMonth::from_date(today).max(start_month);
                (first, first.plus_months(n - 1).min(cap_month))
            }
        };

        let due_day = self.due_day(contract, start);
        let mut planned = Vec::new();
        let mut month = first;
        while month <= last {
            planned.push(PlannedPayment {
                competence: month,
                due_date: month.date_clamped(due_day),
            });
            month = month.next();
        }
        Ok(planned)
    }

    /// create the missing payments; months that already have one are skipped
    pub fn generate(
        &self,
        contract: &Contract,
        request: &ScheduleRequest,
        time: &SafeTimeProvider,
    ) -> Result<Vec<Payment>> {
        let now = time.now();
        let planned = self.plan(contract, request, now.date_naive())?;

        let mut created = Vec::new();
        for item in &planned {
            if self.payments.payment_for_month(contract.id, item.competence)?.is_some() {
                debug!(contract_id = %contract.id, competence = %item.competence, "payment exists, skipping");
                continue;
            }

            let payment = Payment::scheduled(contract.id, item.due_date, contract.rent_amount, now);
            match self.payments.insert_payment(payment.clone()) {
                Ok(()) => {}
                Err(e) if e.violates(Constraint::PaymentMonth) => {
                    let duplicate = SettlementError::DuplicateScheduleEntry {
                        contract_id: contract.id,
                        competence: item.competence,
                    };
                    debug!(error = %duplicate, "payment created concurrently, skipping");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            self.events.emit(Event::PaymentScheduled {
                payment_id: payment.id,
                contract_id: contract.id,
                competence: payment.competence,
                due_date: payment.due_date,
                amount: payment.amount,
            });
            created.push(payment);
        }

        info!(
            contract_id = %contract.id,
            planned = planned.len(),
            created = created.len(),
            "schedule generated"
        );
        Ok(created)
    }

    fn due_day(&self, contract: &Contract, start: NaiveDate) -> u32 {
        contract
            .payment_day
            .or(self.config.default_due_day)
            .map(u32::from)
            .unwrap_or_else(|| start.day())
    }
}
