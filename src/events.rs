use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{CompetenceMonth, ContractId, PaymentId, PaymentMethod, ReceiptId};

/// all events emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // schedule events
    PaymentScheduled {
        payment_id: PaymentId,
        contract_id: ContractId,
        competence: CompetenceMonth,
        due_date: NaiveDate,
        amount: Money,
    },

    // settlement events
    PaymentSettled {
        payment_id: PaymentId,
        contract_id: ContractId,
        method: PaymentMethod,
        days_late: u32,
        penalty: Money,
        interest: Money,
        final_amount: Money,
        timestamp: DateTime<Utc>,
    },

    // receipt events
    ReceiptIssued {
        receipt_id: ReceiptId,
        payment_id: PaymentId,
        number: String,
        gross_amount: Money,
        fee_amount: Money,
        net_amount: Money,
    },
    ReceiptIssuanceFailed {
        payment_id: PaymentId,
        reason: String,
    },

    // gateway events
    ChargeCreated {
        payment_id: PaymentId,
        provider_payment_id: String,
    },
    ChargeFailed {
        payment_id: PaymentId,
        reason: String,
    },
}

/// thread-safe event collector shared by the engine's services
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: Event) {
        tracing::trace!(?event, "event emitted");
        self.events.lock().push(event);
    }

    /// drain everything collected so far
    pub fn take_events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_emit_and_take() {
        let log = EventLog::new();
        let payment_id = Uuid::new_v4();

        log.emit(Event::ReceiptIssuanceFailed {
            payment_id,
            reason: "store offline".to_string(),
        });
        log.emit(Event::ChargeFailed {
            payment_id,
            reason: "timeout".to_string(),
        });

        assert_eq!(log.len(), 2);
        let drained = log.take_events();
        assert_eq!(drained.len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_events_serialize() {
        let event = Event::ChargeCreated {
            payment_id: Uuid::nil(),
            provider_payment_id: "pp_1".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("ChargeCreated"));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
