pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod interest;
pub mod lease;
pub mod payments;
pub mod receipts;
pub mod store;
pub mod types;

// re-export key types
pub use config::{EngineConfig, FinancialSettings, GatewayConfig, ReceiptConfig, ScheduleConfig};
pub use decimal::{round2, Money, Rate};
pub use engine::{BatchFailure, BatchReport, ReissueFailure, ReissueReport, SettlementEngine};
pub use errors::{Result, SettlementError};
pub use events::{Event, EventLog};
pub use gateway::{
    BoletoArtifact, BoletoRequest, ChargeService, GatewayError, HttpProviderGateway, ProviderGateway,
};
pub use interest::{calculate_late_charges, days_late, LateChargeCalculator, LateCharges};
pub use lease::{Contract, Owner, Property, Tenant};
pub use payments::{
    split_settlement, Payment, ScheduleGenerator, ScheduleRequest, ScheduleWindow, SettleRequest,
    SettlementOutcome, SettlementService, SettlementSplit,
};
pub use receipts::{Receipt, ReceiptFilter, ReceiptIssuer, ReceiptNumber, ReceiptParties, ReceiptView};
pub use store::{
    ConditionalUpdate, Constraint, ContractStore, InMemoryStore, PaymentStore, ReceiptStore,
    SettingsStore, StoreError,
};
pub use types::{
    CompetenceMonth, ContractId, ContractStatus, IssuerId, OwnerId, PaymentId, PaymentMethod,
    PaymentStatus, PropertyId, ReceiptId, TenantId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
