/// monthly cycle - schedule, late settlement, receipt and owner split
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use lease_settlement_rs::{
    Contract, EngineConfig, InMemoryStore, Money, Owner, PaymentMethod, Property, ReceiptFilter,
    ReceiptView, SafeTimeProvider, ScheduleRequest, SettleRequest, SettlementEngine, Tenant,
    TimeSource, Uuid,
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    println!("=== monthly rent cycle ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let store = Arc::new(InMemoryStore::new());
    let config = EngineConfig::from_env()?;
    let engine = SettlementEngine::new(store.clone(), config).with_configured_gateway()?;

    // 1. parties and contract
    let owner = Owner {
        id: Uuid::new_v4(),
        name: "Ana Souza".to_string(),
        document: "123.456.789-00".to_string(),
    };
    let tenant = Tenant {
        id: Uuid::new_v4(),
        name: "Bruno Lima".to_string(),
        document: "987.654.321-00".to_string(),
    };
    let property = Property {
        id: Uuid::new_v4(),
        owner_id: owner.id,
        address: "Rua das Flores, 100 - Sao Paulo".to_string(),
    };
    let contract = Contract::new(
        Uuid::new_v4(),
        property.id,
        tenant.id,
        Money::from_major(2_000),
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        NaiveDate::from_ymd_opt(2024, 12, 10).unwrap(),
        dec!(10),
    );
    store.put_owner(owner);
    store.put_tenant(tenant);
    store.put_property(property);
    store.put_contract(contract.clone());

    // 2. schedule
    println!("1. schedule");
    println!("-----------");
    let payments = engine.generate_schedule(contract.id, ScheduleRequest::full_term(), &time)?;
    println!("  payments created: {}", payments.len());
    let again = engine.generate_schedule(contract.id, ScheduleRequest::full_term(), &time)?;
    println!("  created on re-run: {}", again.len());

    // 3. january paid on time
    println!("\n2. on-time payment");
    println!("------------------");
    controller.advance(Duration::days(8));
    let january = engine.settle_payment(&SettleRequest::new(payments[0].id, PaymentMethod::Pix), &time)?;
    println!("  {}", january.payment.notes.unwrap_or_default());

    // 4. february paid 15 days late
    println!("\n3. late payment");
    println!("---------------");
    controller.advance(Duration::days(47));
    println!("  date: {}", time.now().format("%Y-%m-%d"));
    println!("  overdue: {}", engine.list_overdue(&time)?.len());
    let february = engine.settle_payment(&SettleRequest::new(payments[1].id, PaymentMethod::Boleto), &time)?;
    println!("  {}", february.payment.notes.clone().unwrap_or_default());

    match engine.settle_payment(&SettleRequest::new(payments[1].id, PaymentMethod::Boleto), &time) {
        Err(e) => println!("  retry rejected: {}", e),
        Ok(_) => println!("  retry unexpectedly accepted"),
    }

    // 5. receipts
    println!("\n4. receipts");
    println!("-----------");
    let receipts = engine.list_receipts(&ReceiptFilter::for_contract(contract.id))?;
    for receipt in &receipts {
        let view = ReceiptView::from_receipt(receipt);
        println!(
            "  {} | {} | gross {} | fee {} | owner {}",
            view.number, view.competence_label, view.amounts.gross, view.amounts.fee, view.amounts.net
        );
    }
    let owner_total: Money = receipts.iter().map(|r| r.net_amount).sum();
    println!("  passed to owner: {}", owner_total);

    // 6. monthly batch
    println!("\n5. monthly batch");
    println!("----------------");
    let report = engine.run_monthly_batch(3, &time)?;
    println!("  contracts processed: {}", report.contracts_processed);
    println!("  payments created: {}", report.payments_created);
    println!("  events recorded: {}", engine.events().len());

    Ok(())
}
