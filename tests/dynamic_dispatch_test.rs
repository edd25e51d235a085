use chargeable::domain::chargeable::ChargeRecord;
use chargeable::domain::ports::{ChargeStoreBox, LeaseStoreBox, PaymentProcessorBox};
use chargeable::domain::processor::ChargeRequest;
use chargeable::domain::status::{ChargeStatus, RefundReason};
use chargeable::infrastructure::in_memory::{InMemoryChargeStore, InMemoryLeaseStore};
use chargeable::infrastructure::processor::InMemoryProcessor;
use std::time::Duration;

#[tokio::test]
async fn test_ports_as_trait_objects() {
    let charge_store: ChargeStoreBox = Box::new(InMemoryChargeStore::new());
    let lease_store: LeaseStoreBox = Box::new(InMemoryLeaseStore::new());
    let processor: PaymentProcessorBox = Box::new(InMemoryProcessor::new());

    let mut record = ChargeRecord::new("Invoice");
    record.charge_status = ChargeStatus::Paid;

    // Verify Send + Sync by spawning tasks
    let cs_handle = tokio::spawn(async move {
        let id = charge_store.save(&record).await.unwrap();
        charge_store.get("Invoice", id).await.unwrap().unwrap()
    });

    let ls_handle = tokio::spawn(async move {
        let first = lease_store
            .acquire("charge_lock_Invoice_1", Duration::from_secs(60))
            .await
            .unwrap();
        let second = lease_store
            .acquire("charge_lock_Invoice_1", Duration::from_secs(60))
            .await
            .unwrap();
        (first, second)
    });

    let pp_handle = tokio::spawn(async move {
        let charge = processor
            .create_charge(ChargeRequest {
                amount: 1200,
                credential: "tok_visa".to_string(),
                currency: "usd".to_string(),
                description: "Chargeable Invoice id:1".to_string(),
            })
            .await
            .unwrap();
        processor
            .refund(&charge, Some(200), RefundReason::Duplicate)
            .await
            .unwrap()
    });

    let stored = cs_handle.await.unwrap();
    assert_eq!(stored.id, Some(1));
    assert_eq!(stored.charge_status, ChargeStatus::Paid);

    assert_eq!(ls_handle.await.unwrap(), (true, false));

    let refunded = pp_handle.await.unwrap();
    assert_eq!(refunded.amount_refunded, 200);
    assert!(!refunded.refunded);
}
