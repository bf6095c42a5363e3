//! Registration, checkout and export tests.
//!
//! Run with: `cargo test -p ticketbooth-core --test workflow_test`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use std::sync::Arc;
use ticketbooth_core::{
    Capacity, Money, PaymentId, PaymentState, ProviderPayment, Settlement, TicketConfig,
    TicketOffice, TicketStore, TicketingError, UserId,
};
use ticketbooth_testing::{fixtures, test_clock, InMemoryTicketStore, MockPaymentProvider};

struct Harness {
    office: TicketOffice,
    store: InMemoryTicketStore,
    provider: MockPaymentProvider,
}

fn harness(capacity: u64, verify_confirmations: bool) -> Harness {
    let store = InMemoryTicketStore::new();
    let provider = MockPaymentProvider::new();
    let config = TicketConfig {
        capacity: Capacity::new(capacity),
        ticket_price: Money::from_minor_units(1250),
        ..TicketConfig::default()
    };
    let office = TicketOffice::new(
        Arc::new(store.clone()),
        Arc::new(provider.clone()),
        config,
        Arc::new(test_clock()),
        verify_confirmations,
    );
    Harness {
        office,
        store,
        provider,
    }
}

// ============================================================================
// Ledger & registration
// ============================================================================

#[tokio::test]
async fn test_remaining_tracks_issued_tokens() {
    let h = harness(10, true);
    assert_eq!(h.office.ledger.remaining().await.unwrap(), 10);
    assert!(h.office.ledger.can_admit(10).await.unwrap());
    assert!(!h.office.ledger.can_admit(11).await.unwrap());

    let user = h.office.registration.register(fixtures::registration(4)).await.unwrap();
    h.office.reconciler.reconcile(user.id, &PaymentId::new("P")).await.unwrap();

    assert_eq!(h.office.ledger.issued().await.unwrap(), 4);
    assert_eq!(h.office.ledger.remaining().await.unwrap(), 6);
}

#[tokio::test]
async fn test_register_persists_user() {
    let h = harness(10, true);

    let user = h.office.registration.register(fixtures::registration(2)).await.unwrap();

    assert_eq!(user.number_of_tickets, 2);
    assert_eq!(user.registered_at, test_clock_now());
    assert_eq!(h.store.find_user(user.id).await.unwrap(), Some(user));
}

fn test_clock_now() -> chrono::DateTime<chrono::Utc> {
    use ticketbooth_core::Clock;
    test_clock().now()
}

#[tokio::test]
async fn test_register_rejects_when_sold_out() {
    let h = harness(5, true);
    let first = h.office.registration.register(fixtures::registration(5)).await.unwrap();
    h.office.reconciler.reconcile(first.id, &PaymentId::new("P")).await.unwrap();

    let result = h.office.registration.register(fixtures::registration(1)).await;

    let err = result.unwrap_err();
    assert_eq!(
        err.to_string(),
        "You are trying to book 1 tickets, but only 0 tickets are available."
    );
    assert_eq!(h.store.user_count(), 1);
}

#[tokio::test]
async fn test_registration_is_advisory() {
    let h = harness(5, true);

    // Both fit on their own; nothing is reserved until payment
    let a = h.office.registration.register(fixtures::registration(4)).await.unwrap();
    let b = h.office.registration.register(fixtures::registration(4)).await.unwrap();

    h.office.reconciler.reconcile(a.id, &PaymentId::new("PA")).await.unwrap();
    let late = h.office.reconciler.reconcile(b.id, &PaymentId::new("PB")).await;

    assert!(matches!(late, Err(TicketingError::CapacityExceeded { .. })));
}

#[tokio::test]
async fn test_register_validates_form() {
    let h = harness(5, true);

    let mut registration = fixtures::registration(0);
    assert!(matches!(
        h.office.registration.register(registration.clone()).await,
        Err(TicketingError::Validation(_))
    ));

    registration.number_of_tickets = 11;
    assert!(matches!(
        h.office.registration.register(registration).await,
        Err(TicketingError::Validation(_))
    ));
    assert_eq!(h.store.user_count(), 0);
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn test_begin_checkout_charges_price_times_tickets() {
    let h = harness(10, true);
    let user = h.office.registration.register(fixtures::registration(3)).await.unwrap();

    let redirect = h
        .office
        .checkout
        .begin_checkout(
            user.id,
            "https://shop.test/success".to_string(),
            "https://shop.test/cancel".to_string(),
        )
        .await
        .unwrap();

    assert!(redirect.approval_url.starts_with(MockPaymentProvider::APPROVAL_URL));
    assert_eq!(redirect.amount, Money::from_minor_units(3750));

    let created = h.provider.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].user_id, user.id);
    assert_eq!(created[0].amount.to_decimal_string(), "37.50");
    assert_eq!(created[0].currency, "GBP");
    assert_eq!(created[0].description, "Registration Fee");
    assert_eq!(created[0].return_url, "https://shop.test/success");
}

#[tokio::test]
async fn test_begin_checkout_for_unknown_user() {
    let h = harness(10, true);
    let user_id = UserId::new();

    let result = h
        .office
        .checkout
        .begin_checkout(user_id, String::new(), String::new())
        .await;

    assert_eq!(result, Err(TicketingError::UserNotFound(user_id)));
    assert!(h.provider.created().is_empty());
}

#[tokio::test]
async fn test_begin_checkout_surfaces_provider_failure() {
    let h = harness(10, true);
    let user = h.office.registration.register(fixtures::registration(1)).await.unwrap();
    h.provider.fail_with("sandbox down");

    let result = h
        .office
        .checkout
        .begin_checkout(user.id, String::new(), String::new())
        .await;

    assert!(matches!(result, Err(TicketingError::ExternalProviderError(_))));
}

#[tokio::test]
async fn test_verify_confirmation_does_not_charge() {
    let h = harness(10, true);
    let user = h.office.registration.register(fixtures::registration(1)).await.unwrap();
    let redirect = h
        .office
        .checkout
        .begin_checkout(user.id, String::new(), String::new())
        .await
        .unwrap();

    let capture = h
        .office
        .checkout
        .verify_confirmation(user.id, &redirect.payment_id, Some("PAYER-1"))
        .await
        .unwrap();

    assert!(capture.executes());
    assert!(!capture.is_captured());
    assert_eq!(h.provider.lookups(), vec![redirect.payment_id.clone()]);
    assert!(h.provider.executions().is_empty());

    capture.settle().await.unwrap();
    assert_eq!(
        h.provider.executions(),
        vec![(redirect.payment_id, "PAYER-1".to_string())]
    );
}

#[tokio::test]
async fn test_verify_confirmation_accepts_completed_payment() {
    let h = harness(10, true);
    let user = h.office.registration.register(fixtures::registration(1)).await.unwrap();
    let payment_id = PaymentId::new("PAY-DONE");
    h.provider.set_payment(ProviderPayment {
        payment_id: payment_id.clone(),
        state: PaymentState::Completed,
        user_id: Some(user.id),
    });

    let capture = h
        .office
        .checkout
        .verify_confirmation(user.id, &payment_id, None)
        .await
        .unwrap();

    assert!(capture.is_captured());
    capture.settle().await.unwrap();
    assert!(h.provider.executions().is_empty());
}

#[tokio::test]
async fn test_verify_confirmation_rejects_created_payment_without_payer() {
    let h = harness(10, true);
    let user = h.office.registration.register(fixtures::registration(1)).await.unwrap();
    let payment_id = PaymentId::new("PAY-PENDING");
    h.provider.set_payment(ProviderPayment {
        payment_id: payment_id.clone(),
        state: PaymentState::Created,
        user_id: Some(user.id),
    });

    let result = h
        .office
        .checkout
        .verify_confirmation(user.id, &payment_id, None)
        .await;

    assert!(matches!(
        result,
        Err(TicketingError::PaymentNotConfirmed { .. })
    ));
}

#[tokio::test]
async fn test_verify_confirmation_rejects_failed_payment() {
    let h = harness(10, true);
    let user = h.office.registration.register(fixtures::registration(1)).await.unwrap();
    let payment_id = PaymentId::new("PAY-FAILED");
    h.provider.set_payment(ProviderPayment {
        payment_id: payment_id.clone(),
        state: PaymentState::Other("failed".to_string()),
        user_id: Some(user.id),
    });

    let result = h
        .office
        .checkout
        .verify_confirmation(user.id, &payment_id, Some("PAYER"))
        .await;

    assert!(matches!(
        result,
        Err(TicketingError::PaymentNotConfirmed { .. })
    ));
    assert!(h.provider.executions().is_empty());
}

#[tokio::test]
async fn test_verify_confirmation_rejects_someone_elses_payment() {
    let h = harness(10, true);
    let user = h.office.registration.register(fixtures::registration(1)).await.unwrap();
    let payment_id = PaymentId::new("PAY-OTHER");
    h.provider.set_payment(ProviderPayment {
        payment_id: payment_id.clone(),
        state: PaymentState::Created,
        user_id: Some(UserId::new()),
    });

    let result = h
        .office
        .checkout
        .verify_confirmation(user.id, &payment_id, Some("PAYER"))
        .await;

    assert!(matches!(
        result,
        Err(TicketingError::PaymentNotConfirmed { .. })
    ));
    assert!(h.provider.executions().is_empty());
}

#[tokio::test]
async fn test_verification_can_be_disabled() {
    let h = harness(10, false);
    let user = h.office.registration.register(fixtures::registration(1)).await.unwrap();

    let capture = h
        .office
        .checkout
        .verify_confirmation(user.id, &PaymentId::new("PAY-UNKNOWN"), None)
        .await
        .unwrap();
    capture.settle().await.unwrap();

    assert!(h.provider.lookups().is_empty());
    assert!(h.provider.executions().is_empty());
}

// ============================================================================
// Export
// ============================================================================

#[tokio::test]
async fn test_export_lists_all_of_a_users_tokens() {
    let h = harness(10, true);
    let user = h.office.registration.register(fixtures::registration(2)).await.unwrap();
    let issued = h
        .office
        .reconciler
        .reconcile(user.id, &PaymentId::new("PAY-1"))
        .await
        .unwrap();

    let file = h.office.export.export(user.id).await.unwrap();

    assert_eq!(file.file_name, format!("Tickets_{}.txt", user.id));
    assert_eq!(file.content_type, "text/plain");
    assert_eq!(
        file.body,
        format!(
            "Your Tickets:\n{}\n{}",
            issued.tokens[0], issued.tokens[1]
        )
    );
}

#[tokio::test]
async fn test_export_without_tokens() {
    let h = harness(10, true);
    let user = h.office.registration.register(fixtures::registration(2)).await.unwrap();

    assert_eq!(
        h.office.export.export(user.id).await,
        Err(TicketingError::NoTicketsFound(user.id))
    );
}

#[tokio::test]
async fn test_export_for_unknown_user() {
    let h = harness(10, true);
    let user_id = UserId::new();

    assert_eq!(
        h.office.export.export(user_id).await,
        Err(TicketingError::UserNotFound(user_id))
    );
}
