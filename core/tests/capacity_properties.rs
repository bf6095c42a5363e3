//! Property tests: inventory never oversells.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use proptest::prelude::*;
use std::sync::Arc;
use ticketbooth_core::{
    Capacity, PaymentId, PaymentReconciler, TicketConfig, TicketStore, TicketingError,
};
use ticketbooth_testing::{fixtures, properties, test_clock, InMemoryTicketStore};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_tokens_never_exceed_capacity(
        capacity in properties::capacity(30),
        orders in properties::orders(10, 12),
        replays in prop::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        runtime().block_on(async {
            let store = InMemoryTicketStore::new();
            let config = TicketConfig { capacity: Capacity::new(capacity), ..TicketConfig::default() };
            let reconciler = PaymentReconciler::from_config(Arc::new(store.clone()), &config, Arc::new(test_clock()));

            let mut payments = Vec::new();
            let mut expected = 0u64;
            for (i, tickets) in orders.iter().enumerate() {
                let user = fixtures::user(*tickets);
                store.insert_user(&user).await.unwrap();
                let payment_id = PaymentId::new(format!("PAY-{i}"));

                match reconciler.reconcile(user.id, &payment_id).await {
                    Ok(result) => {
                        prop_assert_eq!(result.tokens.len(), *tickets as usize);
                        expected += u64::from(*tickets);
                        payments.push((user.id, payment_id));
                    }
                    Err(TicketingError::CapacityExceeded { requested, remaining }) => {
                        prop_assert_eq!(requested, u64::from(*tickets));
                        prop_assert!(requested > remaining);
                    }
                    Err(e) => prop_assert!(false, "unexpected error: {e}"),
                }
                prop_assert!(store.token_count() as u64 <= capacity);
            }

            // Replaying reconciled payments never adds rows
            if !payments.is_empty() {
                for index in &replays {
                    let (user_id, payment_id) = index.get(&payments);
                    reconciler.reconcile(*user_id, payment_id).await.unwrap();
                }
            }

            prop_assert_eq!(store.token_count() as u64, expected);
            prop_assert_eq!(store.count_tokens().await.unwrap(), expected);
            Ok(())
        })?;
    }
}
