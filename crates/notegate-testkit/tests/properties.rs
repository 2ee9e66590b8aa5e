//! Gateway-level property tests.
//!
//! For any starting balance and any number of spend attempts on one
//! resource, exactly the first attempt with a positive balance consumes,
//! and the books balance afterwards.

use proptest::prelude::*;

use notegate::{AccessRequest, GatewayError};
use notegate_store::{CreditLedger, EntitlementStore};
use notegate_testkit::generators::{arb_resource_id, arb_starting_balance, arb_user_id};
use notegate_testkit::TestFixture;

proptest! {
    #[test]
    fn repeated_spends_charge_at_most_once(
        user in arb_user_id(),
        resource in arb_resource_id(),
        balance in arb_starting_balance(),
        attempts in 1usize..6,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        rt.block_on(async move {
            let fixture = TestFixture::new();
            fixture.seed_user(user, balance).await;
            fixture.seed_resource(resource.get(), "12.0").await;
            let credential = fixture.credential(user);

            let mut consumed = 0usize;
            for _ in 0..attempts {
                match fixture
                    .gateway
                    .check_access(Some(&credential), &AccessRequest::spend(resource.get()))
                    .await
                {
                    Ok(view) => {
                        if view.consumed() {
                            consumed += 1;
                        }
                    }
                    Err(GatewayError::InsufficientCredit) => {
                        prop_assert_eq!(balance, 0);
                    }
                    Err(e) => prop_assert!(false, "unexpected error: {}", e),
                }
            }

            let store = fixture.gateway.store();
            let expected_consumed = usize::from(balance > 0);
            prop_assert_eq!(consumed, expected_consumed);
            prop_assert_eq!(
                store.credit_balance(&user).await.unwrap(),
                balance - expected_consumed as u64
            );
            prop_assert_eq!(
                store.grants_for(&user).await.unwrap().len(),
                expected_consumed
            );

            Ok(())
        })?;
    }
}
