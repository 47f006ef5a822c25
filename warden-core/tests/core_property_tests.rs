//! Property-Based Tests for Identifiers and Call Context
//!
//! **Property 1: Identifier validation**
//! Every non-empty string is accepted verbatim; the empty string never is.
//!
//! **Property 2: Credential redaction**
//! Neither `Debug` nor `Display` of a credential contains the raw key.
//!
//! **Property 3: Stage budgets**
//! A stage never gets more time than its own timeout or the context deadline.

use std::time::Duration;

use proptest::prelude::*;
use warden_core::{CallContext, ChannelId, Credential, ThingId, ValidationError};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_non_empty_ids_round_trip(raw in "\\PC{1,64}") {
        let thing = ThingId::try_new(raw.clone()).unwrap();
        prop_assert_eq!(thing.as_str(), raw.as_str());

        let channel = ChannelId::try_new(raw.clone()).unwrap();
        prop_assert_eq!(channel.into_inner(), raw);
    }

    #[test]
    fn prop_credential_never_rendered_raw(raw in "[G-Z]{4,40}") {
        // Redacted output is lowercase hex plus fixed text, so an uppercase
        // key can only show up if it leaked.
        let credential = Credential::try_new(raw.clone()).unwrap();
        let displayed = format!("{}", credential);
        let debugged = format!("{:?}", credential);
        prop_assert!(!displayed.contains(&raw));
        prop_assert!(!debugged.contains(&raw));
        prop_assert_eq!(credential.expose(), raw.as_str());
    }

    #[test]
    fn prop_fingerprint_is_stable_hex(raw in "\\PC{1,64}") {
        let a = Credential::try_new(raw.clone()).unwrap().fingerprint();
        let b = Credential::try_new(raw).unwrap().fingerprint();
        prop_assert_eq!(a.len(), 12);
        prop_assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_stage_budget_is_bounded(
        stage_ms in 1u64..10_000,
        context_ms in proptest::option::of(1u64..10_000),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        rt.block_on(async {
            let ctx = match context_ms {
                Some(ms) => CallContext::with_timeout(Duration::from_millis(ms)),
                None => CallContext::background(),
            };
            let stage = Duration::from_millis(stage_ms);
            let budget = ctx.stage_budget(stage);

            prop_assert!(budget <= stage);
            if let Some(ms) = context_ms {
                prop_assert!(budget <= Duration::from_millis(ms));
            } else {
                prop_assert_eq!(budget, stage);
            }
            Ok(())
        })?;
    }
}

#[test]
fn test_empty_ids_rejected() {
    assert_eq!(
        ThingId::try_new(""),
        Err(ValidationError::Empty { field: "thing_id" })
    );
    assert_eq!(
        ChannelId::try_new(""),
        Err(ValidationError::Empty { field: "channel_id" })
    );
    assert!(Credential::try_new("").is_err());
}
