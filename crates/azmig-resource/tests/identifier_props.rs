//! Property tests for resource identifier parsing.

use azmig_resource::{IdentifierError, ResourceIdentifier, MIN_SEGMENTS};
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9._-]{0,15}"
}

fn provider() -> impl Strategy<Value = String> {
    "Microsoft\\.[A-Z][a-zA-Z]{2,12}"
}

proptest! {
    #[test]
    fn prop_fields_round_trip(
        sub in segment(),
        rg in segment(),
        provider in provider(),
        resource_type in segment(),
        name in segment(),
        children in proptest::collection::vec((segment(), segment()), 0..3),
    ) {
        let mut id = ResourceIdentifier::new(&sub, &rg, &provider, &resource_type, &name).unwrap();
        for (child_type, child_name) in &children {
            id = id.child(child_type, child_name).unwrap();
        }

        let reparsed: ResourceIdentifier = id.to_string().parse().unwrap();
        prop_assert_eq!(reparsed.subscription_id(), sub.as_str());
        prop_assert_eq!(reparsed.resource_group(), rg.as_str());
        prop_assert_eq!(reparsed.provider(), provider.as_str());
        prop_assert_eq!(reparsed.resource_type(), id.resource_type());
        prop_assert_eq!(reparsed.resource_name(), id.resource_name());
        prop_assert_eq!(&reparsed, &id);
    }

    #[test]
    fn prop_short_paths_are_rejected(
        parts in proptest::collection::vec(segment(), 0..MIN_SEGMENTS),
    ) {
        let input = format!("/{}", parts.join("/"));
        let result = input.parse::<ResourceIdentifier>();
        match result {
            Err(IdentifierError::Malformed { input: reported, .. }) => {
                prop_assert_eq!(reported, input);
            }
            Ok(id) => prop_assert!(false, "parsed short path into {}", id),
        }
    }

    #[test]
    fn prop_missing_markers_are_rejected(
        tail in proptest::collection::vec(segment(), 8..12),
        marker_slot in prop_oneof![Just(0usize), Just(2usize), Just(4usize)],
    ) {
        // Only exact marker words may sit in marker slots
        let mut parts = vec![
            "subscriptions".to_string(), tail[0].clone(),
            "resourceGroups".to_string(), tail[1].clone(),
            "providers".to_string(), tail[2].clone(),
            tail[3].clone(), tail[4].clone(),
        ];
        let replacement = format!("x{}", tail[5]);
        parts[marker_slot] = replacement;

        let input = format!("/{}", parts.join("/"));
        prop_assert!(input.parse::<ResourceIdentifier>().is_err());
    }
}
