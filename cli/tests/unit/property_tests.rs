//! Property-based tests for critical validation and generation logic.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used)]

use proptest::prelude::*;

use pcloud_cli::domain::assembly::{format_mac, new_domain_uuid, rewrite_hwaddr};
use pcloud_cli::domain::{Deployable, Infrastructure, MonitorMode};
use pcloud_cli::domain::{validate_config_key, validate_config_value};

// ============================================================================
// MAC and UUID generation
// ============================================================================

proptest! {
    /// Every MAC is a lowercase locally administered KVM address.
    #[test]
    fn prop_mac_has_kvm_prefix(tail in any::<[u8; 3]>()) {
        let mac = format_mac(tail);
        prop_assert!(mac.starts_with("52:54:00:"), "wrong prefix: {}", mac);
        prop_assert_eq!(mac.len(), 17);
        prop_assert!(
            mac.chars().all(|c| c == ':' || c.is_ascii_digit() || ('a'..='f').contains(&c)),
            "not lowercase hex: {}", mac
        );
    }

    /// Rewriting never changes the number of lines nor touches other lines.
    #[test]
    fn prop_rewrite_hwaddr_keeps_other_lines(
        lines in proptest::collection::vec("[A-Z]{1,8}=[a-z0-9]{0,8}", 0..8),
        tail in any::<[u8; 3]>(),
    ) {
        let mut ifcfg = lines.join("\n");
        ifcfg.push_str("\nHWADDR=00:11:22:33:44:55\n");
        let mac = format_mac(tail);
        let out = rewrite_hwaddr(&ifcfg, &mac);

        prop_assert_eq!(out.lines().count(), ifcfg.lines().count());
        for (before, after) in ifcfg.lines().zip(out.lines()) {
            if before.contains("HWADDR") {
                prop_assert_eq!(after, format!("HWADDR=\"{mac}\""));
            } else {
                prop_assert_eq!(after, before);
            }
        }
        prop_assert!(out.ends_with('\n'));
    }
}

#[test]
fn test_domain_uuid_uniqueness_batch() {
    let ids: std::collections::HashSet<_> = (0..100).map(|_| new_domain_uuid()).collect();
    assert_eq!(ids.len(), 100, "duplicate UUIDs generated");
    assert!(ids.iter().all(|id| id.len() == 32));
}

// ============================================================================
// validate_config_key() and validate_config_value() property tests
// ============================================================================

proptest! {
    /// Arbitrary dotted keys outside the whitelist are rejected.
    #[test]
    fn prop_arbitrary_keys_rejected(key in "[a-z]{1,20}\\.[a-z]{1,20}") {
        if key != "glance.host" && key != "glance.port" {
            prop_assert!(validate_config_key(&key).is_err(), "accepted invalid key: {key}");
        }
    }

    /// Every non-zero u16 is a valid glance port.
    #[test]
    fn prop_valid_ports_accepted(port in 1u16..=u16::MAX) {
        prop_assert!(validate_config_value("glance.port", &port.to_string()).is_ok());
    }

    /// Relative paths are never accepted for directory settings.
    #[test]
    fn prop_relative_dirs_rejected(path in "[a-z][a-z0-9/]{0,20}") {
        prop_assert!(validate_config_value("dbdir", &path).is_err());
    }
}

// ============================================================================
// Deployable membership
// ============================================================================

proptest! {
    /// Adding names in any order never yields duplicates and keeps first-seen order.
    #[test]
    fn prop_membership_is_a_unique_ordered_list(
        names in proptest::collection::vec("[a-z]{1,3}", 0..20),
    ) {
        let mut d = Deployable::new("shop", Infrastructure::Libvirt, "root", MonitorMode::Active);
        let mut expected: Vec<String> = Vec::new();
        for n in &names {
            let added = d.add_assembly(n).is_ok();
            prop_assert_eq!(added, !expected.contains(n));
            if added {
                expected.push(n.clone());
            }
        }
        prop_assert_eq!(&d.assemblies, &expected);
        let back = Deployable::from_element(&d.to_element()).expect("round trip");
        prop_assert_eq!(back.assemblies, expected);
    }
}
