//! Property tests: any valid genome survives the versioned codec unchanged,
//! and any unsupported schema version is refused.

use proptest::prelude::*;
use telos_types::{deserialize, serialize, GoalGenome, ModelError, ObjectiveDescriptor};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn arb_domain() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("engineering".to_string()),
        Just("communication".to_string()),
        Just("research".to_string()),
        "[a-z]{3,12}",
    ]
}

fn arb_objectives() -> impl Strategy<Value = Vec<ObjectiveDescriptor>> {
    prop::collection::vec(
        (arb_domain(), 0.0f64..=1.0, prop::option::of(-5.0f64..5.0)),
        1..6,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (domain, weight, strictness))| {
                let id = format!("o{i}");
                let description = format!("objective {i}");
                let objective = ObjectiveDescriptor::new(id, description, domain, weight);
                match strictness {
                    Some(value) => objective.with_parameter("strictness", value),
                    None => objective,
                }
            })
            .collect()
    })
}

pub(crate) fn arb_genome() -> impl Strategy<Value = GoalGenome> {
    ("[a-z]{1,10}", arb_objectives())
        .prop_map(|(agent, objectives)| GoalGenome::seed(agent, objectives).unwrap())
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn round_trip_is_lossless(genome in arb_genome()) {
        let bytes = serialize(&genome).unwrap();
        let decoded = deserialize(&bytes).unwrap();
        prop_assert_eq!(decoded, genome);
    }

    #[test]
    fn unsupported_versions_are_refused(genome in arb_genome(), version in 2u64..10_000) {
        let encoded = serialize(&genome).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        value["schema_version"] = serde_json::json!(version);
        let bytes = serde_json::to_vec(&value).unwrap();

        let is_unknown_version = matches!(
            deserialize(&bytes),
            Err(ModelError::UnknownSchemaVersion { found, .. }) if found == version
        );
        prop_assert!(is_unknown_version);
    }

    #[test]
    fn truncated_payloads_never_decode(genome in arb_genome(), cut in 1usize..64) {
        let bytes = serialize(&genome).unwrap();
        let keep = bytes.len().saturating_sub(cut);
        prop_assert!(deserialize(&bytes[..keep]).is_err());
    }
}
