//! Cassette data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded call on a port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Sequence number (assigned automatically by the recorder).
    pub seq: u64,
    /// Port name (`ledger`, `accounts`, `id_gen`, `clock`).
    pub port: String,
    /// Method name invoked on the port.
    pub method: String,
    /// Arguments the port was called with.
    pub input: serde_json::Value,
    /// What the port returned; `Result`s use serde's `{"Ok": ..}` / `{"Err": ..}` shape.
    pub output: serde_json::Value,
}

/// A recorded session against one task store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable name for this cassette.
    pub name: String,
    /// When this cassette was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Address of the task store the session talked to.
    pub store: String,
    /// Ordered list of interactions.
    pub interactions: Vec<Interaction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn yaml_keeps_result_shapes() {
        let cassette = Cassette {
            name: "create-then-read".into(),
            recorded_at: Utc::now(),
            store: "0xd9fc6cC979472A5FA52750ae26805462E1638872".into(),
            interactions: vec![
                Interaction {
                    seq: 0,
                    port: "ledger".into(),
                    method: "submit_create".into(),
                    input: json!({"title": "Buy milk", "body": "2%"}),
                    output: json!({"Ok": "0xabc"}),
                },
                Interaction {
                    seq: 1,
                    port: "ledger".into(),
                    method: "list_items".into(),
                    input: json!({}),
                    output: json!({"Err": {"Read": "timeout"}}),
                },
            ],
        };
        let yaml = serde_yaml::to_string(&cassette).expect("serialize");
        let back: Cassette = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(back, cassette);
        assert!(yaml.contains("store: "));
    }
}
