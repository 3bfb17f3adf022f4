//! Replays recorded interactions from a cassette.

use std::collections::{HashMap, VecDeque};

use super::format::{Cassette, Interaction};

/// Key for indexing interactions by port and method.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct PortMethodKey {
    port: String,
    method: String,
}

/// Replays interactions from a loaded cassette, serving them per
/// port/method pair either in recorded order or by matching their input.
pub struct CassetteReplayer {
    /// Per port+method queue of unconsumed interactions (in recorded order).
    queues: HashMap<PortMethodKey, VecDeque<Interaction>>,
}

impl CassetteReplayer {
    /// Create a new replayer from a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<PortMethodKey, VecDeque<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            let key = PortMethodKey {
                port: interaction.port.clone(),
                method: interaction.method.clone(),
            };
            queues.entry(key).or_default().push_back(interaction.clone());
        }
        Self { queues }
    }

    /// Return the next interaction for the given port and method.
    ///
    /// # Panics
    ///
    /// Panics if the cassette has no (more) interactions for the given
    /// port/method combination.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> Interaction {
        self.next_matching(port, method, |_| true)
    }

    /// Return the earliest unconsumed interaction for the port and method
    /// whose recorded input satisfies `matches`.
    ///
    /// Concurrent callers issue requests in a nondeterministic order, so
    /// ports that fan out (the text generator) select by input instead of
    /// by position.
    ///
    /// # Panics
    ///
    /// Panics if no unconsumed interaction matches, listing what remains.
    pub fn next_matching<F>(&mut self, port: &str, method: &str, matches: F) -> Interaction
    where
        F: Fn(&serde_json::Value) -> bool,
    {
        let key = PortMethodKey { port: port.to_string(), method: method.to_string() };

        let Some(queue) = self.queues.get_mut(&key) else {
            let available: Vec<String> =
                self.queues.keys().map(|k| format!("{}::{}", k.port, k.method)).collect();
            panic!(
                "Cassette exhausted: no interactions recorded for port={port:?} method={method:?}. \
                 Available port::method pairs: [{}]",
                available.join(", ")
            );
        };

        let position = queue.iter().position(|i| matches(&i.input));
        match position.and_then(|p| queue.remove(p)) {
            Some(interaction) => interaction,
            None => {
                let remaining: Vec<String> = queue.iter().map(|i| i.input.to_string()).collect();
                panic!(
                    "Cassette exhausted: no unconsumed interaction for port={port:?} \
                     method={method:?} matches the request. Remaining inputs: [{}]",
                    remaining.join(", ")
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use chrono::Utc;
    use serde_json::json;

    fn make_cassette(interactions: Vec<Interaction>) -> Cassette {
        Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            model: "abc".into(),
            interactions,
        }
    }

    fn interaction(seq: u64, port: &str, label: &str, text: &str) -> Interaction {
        Interaction {
            seq,
            port: port.into(),
            method: "generate".into(),
            input: json!({"label": label}),
            output: json!({"text": text}),
        }
    }

    #[test]
    fn replay_in_recorded_order_per_port() {
        let cassette = make_cassette(vec![
            interaction(0, "llm", "a", "1"),
            Interaction {
                seq: 1,
                port: "id_gen".into(),
                method: "generate_id".into(),
                input: json!({}),
                output: json!("id-1"),
            },
            interaction(2, "llm", "b", "2"),
        ]);

        let mut replayer = CassetteReplayer::new(&cassette);

        let first = replayer.next_interaction("llm", "generate");
        assert_eq!(first.seq, 0);

        let id = replayer.next_interaction("id_gen", "generate_id");
        assert_eq!(id.output, json!("id-1"));

        let second = replayer.next_interaction("llm", "generate");
        assert_eq!(second.output, json!({"text": "2"}));
    }

    #[test]
    fn matching_skips_ahead_and_keeps_the_rest() {
        let cassette = make_cassette(vec![
            interaction(0, "llm", "generate:a.ts", "A"),
            interaction(1, "llm", "generate:b.ts", "B"),
        ]);
        let mut replayer = CassetteReplayer::new(&cassette);

        let b = replayer.next_matching("llm", "generate", |input| input["label"] == "generate:b.ts");
        assert_eq!(b.output, json!({"text": "B"}));

        let a = replayer.next_interaction("llm", "generate");
        assert_eq!(a.output, json!({"text": "A"}));
    }

    #[test]
    #[should_panic(expected = "Cassette exhausted")]
    fn exhausted_replayer_panics_with_descriptive_message() {
        let cassette = make_cassette(vec![interaction(0, "llm", "plan", "[]")]);

        let mut replayer = CassetteReplayer::new(&cassette);
        let _ = replayer.next_interaction("llm", "generate");
        let _ = replayer.next_interaction("llm", "generate");
    }

    #[test]
    #[should_panic(expected = "no interactions recorded")]
    fn unknown_port_panics() {
        let cassette = make_cassette(vec![]);
        let mut replayer = CassetteReplayer::new(&cassette);
        let _ = replayer.next_interaction("unknown", "method");
    }
}
