//! Replaying adapters that serve recorded interactions.

pub mod clock;
pub mod id_gen;
pub mod llm;

use std::sync::Mutex;

use serde::de::DeserializeOwned;

use crate::cassette::replayer::CassetteReplayer;

pub use clock::ReplayingClock;
pub use id_gen::ReplayingIdGenerator;
pub use llm::ReplayingTextGenerator;

/// Take the next recorded output for a port/method in recorded order.
pub(crate) fn next_output(
    replayer: &Mutex<CassetteReplayer>,
    port: &str,
    method: &str,
) -> serde_json::Value {
    let mut guard = replayer.lock().expect("replayer lock poisoned");
    guard.next_interaction(port, method).output
}

/// Decode a recorded `Result` written with the `{"Ok": ..}` / `{"Err": ..}` convention.
///
/// # Panics
///
/// Panics if the recorded value does not decode, which means the cassette
/// does not belong to this build.
pub(crate) fn replay_result<T, E>(output: serde_json::Value, context: &str) -> Result<T, E>
where
    T: DeserializeOwned,
    E: DeserializeOwned,
{
    serde_json::from_value(output)
        .unwrap_or_else(|e| panic!("{context}: recorded result does not decode: {e}"))
}
