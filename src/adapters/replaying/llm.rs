//! Replaying adapter for the `TextGenerator` port.

use std::sync::Mutex;

use super::replay_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{GenerationFuture, GenerationRequest, TextGenerator};

/// Serves recorded generations from a cassette, matched by request label.
///
/// Per-file generation runs concurrently, so calls arrive in a different
/// order than they were recorded; the label (`"generate:src/main.ts"`)
/// identifies which recording answers which call.
pub struct ReplayingTextGenerator {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingTextGenerator {
    /// Create a replaying generator backed by the given replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl TextGenerator for ReplayingTextGenerator {
    fn generate(&self, request: &GenerationRequest) -> GenerationFuture<'_> {
        let output = {
            let mut replayer = self.replayer.lock().expect("replayer lock poisoned");
            replayer
                .next_matching("llm", "generate", |input| input["label"] == request.label.as_str())
                .output
        };
        let context = format!("llm::generate[{}]", request.label);
        Box::pin(async move { replay_result(output, &context) })
    }
}
