//! Recording adapter for the `TextGenerator` port.

use std::sync::{Arc, Mutex};

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{GenerationFuture, GenerationRequest, TextGenerator};

/// Records generation calls while delegating to an inner implementation.
pub struct RecordingTextGenerator {
    inner: Box<dyn TextGenerator>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingTextGenerator {
    /// Creates a new recording generator wrapping the given implementation.
    pub fn new(inner: Box<dyn TextGenerator>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl TextGenerator for RecordingTextGenerator {
    fn generate(&self, request: &GenerationRequest) -> GenerationFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            let result = self.inner.generate(&request).await;
            record_result(&self.recorder, "llm", "generate", &request, &result);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::Cassette;
    use crate::ports::{GenerationError, GenerationResponse};

    struct Echo;

    impl TextGenerator for Echo {
        fn generate(&self, request: &GenerationRequest) -> GenerationFuture<'_> {
            let result = if request.prompt.is_empty() {
                Err(GenerationError::EmptyResponse)
            } else {
                Ok(GenerationResponse::text(request.prompt.to_uppercase()))
            };
            Box::pin(async move { result })
        }
    }

    fn request(label: &str, prompt: &str) -> GenerationRequest {
        GenerationRequest {
            model: "m".into(),
            label: label.into(),
            system: String::new(),
            prompt: prompt.into(),
            max_tokens: 16,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn records_successes_and_failures() {
        let dir = std::env::temp_dir().join("quill_rec_llm_test");
        let path = dir.join("llm.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&path, "test", "m")));

        {
            let gen = RecordingTextGenerator::new(Box::new(Echo), Arc::clone(&recorder));
            let ok = gen.generate(&request("plan", "hello")).await.unwrap();
            assert_eq!(ok.text, "HELLO");
            assert!(gen.generate(&request("merge", "")).await.is_err());
        }

        let recorder = Arc::try_unwrap(recorder).unwrap().into_inner().unwrap();
        recorder.finish().unwrap();

        let cassette = Cassette::load(&path).unwrap();
        assert_eq!(cassette.interactions.len(), 2);
        assert_eq!(cassette.interactions[0].input["label"], "plan");
        assert_eq!(cassette.interactions[0].output["Ok"]["text"], "HELLO");
        assert_eq!(cassette.interactions[1].output["Err"], "EmptyResponse");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
