//! Service context bundling all port trait objects.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::adapters::live::{FsObjectStore, LiveClock, LiveIdGenerator, LiveTextGenerator};
use crate::adapters::recording::{RecordingClock, RecordingIdGenerator, RecordingTextGenerator};
use crate::adapters::replaying::{ReplayingClock, ReplayingIdGenerator, ReplayingTextGenerator};
use crate::cassette::format::Cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::cassette::replayer::CassetteReplayer;
use crate::config::Settings;
use crate::ports::{Clock, IdGenerator, ObjectStore, TextGenerator};

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live, recording, replaying).
pub struct ServiceContext {
    /// Text-generation service.
    pub llm: Box<dyn TextGenerator>,
    /// Durable object store.
    pub objects: Box<dyn ObjectStore>,
    /// ID generator for audit-record keys.
    pub id_gen: Box<dyn IdGenerator>,
    /// Clock for snapshot timestamps.
    pub clock: Box<dyn Clock>,
    /// Cassette recorder shared by the recording adapters, if recording.
    recorder: Option<Arc<Mutex<CassetteRecorder>>>,
}

impl ServiceContext {
    /// Creates a context from explicit adapters.
    #[must_use]
    pub fn new(
        llm: Box<dyn TextGenerator>,
        objects: Box<dyn ObjectStore>,
        id_gen: Box<dyn IdGenerator>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self { llm, objects, id_gen, clock, recorder: None }
    }

    /// Creates a live context: Anthropic API, filesystem store under
    /// `settings.store_root`, random ids, system clock.
    #[must_use]
    pub fn live(settings: &Settings) -> Self {
        Self::new(
            Box::new(LiveTextGenerator::new()),
            Box::new(FsObjectStore::new(&settings.store_root)),
            Box::new(LiveIdGenerator::new()),
            Box::new(LiveClock),
        )
    }

    /// Creates a live context whose generation, id and clock interactions
    /// are captured to a cassette at `path`.
    ///
    /// The cassette is written by [`ServiceContext::finish_recording`].
    #[must_use]
    pub fn recording(settings: &Settings, path: &Path) -> Self {
        let recorder =
            Arc::new(Mutex::new(CassetteRecorder::new(path, "quill-session", &settings.model)));

        Self {
            llm: Box::new(RecordingTextGenerator::new(
                Box::new(LiveTextGenerator::new()),
                Arc::clone(&recorder),
            )),
            objects: Box::new(FsObjectStore::new(&settings.store_root)),
            id_gen: Box::new(RecordingIdGenerator::new(
                Box::new(LiveIdGenerator::new()),
                Arc::clone(&recorder),
            )),
            clock: Box::new(RecordingClock::new(Box::new(LiveClock), Arc::clone(&recorder))),
            recorder: Some(recorder),
        }
    }

    /// Creates a context that serves generation, id and clock interactions
    /// from a cassette file, persisting into `objects`.
    ///
    /// Each port gets its own replayer from the same cassette so that
    /// per-port queues are independent.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path, objects: Box<dyn ObjectStore>) -> Result<Self, String> {
        let cassette = Cassette::load(path)?;
        Ok(Self::replaying_cassette(&cassette, objects))
    }

    /// Creates a replaying context from an already loaded cassette.
    #[must_use]
    pub fn replaying_cassette(cassette: &Cassette, objects: Box<dyn ObjectStore>) -> Self {
        Self::new(
            Box::new(ReplayingTextGenerator::new(CassetteReplayer::new(cassette))),
            objects,
            Box::new(ReplayingIdGenerator::new(CassetteReplayer::new(cassette))),
            Box::new(ReplayingClock::new(CassetteReplayer::new(cassette))),
        )
    }

    /// Releases the adapters and writes the cassette when recording.
    ///
    /// Returns the cassette path, or `None` for non-recording contexts.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette cannot be written.
    pub fn finish_recording(self) -> Result<Option<PathBuf>, String> {
        let Self { llm, objects, id_gen, clock, recorder } = self;
        drop((llm, objects, id_gen, clock));

        let Some(recorder) = recorder else {
            return Ok(None);
        };
        let recorder = Arc::try_unwrap(recorder)
            .map_err(|_| "Recording adapters still hold the recorder".to_string())?
            .into_inner()
            .map_err(|e| format!("Recorder lock poisoned: {e}"))?;
        recorder.finish().map(Some).map_err(|e| format!("Failed to write cassette: {e}"))
    }
}
