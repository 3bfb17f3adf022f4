//! Recording adapters for the ports that make a run non-deterministic
//! besides the model: audit record ids and timestamps.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record_interaction;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{Clock, IdGenerator};

/// Shared recorder handle plus the port name interactions are filed under.
struct Tape {
    recorder: Arc<Mutex<CassetteRecorder>>,
    port: &'static str,
}

impl Tape {
    fn keep<T: Serialize>(&self, method: &str, value: T) -> T {
        record_interaction(&self.recorder, self.port, method, &(), &value);
        value
    }
}

/// Records every issued audit record id.
pub struct RecordingIdGenerator {
    inner: Box<dyn IdGenerator>,
    tape: Tape,
}

impl RecordingIdGenerator {
    /// Wraps `inner`, recording into `recorder`.
    pub fn new(inner: Box<dyn IdGenerator>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, tape: Tape { recorder, port: "id_gen" } }
    }
}

impl IdGenerator for RecordingIdGenerator {
    fn generate_id(&self) -> String {
        self.tape.keep("generate_id", self.inner.generate_id())
    }
}

/// Records every timestamp a flow stamps onto a snapshot.
pub struct RecordingClock {
    inner: Box<dyn Clock>,
    tape: Tape,
}

impl RecordingClock {
    /// Wraps `inner`, recording into `recorder`.
    pub fn new(inner: Box<dyn Clock>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, tape: Tape { recorder, port: "clock" } }
    }
}

impl Clock for RecordingClock {
    fn now(&self) -> DateTime<Utc> {
        self.tape.keep("now", self.inner.now())
    }
}
