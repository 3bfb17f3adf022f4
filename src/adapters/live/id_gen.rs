//! Live adapter for the `IdGenerator` port.

use uuid::Uuid;

use crate::ports::IdGenerator;

/// Audit record ids: `req-` followed by a random v4 UUID without hyphens,
/// so each id is a single key segment.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveIdGenerator;

impl LiveIdGenerator {
    /// Creates a new live ID generator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator for LiveIdGenerator {
    fn generate_id(&self) -> String {
        format!("req-{}", Uuid::new_v4().simple())
    }
}
