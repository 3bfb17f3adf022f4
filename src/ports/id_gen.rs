//! ID generator port for audit-record identifiers.

/// Generates unique identifiers.
///
/// Requirement and change-request audit records are keyed by these ids.
/// Replay substitutes a recorded sequence.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    fn generate_id(&self) -> String;
}
