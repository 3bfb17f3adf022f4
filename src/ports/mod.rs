//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the orchestration pipeline and
//! an external system (text generation, object storage, time, IDs).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod id_gen;
pub mod llm;
pub mod object_store;

pub use clock::Clock;
pub use id_gen::IdGenerator;
pub use llm::{GenerationError, GenerationFuture, GenerationRequest, GenerationResponse, TextGenerator};
pub use object_store::{ObjectStore, StoreError, StoreFuture};
