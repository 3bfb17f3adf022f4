//! Live adapters for real external interactions.

pub mod clock;
pub mod id_gen;
pub mod llm;
pub mod object_store;

pub use clock::{FixedClock, LiveClock};
pub use id_gen::LiveIdGenerator;
pub use llm::LiveTextGenerator;
pub use object_store::FsObjectStore;
