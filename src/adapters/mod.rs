//! Adapters implementing the port traits.
//!
//! `live` talks to real services, `recording` wraps live adapters and
//! captures a cassette, `replaying` serves a cassette back, and `memory`
//! holds objects in process.

pub mod live;
pub mod memory;
pub mod recording;
pub mod replaying;
