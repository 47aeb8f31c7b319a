//! Reference implementations of the engine's external collaborator traits,
//! used by this crate's own tests and available to downstream crates under
//! the same `testkit` feature-free path the facade's tests use.

pub mod memory_blob;
pub mod memory_kv;
