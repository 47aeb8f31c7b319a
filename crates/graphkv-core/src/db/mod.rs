//! The four engines that sit on top of [`crate::chunked::ChunkedKv`]:
//! indexes, relationships, entities, and backup/restore (spec §4.3–§4.6).
//! Constructed leaves-first — `IndexEngine` and `RelationshipEngine` have
//! no dependency on each other or on `EntityEngine`, which holds a
//! reference to both.

pub mod backup;
pub mod entity;
pub mod index;
pub mod relation;
