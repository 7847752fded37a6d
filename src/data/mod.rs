//! Typed storage engine: sample codec, RAM/file backend, chunk readers and records.
pub mod backend;
pub mod codec;
pub mod kind;
pub mod reader;
pub mod record;
