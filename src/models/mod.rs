//! Core data model for the gallery service.
//!
//! A single persistent entity describes one uploaded image. It maps to a
//! database row via `sqlx::FromRow` and serializes to the wire shape the
//! browser client consumes via `serde`.

pub mod image;
