//! Image gallery service and its headless client core.
//!
//! The server side exposes list / upload / delete over image records backed
//! by a SQLite metadata index and a disk media store serving public URLs.
//! The `client` module holds the browser-equivalent state machines (the
//! paginated feed and the upload form) plus the HTTP client they run
//! against.

pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
