//! Server-side services: the two leaf store clients and the collection
//! service that composes them.

pub mod gallery_service;
pub mod image_index;
pub mod media_store;
