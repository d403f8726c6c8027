//! Headless client core: the state machines behind the gallery UI and the
//! HTTP client they drive.
//!
//! `feed` holds the paginated, infinite-scroll listing state; `upload_form`
//! holds the pending-upload queue and its batch submission. Both are
//! independent of any UI event mechanism and talk to the server only
//! through the `api::ImageApi` trait.

pub mod api;
pub mod feed;
pub mod upload_form;
