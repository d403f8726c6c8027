//! Paginated listing state for the gallery grid.
//!
//! `GalleryFeed` is the state machine alone: triggers go in, fetch commands
//! come out, responses are applied back. It never performs I/O, so every
//! transition is directly testable. `GalleryBrowser` pairs a feed with an
//! `ImageApi` and runs the commands.

use crate::client::api::{ApiError, ImageApi};
use crate::models::image::ImageRecord;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_FEED_PAGE_SIZE: u32 = 12;

/// Instruction to fetch one page from the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPage {
    pub page: u32,
    pub limit: u32,
}

/// Incremental fetch-and-append state.
///
/// One instance never has two fetches outstanding: a trigger that arrives
/// while `loading` is set is dropped, and a fetch command is only emitted
/// together with setting `loading`.
#[derive(Debug)]
pub struct GalleryFeed {
    images: Vec<ImageRecord>,
    page: u32,
    page_size: u32,
    has_more: bool,
    loading: bool,
}

impl GalleryFeed {
    pub fn new(page_size: u32) -> Self {
        Self {
            images: Vec::new(),
            page: 1,
            page_size: page_size.max(1),
            has_more: true,
            loading: false,
        }
    }

    /// Begin fetching the current (initially first) page. `None` when a
    /// fetch is already outstanding.
    pub fn mount(&mut self) -> Option<FetchPage> {
        if self.loading {
            return None;
        }
        self.loading = true;
        Some(FetchPage {
            page: self.page,
            limit: self.page_size,
        })
    }

    /// Advancement trigger: the sentinel on the last rendered item became
    /// visible, or the user asked for more. Advances one page and emits a
    /// fetch command, unless a fetch is outstanding or the end was reached.
    pub fn request_more(&mut self) -> Option<FetchPage> {
        if self.loading || !self.has_more {
            return None;
        }
        self.page += 1;
        self.loading = true;
        Some(FetchPage {
            page: self.page,
            limit: self.page_size,
        })
    }

    /// Start over from the first page, keeping the current items rendered
    /// until the fresh page arrives. `None` while a fetch is outstanding.
    pub fn restart(&mut self) -> Option<FetchPage> {
        if self.loading {
            return None;
        }
        self.page = 1;
        self.has_more = true;
        self.loading = true;
        Some(FetchPage {
            page: 1,
            limit: self.page_size,
        })
    }

    /// Apply the response for the page last requested. An empty page marks
    /// the end of the feed; page one replaces the accumulated list, later
    /// pages append in order.
    pub fn apply_page(&mut self, records: Vec<ImageRecord>) {
        self.loading = false;
        if records.is_empty() {
            self.has_more = false;
            return;
        }
        if self.page == 1 {
            self.images = records;
        } else {
            self.images.extend(records);
        }
    }

    /// The outstanding fetch failed. Only the loading flag is cleared; the
    /// page counter stays where it is and nothing is retried.
    pub fn fetch_failed(&mut self) {
        self.loading = false;
    }

    /// Drop a record after its server-side deletion was confirmed. Does not
    /// touch the page counter and triggers no refetch.
    pub fn remove(&mut self, id: Uuid) {
        self.images.retain(|image| image.id != id);
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

impl Default for GalleryFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_PAGE_SIZE)
    }
}

/// A feed bound to an API endpoint: runs the feed's fetch commands and
/// confirms deletions with the server before dropping records locally.
pub struct GalleryBrowser {
    api: Arc<dyn ImageApi>,
    feed: GalleryFeed,
}

impl GalleryBrowser {
    pub fn new(api: Arc<dyn ImageApi>, page_size: u32) -> Self {
        Self {
            api,
            feed: GalleryFeed::new(page_size),
        }
    }

    pub fn feed(&self) -> &GalleryFeed {
        &self.feed
    }

    pub async fn mount(&mut self) -> Result<(), ApiError> {
        let command = self.feed.mount();
        self.run(command).await
    }

    pub async fn request_more(&mut self) -> Result<(), ApiError> {
        let command = self.feed.request_more();
        self.run(command).await
    }

    /// Reload from the first page, used after an upload batch completes.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let command = self.feed.restart();
        self.run(command).await
    }

    /// Delete on the server, then drop the record from the feed. The local
    /// list is only touched once the server confirmed.
    pub async fn delete(&mut self, id: Uuid) -> Result<(), ApiError> {
        self.api.delete_image(id).await?;
        self.feed.remove(id);
        Ok(())
    }

    async fn run(&mut self, command: Option<FetchPage>) -> Result<(), ApiError> {
        let Some(command) = command else {
            return Ok(());
        };
        match self.api.list_images(command.page, command.limit).await {
            Ok(records) => {
                self.feed.apply_page(records);
                Ok(())
            }
            Err(err) => {
                self.feed.fetch_failed();
                Err(err)
            }
        }
    }
}
