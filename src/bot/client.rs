use std::sync::Arc;

use twilight_cache_inmemory::InMemoryCache;
use twilight_http::Client;

/// The bot's HTTP and cache APIs, shared between event tasks.
#[derive(Clone, Debug)]
pub struct Api {
    /// The API's HTTP client.
    pub http: Arc<Client>,
    /// The API's in-memory cache.
    pub cache: Arc<InMemoryCache>,
}

impl Api {
    /// Creates a new [`Api`].
    #[must_use]
    pub const fn new(http: Arc<Client>, cache: Arc<InMemoryCache>) -> Self {
        Self { http, cache }
    }

    /// Returns a borrowed view of this [`Api`].
    #[must_use]
    pub fn view(&self) -> ApiRef<'_> {
        ApiRef { http: &self.http, cache: &self.cache }
    }
}

/// A borrowed view of the bot's HTTP and cache APIs.
#[derive(Clone, Copy, Debug)]
pub struct ApiRef<'api> {
    /// The API's HTTP client.
    pub http: &'api Client,
    /// The API's in-memory cache.
    pub cache: &'api InMemoryCache,
}
