pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod scraper;

use std::sync::Arc;
use config::Config;
use error::Result;
use llm::CompletionProvider;
use crate::scraper::PageFetcher;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: Arc<PageFetcher>,
    pub completion: Arc<dyn CompletionProvider>,
}

impl AppState {
    pub fn new(config: Config, completion: Arc<dyn CompletionProvider>) -> Result<Self> {
        let fetcher = PageFetcher::new(config.fetch_timeout)?;
        Ok(AppState {
            config: Arc::new(config),
            fetcher: Arc::new(fetcher),
            completion,
        })
    }
}
