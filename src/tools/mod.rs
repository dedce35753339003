//! Outbound web tools used to ground answers: search, page fetch, scrape fan-out.

pub mod fetch;
pub mod scrape;
pub mod search;

pub use fetch::{HttpPageFetcher, PageFetcher};
pub use scrape::{ScrapeCoordinator, ScrapeOutcome};
pub use search::{GoogleCseClient, SearchHit, SearchOutcome, WebSearcher};
