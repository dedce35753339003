//! Search-augmented context assembly.
//!
//! search -> scrape -> merge -> persist -> format. Failures at any step end
//! in an empty context rather than an error: the conversation always goes on,
//! answered from model knowledge alone if need be.

use std::sync::Arc;

use serde::Serialize;

use crate::core::errors::ApiError;
use crate::core::security::Owner;
use crate::history::{NewSearchResult, SearchQueryRecord, SearchRecordStore};
use crate::tools::fetch::truncate_chars;
use crate::tools::scrape::ScrapeCoordinator;
use crate::tools::search::{SearchHit, WebSearcher};

pub const QUERY_QUALIFIER: &str = "educación Colombia";
pub const DEFAULT_MAX_SOURCES: usize = 3;
pub const SCRAPE_CHARS: usize = 800;
pub const FRAGMENT_CHARS: usize = 600;
pub const STORED_CONTENT_CHARS: usize = 2000;
pub const FRAGMENT_SEPARATOR: &str = "\n\n---\n\n";

/// A search result as shown to the caller and the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub position: u32,
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl From<&SearchHit> for Source {
    fn from(hit: &SearchHit) -> Self {
        Self {
            position: hit.position,
            title: hit.title.clone(),
            url: hit.url.clone(),
            snippet: hit.snippet.clone(),
        }
    }
}

/// Outcome of one assembly. An empty `context` with no `sources` is the
/// degraded case and is a normal value.
#[derive(Debug, Clone, Default)]
pub struct AssembledContext {
    pub context: String,
    pub sources: Vec<Source>,
    pub query_record: Option<SearchQueryRecord>,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

pub fn expand_query(query: &str) -> String {
    format!("{} {}", query.trim(), QUERY_QUALIFIER)
}

pub fn format_fragment(url: &str, title: &str, content: &str) -> String {
    format!("[{}]\n*{}*\n{}", url, title, truncate_chars(content, FRAGMENT_CHARS))
}

#[derive(Clone)]
pub struct ContextAssembler {
    searcher: Arc<dyn WebSearcher>,
    scraper: ScrapeCoordinator,
    store: Option<Arc<dyn SearchRecordStore>>,
}

impl ContextAssembler {
    pub fn new(
        searcher: Arc<dyn WebSearcher>,
        scraper: ScrapeCoordinator,
        store: Option<Arc<dyn SearchRecordStore>>,
    ) -> Self {
        Self {
            searcher,
            scraper,
            store,
        }
    }

    pub async fn assemble(&self, query: &str, owner: Option<&Owner>, max_sources: usize) -> AssembledContext {
        let mut assembled = AssembledContext::default();

        if let Err(err) = self.assemble_into(&mut assembled, query, owner, max_sources).await {
            tracing::warn!(query = %query, "context assembly degraded to empty: {}", err);
            assembled.context.clear();
            assembled.sources.clear();
        }

        assembled
    }

    async fn assemble_into(
        &self,
        out: &mut AssembledContext,
        query: &str,
        owner: Option<&Owner>,
        max_sources: usize,
    ) -> Result<(), ApiError> {
        let expanded = expand_query(query);

        if let (Some(owner), Some(store)) = (owner, &self.store) {
            out.query_record = Some(store.create_search_query(owner, query, &expanded).await?);
        }

        let hits = self.searcher.search(&expanded, max_sources).await.into_hits();
        if hits.is_empty() {
            return Ok(());
        }

        let urls: Vec<String> = hits.iter().map(|hit| hit.url.clone()).collect();
        let scraped = self.scraper.scrape_all(&urls, SCRAPE_CHARS).await;

        let mut records = Vec::with_capacity(hits.len());
        let mut sources = Vec::with_capacity(hits.len());
        let mut fragments = Vec::with_capacity(hits.len());

        for hit in &hits {
            let content = match scraped.text_for(&hit.url) {
                "" => hit.snippet.as_str(),
                text => text,
            };

            records.push(NewSearchResult {
                title: hit.title.clone(),
                url: hit.url.clone(),
                snippet: hit.snippet.clone(),
                content: truncate_chars(content, STORED_CONTENT_CHARS),
                position: hit.position,
            });
            fragments.push(format_fragment(&hit.url, &hit.title, content));
            sources.push(Source::from(hit));
        }

        if let (Some(record), Some(store)) = (&out.query_record, &self.store) {
            store.add_search_results(record.id, &records).await?;
        }

        tracing::info!(
            sources = sources.len(),
            abandoned = scraped.abandoned,
            "assembled web context"
        );

        out.context = fragments.join(FRAGMENT_SEPARATOR);
        out.sources = sources;
        Ok(())
    }
}
