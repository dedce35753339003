use std::sync::Arc;

use serde_json::Value;

use crate::agent::assistant::Assistant;
use crate::agent::persona::AssistantPersona;
use crate::context::pipeline::ContextAssembler;
use crate::core::config::settings::llm_timeout;
use crate::core::config::{AppPaths, ConfigService, LlmSettings, SearchCredentials};
use crate::core::errors::ApiError;
use crate::core::security::{init_session_token, SessionToken};
use crate::history::HistoryStore;
use crate::llm::{groq, LlmService};
use crate::tools::fetch::HttpPageFetcher;
use crate::tools::scrape::ScrapeCoordinator;
use crate::tools::search::{self, GoogleCseClient, SEARCH_TIMEOUT};

pub mod error;

use error::InitializationError;

/// Connection pools for the three outbound services, built once at startup.
#[derive(Clone)]
struct OutboundClients {
    llm: reqwest::Client,
    search: reqwest::Client,
    fetcher: Arc<HttpPageFetcher>,
}

impl OutboundClients {
    fn from_config(config: &Value) -> Result<Self, ApiError> {
        Ok(Self {
            llm: groq::build_client(llm_timeout(config))?,
            search: search::build_client(SEARCH_TIMEOUT)?,
            fetcher: Arc::new(HttpPageFetcher::new()?),
        })
    }
}

/// Shared application state.
///
/// The config is read and validated once at startup. Credentials are still
/// resolved per turn, so a missing key fails the request that needs it.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<Value>,
    pub session_token: SessionToken,
    pub history: HistoryStore,
    outbound: OutboundClients,
}

impl AppState {
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let session_token = init_session_token();

        let history = HistoryStore::new(paths.db_path.clone())
            .await
            .map_err(|e| InitializationError::History(e.into()))?;

        Self::from_parts(paths, &config, session_token, history)
    }

    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: &ConfigService,
        session_token: SessionToken,
        history: HistoryStore,
    ) -> Result<Arc<Self>, InitializationError> {
        let config = config
            .load_config()
            .map_err(|e| InitializationError::Config(e.into()))?;
        let outbound = OutboundClients::from_config(&config)
            .map_err(|e| InitializationError::Http(e.into()))?;

        Ok(Arc::new(AppState {
            paths,
            config: Arc::new(config),
            session_token,
            history,
            outbound,
        }))
    }

    /// Wires a fully configured assistant for one turn.
    pub fn assistant(&self, persona: AssistantPersona) -> Result<Assistant, ApiError> {
        let llm_settings = LlmSettings::from_config(&self.config)?;
        let credentials = SearchCredentials::from_config(&self.config)?;

        let llm = LlmService::from_settings(&llm_settings, self.outbound.llm.clone());
        let searcher = Arc::new(GoogleCseClient::new(credentials, self.outbound.search.clone()));
        let scraper = ScrapeCoordinator::new(self.outbound.fetcher.clone());
        let store = Arc::new(self.history.clone());

        let assembler = ContextAssembler::new(searcher, scraper, Some(store.clone()));
        Ok(Assistant::new(persona, llm, assembler, Some(store)))
    }
}
