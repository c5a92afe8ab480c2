use std::env;

use crate::ledger::LedgerOptions;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    // Bearer token for /api routes (optional — auth disabled when unset)
    pub api_token: Option<String>,

    // Ledger
    pub auto_allocate: bool,
    pub event_buffer: usize,
    pub ingest_buffer: usize,
    pub seed_default_split: bool,

    // Logging
    pub log_json: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            api_token: env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),

            auto_allocate: env::var("AUTO_ALLOCATE")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
            event_buffer: env::var("EVENT_BUFFER")
                .unwrap_or_else(|_| "256".into())
                .parse()
                .unwrap_or(256),
            ingest_buffer: env::var("INGEST_BUFFER")
                .unwrap_or_else(|_| "1000".into())
                .parse()
                .unwrap_or(1000),
            seed_default_split: env::var("SEED_DEFAULT_SPLIT")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),

            log_json: env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }

    pub fn ledger_options(&self) -> LedgerOptions {
        LedgerOptions {
            auto_allocate: self.auto_allocate,
            event_buffer: self.event_buffer,
        }
    }

    /// Returns true if bearer-token auth is enforced on /api routes.
    pub fn has_api_auth(&self) -> bool {
        self.api_token.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            api_token: None,
            auto_allocate: true,
            event_buffer: 256,
            ingest_buffer: 1000,
            seed_default_split: false,
            log_json: false,
        }
    }
}
