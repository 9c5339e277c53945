use ai_client::AiConfig;
use anyhow::{bail, Context, Result};
use brief_core::MatchPolicy;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BriefConfig {
    pub bind_addr: SocketAddr,

    // Pipeline
    pub history_days: u32,
    pub retrieval_k: usize,
    pub match_policy: MatchPolicy,
    pub yahoo_rate_limit: usize,
    pub http_timeout: Duration,

    // Morning brief fan-out targets
    pub stock_service_url: String,
    pub rag_service_url: String,
    pub speech_service_url: String,
    pub voice_output_path: String,

    // Hosted models
    pub ai: AiConfig,
}

impl BriefConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr: SocketAddr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address like 0.0.0.0:3000")?;

        let http_timeout = Duration::from_secs(
            env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
        );

        // Fan-out defaults to this server's own routes
        let local = format!("http://127.0.0.1:{}", bind_addr.port());

        let mut ai = AiConfig::default();
        ai.timeout = http_timeout;

        let config = Self {
            bind_addr,
            history_days: env::var("HISTORY_DAYS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("HISTORY_DAYS must be a positive integer")?,
            retrieval_k: env::var("RETRIEVAL_K")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("RETRIEVAL_K must be a positive integer")?,
            match_policy: env::var("SYMBOL_MATCH_POLICY")
                .unwrap_or_else(|_| "first".to_string())
                .parse::<MatchPolicy>()
                .map_err(anyhow::Error::msg)
                .context("SYMBOL_MATCH_POLICY must be 'first' or 'longest'")?,
            yahoo_rate_limit: env::var("YAHOO_RATE_LIMIT")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("YAHOO_RATE_LIMIT must be requests per minute")?,
            http_timeout,
            stock_service_url: env::var("STOCK_SERVICE_URL").unwrap_or_else(|_| local.clone()),
            rag_service_url: env::var("RAG_SERVICE_URL").unwrap_or_else(|_| local.clone()),
            speech_service_url: env::var("SPEECH_SERVICE_URL").unwrap_or_else(|_| local),
            voice_output_path: env::var("VOICE_OUTPUT_PATH").unwrap_or_else(|_| "voice.mp3".to_string()),
            ai,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_days == 0 {
            bail!("HISTORY_DAYS must be at least 1");
        }
        if self.retrieval_k == 0 {
            bail!("RETRIEVAL_K must be at least 1");
        }
        if self.yahoo_rate_limit == 0 {
            bail!("YAHOO_RATE_LIMIT must be at least 1");
        }
        Ok(())
    }
}
