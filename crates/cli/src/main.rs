//! Salespilot CLI — ask questions about Evotor POS sales data.
//!
//! One-shot mode answers a single query argument; with no query the CLI
//! drops into a REPL that keeps conversation history across turns.

use anyhow::{bail, Context};
use clap::Parser;
use salespilot_agent::{AgentLoop, MetricsFallback, SessionHistory, ToolDispatcher};
use salespilot_config::AppConfig;
use salespilot_core::answer::AgentAnswer;
use salespilot_core::error::{Error, ProviderError};
use salespilot_core::provider::Provider;
use salespilot_pos::PosClient;
use salespilot_providers::OpenAiCompatProvider;
use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod render;
mod repl;

#[derive(Parser)]
#[command(
    name = "salespilot",
    about = "Salespilot — an LLM assistant for Evotor POS sales data",
    version
)]
struct Cli {
    /// The question to answer; omit to start an interactive session
    query: Option<String>,

    /// Evotor API token
    #[arg(long, env = "EVOTOR_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Evotor store ID
    #[arg(long, env = "EVOTOR_STORE_ID")]
    store_id: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,

    /// Output JSON instead of text
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Log file path
    #[arg(long)]
    log_file: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// LLM base URL
    #[arg(long, env = "LLM_BASE_URL")]
    llm_base_url: Option<String>,

    /// LLM API key
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    /// LLM model
    #[arg(long, env = "LLM_MODEL")]
    llm_model: Option<String>,
}

/// Everything a query needs: the agent, the no-LLM fallback, and the
/// output settings.
pub(crate) struct App {
    agent: AgentLoop,
    fallback: MetricsFallback,
    json: bool,
    from: Option<String>,
    to: Option<String>,
}

impl App {
    /// Answer one query and print the result. Falls back to the
    /// deterministic metrics path when no LLM is configured.
    pub(crate) async fn handle_query(
        &self,
        history: &mut SessionHistory,
        query: &str,
        interactive: bool,
    ) -> anyhow::Result<()> {
        info!(query, interactive, "query received");

        let answer = match self.agent.run(history, query, interactive).await {
            Ok(answer) => answer,
            Err(Error::Provider(ProviderError::NotConfigured(_))) => {
                self.fallback
                    .run(query, self.from.as_deref(), self.to.as_deref())
                    .await?
            }
            Err(err) => return Err(err.into()),
        };

        log_answer(&answer);
        let mut stdout = std::io::stdout().lock();
        if self.json {
            render::write_json(&mut stdout, &answer)?;
        } else {
            render::write_human(&mut stdout, &answer)?;
        }
        stdout.flush()?;
        Ok(())
    }
}

fn log_answer(answer: &AgentAnswer) {
    info!(
        query = %answer.query,
        answer = %answer.answer_text.trim(),
        results = answer.results.as_ref().map_or(0, |r| r.len()),
        tool_calls = answer.tool_calls.len(),
        "response"
    );
}

/// Merge config-file settings with command-line overrides.
fn merge_config(mut config: AppConfig, cli: &Cli) -> AppConfig {
    if cli.token.is_some() {
        config.pos_token = cli.token.clone();
    }
    if cli.store_id.is_some() {
        config.pos_store_id = cli.store_id.clone();
    }
    if cli.llm_base_url.is_some() {
        config.llm_base_url = cli.llm_base_url.clone();
    }
    if cli.llm_api_key.is_some() {
        config.llm_api_key = cli.llm_api_key.clone();
    }
    if cli.llm_model.is_some() {
        config.llm_model = cli.llm_model.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(log_file) = &cli.log_file {
        config.log_file = log_file.clone();
    }
    if cli.debug {
        config.debug = true;
    }
    config
}

/// Stderr gets human-readable logs; the log file gets JSON lines.
fn init_logging(config: &AppConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if config.debug { "debug" } else { "info" })
    });

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = if config.log_file.trim().is_empty() {
        None
    } else {
        let file = File::options()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("failed to open log file {}", config.log_file))?;
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(Arc::new(file))
                .with_ansi(false),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer.boxed())
        .with(file_layer.map(|l| l.boxed()))
        .init();
    Ok(())
}

fn build_provider(config: &AppConfig, timeout: Duration) -> Option<Arc<dyn Provider>> {
    if !config.has_llm() {
        return None;
    }
    let api_key = config.llm_api_key.clone()?;
    let provider = match &config.llm_base_url {
        Some(base_url) if !base_url.trim().is_empty() => {
            OpenAiCompatProvider::new("openai-compat", base_url.clone(), api_key, timeout)
        }
        _ => OpenAiCompatProvider::openrouter(api_key, timeout),
    };
    match provider {
        Ok(provider) => Some(Arc::new(provider)),
        Err(err) => {
            tracing::warn!(error = %err, "failed to build llm provider");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = merge_config(AppConfig::load()?, &cli);
    config.validate()?;
    init_logging(&config)?;

    if !config.has_pos_token() {
        bail!("Нет доступа: неверный или отсутствующий токен.");
    }

    let timeout = Duration::from_secs(config.timeout_secs);
    let token = config.pos_token.clone().unwrap_or_default();
    let store_id = config.pos_store_id.clone();

    let pos: Arc<PosClient> = Arc::new(PosClient::new(token, store_id.clone(), timeout)?);
    let provider = build_provider(&config, timeout);
    let model = config.llm_model.clone().unwrap_or_default();

    let app = App {
        agent: AgentLoop::new(
            provider,
            model,
            ToolDispatcher::new(pos.clone(), store_id.clone()),
        ),
        fallback: MetricsFallback::new(pos, store_id),
        json: cli.json,
        from: cli.from.clone(),
        to: cli.to.clone(),
    };

    let work = async {
        match cli.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => {
                let mut history = SessionHistory::new(
                    config.history.max_messages,
                    config.history.max_tokens,
                );
                app.handle_query(&mut history, query, false).await
            }
            None => repl::run(&app, &config).await,
        }
    };

    tokio::select! {
        result = work => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        }
    }
}
