use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::info;
use tracing_subscriber::EnvFilter;

use graylog_mcp::client::GraylogClient;
use graylog_mcp::config::{Config, ConfigOverrides, ServerMode};
use graylog_mcp::http::{serve_alongside, serve_http};
use graylog_mcp::mcp::run_stdio;
use graylog_mcp::tools::GraylogTools;

#[derive(Parser, Debug)]
#[command(name = "graylog-mcp", version)]
#[command(about = "MCP server exposing Graylog log search to AI agents")]
struct Cli {
    /// Graylog base URL, e.g. https://graylog.example.com
    #[arg(long, env = "GRAYLOG_URL")]
    graylog_url: Option<String>,

    /// Graylog access token
    #[arg(long, env = "GRAYLOG_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Verify TLS certificates (set to false for self-signed setups)
    #[arg(long, env = "GRAYLOG_SSL_VERIFY")]
    ssl_verify: Option<bool>,

    /// Request timeout in seconds, 0 disables it
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[arg(long)]
    debug: bool,

    #[arg(long, value_enum)]
    transport: Option<ServerMode>,

    #[arg(long)]
    http_addr: Option<String>,

    #[arg(long)]
    http_port: Option<u16>,

    /// Optional YAML or JSON config file; command-line values take precedence
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            url: self.graylog_url.clone(),
            token: self.token.clone(),
            ssl_verify: self.ssl_verify,
            timeout_secs: self.timeout_secs,
            debug: self.debug,
            mode: self.transport,
            http_addr: self.http_addr.clone(),
            http_port: self.http_port,
        }
    }
}

// stdout carries the protocol, so logs always go to stderr.
fn init_tracing(debug: bool) {
    let level = if debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    let config = base.apply(cli.overrides());
    init_tracing(config.server.debug);
    config.validate()?;

    let client = GraylogClient::new(&config.graylog)?;
    let tools = Arc::new(GraylogTools::new(client));
    info!(
        url = %config.graylog.url,
        ssl_verify = config.graylog.ssl_verify,
        mode = ?config.server.mode,
        "graylog-mcp starting"
    );

    match config.server.mode {
        ServerMode::Stdio => run_stdio(tools).await?,
        ServerMode::Sse => serve_http(tools, &config.server.listen_addr()).await?,
        ServerMode::Both => {
            // the process lives as long as the stdio session, unless HTTP fails first
            serve_alongside(tools.clone(), &config.server.listen_addr(), run_stdio(tools)).await?
        }
    }

    Ok(())
}
