// # dyndnsd - Route 53 dynamic DNS daemon
//
// This is a thin integration layer:
// 1. Parse flags (with environment fallbacks) into a `DdnsConfig`
// 2. Initialize logging and a current-thread runtime
// 3. Build the HTTP resolver and the Route 53 provider
// 4. Run the engine until a signal or a halt
//
// All update logic lives in dyndns-core.
//
// ## Example
//
// ```bash
// export AWS_ACCESS_KEY_ID=AKIA...
// export AWS_SECRET_ACCESS_KEY=...
// export HOSTED_ZONE_ID=Z0123456789ABC
// export HOSTED_DOMAIN=home.example.com
//
// dyndnsd --sleep-duration 300 --sleep-splay 30
// ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use dyndns_core::config::{DdnsConfig, ManagedDomain, ProviderConfig, ResolverConfig};
use dyndns_core::{DdnsEngine, EngineEvent, StopReason};
use dyndns_ip_http::HttpAddressResolver;
use dyndns_provider_route53::Route53Provider;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown on SIGINT/SIGTERM
    CleanShutdown = 0,
    /// Startup read failed, write rejected, or no address family resolvable
    RuntimeError = 1,
    /// Missing or invalid configuration
    ConfigError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser, Debug)]
#[command(name = "dyndnsd")]
#[command(about = "Keep a Route 53 A/AAAA record pointed at this host's public addresses")]
#[command(version)]
struct Cli {
    /// AWS access key id
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    aws_access_key_id: String,

    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    aws_secret_access_key: String,

    /// AWS session token (temporary credentials only)
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    aws_session_token: Option<String>,

    /// Route 53 hosted zone id (Z123... or /hostedzone/Z123...)
    #[arg(long, env = "HOSTED_ZONE_ID")]
    hosted_zone_id: String,

    /// Record name to keep up to date (e.g. home.example.com)
    #[arg(long, env = "HOSTED_DOMAIN")]
    domain: String,

    /// Seconds to sleep between checks
    #[arg(long, env = "DDNS_SLEEP_DURATION", default_value_t = 60)]
    sleep_duration: u64,

    /// Random +/- seconds added to every sleep
    #[arg(long, env = "DDNS_SLEEP_SPLAY", default_value_t = 5)]
    sleep_splay: u64,

    /// Echo service host; ipv4.<host> and ipv6.<host> are queried
    #[arg(long, env = "DDNS_ECHO_HOST", default_value = "icanhazip.com")]
    echo_host: String,

    /// Echo service request timeout in seconds
    #[arg(long, env = "DDNS_HTTP_TIMEOUT", default_value_t = 10)]
    http_timeout: u64,

    /// Retries for a retryable Route 53 failure
    #[arg(long, env = "DDNS_MAX_RETRIES", default_value_t = 3)]
    max_retries: usize,

    /// Seconds before the first retry (doubles per attempt)
    #[arg(long, env = "DDNS_RETRY_DELAY_SECS", default_value_t = 5)]
    retry_delay: u64,

    /// Override the Route 53 API endpoint
    #[arg(long, env = "DDNS_ROUTE53_ENDPOINT")]
    route53_endpoint: Option<String>,

    /// Log the change batch instead of submitting it
    #[arg(long, env = "DDNS_DRY_RUN")]
    dry_run: bool,

    /// trace, debug, info, warn or error
    #[arg(long, env = "DDNS_LOG_LEVEL", default_value = "info")]
    log_level: Level,
}

impl Cli {
    /// Build the updater configuration from the parsed flags
    fn to_config(&self) -> DdnsConfig {
        let domain = ManagedDomain::new(self.domain.trim(), self.hosted_zone_id.trim())
            .with_poll_interval_secs(self.sleep_duration)
            .with_jitter_secs(self.sleep_splay);

        let mut provider = ProviderConfig::new(
            self.aws_access_key_id.trim(),
            self.aws_secret_access_key.trim(),
        );
        provider.session_token = self
            .aws_session_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        provider.endpoint = self.route53_endpoint.clone();
        provider.dry_run = self.dry_run;

        let mut config = DdnsConfig::new(domain, provider);
        config.resolver = ResolverConfig {
            echo_host: self.echo_host.clone(),
            timeout_secs: self.http_timeout,
        };
        config.engine.max_retries = self.max_retries;
        config.engine.retry_delay_secs = self.retry_delay;
        config.engine.max_retry_delay_secs = config.engine.max_retry_delay_secs.max(self.retry_delay);
        config
    }
}

fn main() -> ExitCode {
    // Usage errors exit with 2, --help/--version with 0
    let cli = Cli::parse();

    let config = cli.to_config();
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        eprintln!();
        eprintln!("{}", Cli::command().render_usage());
        return DdnsExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::RuntimeError.into();
    }

    info!(
        "Starting dyndnsd {} for {} (zone {}, every {}s +/- {}s)",
        env!("CARGO_PKG_VERSION"),
        config.domain.name,
        config.domain.zone_id(),
        config.domain.poll_interval_secs,
        config.domain.jitter_secs
    );

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_daemon(config).await {
            Ok(StopReason::Shutdown) => DdnsExitCode::CleanShutdown,
            Ok(StopReason::NoAddresses) => DdnsExitCode::RuntimeError,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DdnsExitCode::RuntimeError
            }
        }
    });

    info!("Exiting with code {}", code as u8);
    code.into()
}

/// Build the components and run the engine to completion
async fn run_daemon(config: DdnsConfig) -> Result<StopReason> {
    let resolver = HttpAddressResolver::from_config(&config.resolver)
        .context("Failed to create address resolver")?;
    let provider =
        Route53Provider::from_config(&config.provider).context("Failed to create Route 53 provider")?;

    if provider.is_dry_run() {
        warn!("Dry-run mode: change batches are logged, not submitted");
    }

    let (engine, events) = DdnsEngine::new(Box::new(resolver), Box::new(provider), config)
        .context("Failed to create engine")?;

    tokio::spawn(log_events(events));

    let reason = engine.run().await?;
    Ok(reason)
}

/// Drain engine events into the debug log
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        debug!("Engine event: {:?}", event);
    }
}
