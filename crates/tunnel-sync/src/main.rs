// # tunnel-sync - Tunnel Route & DNS Sync
//
// This binary is a THIN integration layer:
// - DO NOT add diffing, DNS or Cloudflare logic here
// - All sync logic lives in tunnel-sync-core
// - All Cloudflare API logic lives in tunnel-sync-provider-cloudflare
//
// The binary is responsible for:
// 1. Parsing flags and reading credentials from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the route file and Cloudflare client into the engine
// 4. Printing the report and mapping the outcome to an exit code
//
// ## Configuration
//
// ### Credentials (environment)
// - `CLOUDFLARE_API_TOKEN`: API token (always required)
// - `CLOUDFLARE_ACCOUNT_ID`: Account owning the tunnel (always required)
// - `CLOUDFLARE_TUNNEL_ID`: Tunnel to manage (always required)
// - `CLOUDFLARE_ZONE_ID`: Zone for routed hostnames (required unless `--no-dns`)
//
// ### Run
// - `--config` / `TUNNEL_SYNC_CONFIG`: Route file (default `config.yml`)
// - `--dry-run`: Show what would change without changing anything
// - `--no-dns` (alias `--skip-dns`): Only sync tunnel routes
// - `--json`: Print the report as JSON
// - `--log-level` / `TUNNEL_SYNC_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export CLOUDFLARE_API_TOKEN=your_token
// export CLOUDFLARE_ACCOUNT_ID=your_account
// export CLOUDFLARE_TUNNEL_ID=your_tunnel
// export CLOUDFLARE_ZONE_ID=your_zone
//
// tunnel-sync --config routes.yml --dry-run
// ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;
use tunnel_sync_core::{
    BackendConfig, FileRouteSource, SourceConfig, SyncConfig, SyncEngine, SyncOptions, SyncReport,
};
use tunnel_sync_provider_cloudflare::CloudflareClient;

/// Exit codes for different run outcomes
///
/// - 0: Remote system in sync (or dry run completed)
/// - 1: Configuration or desired-state load error
/// - 2: Remote read failure or other runtime error
/// - 3: Some changes were rejected by the remote system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncExitCode {
    /// All phases succeeded
    Success = 0,
    /// Configuration error or invalid route file
    ConfigError = 1,
    /// Fatal remote or runtime error
    RuntimeError = 2,
    /// Every phase was attempted but at least one change failed
    ApplyFailed = 3,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Sync Cloudflare tunnel ingress routes and their DNS records from a YAML file
#[derive(Debug, Parser)]
#[command(name = "tunnel-sync", version, about)]
struct Cli {
    /// Route file to sync from
    #[arg(long, env = "TUNNEL_SYNC_CONFIG", default_value = "config.yml")]
    config: PathBuf,

    /// Show what would change without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Only sync tunnel routes, leave DNS records alone
    #[arg(long, visible_alias = "skip-dns")]
    no_dns: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log verbosity
    #[arg(
        long,
        env = "TUNNEL_SYNC_LOG_LEVEL",
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    log_level: String,

    /// Maximum number of DNS changes in flight at once
    #[arg(long, env = "TUNNEL_SYNC_DNS_CONCURRENCY", default_value_t = 4)]
    dns_concurrency: usize,

    /// Cloudflare API token
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Cloudflare account ID
    #[arg(long, env = "CLOUDFLARE_ACCOUNT_ID")]
    account_id: Option<String>,

    /// Cloudflare tunnel ID
    #[arg(long, env = "CLOUDFLARE_TUNNEL_ID")]
    tunnel_id: Option<String>,

    /// Cloudflare zone ID (required unless --no-dns)
    #[arg(long, env = "CLOUDFLARE_ZONE_ID")]
    zone_id: Option<String>,

    /// Cloudflare API base URL override
    #[arg(long, env = "CLOUDFLARE_API_BASE", hide = true)]
    api_base: Option<String>,
}

impl Cli {
    /// Environment variables that are required but unset or empty
    fn missing_credentials(&self) -> Vec<&'static str> {
        let mut required = vec![
            ("CLOUDFLARE_API_TOKEN", &self.api_token),
            ("CLOUDFLARE_ACCOUNT_ID", &self.account_id),
            ("CLOUDFLARE_TUNNEL_ID", &self.tunnel_id),
        ];
        if !self.no_dns {
            required.push(("CLOUDFLARE_ZONE_ID", &self.zone_id));
        }

        required
            .into_iter()
            .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| name)
            .collect()
    }

    /// Build and validate the sync configuration
    fn sync_config(&self) -> Result<SyncConfig> {
        let missing = self.missing_credentials();
        if !missing.is_empty() {
            anyhow::bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }

        let source = SourceConfig::File {
            path: self.config.display().to_string(),
        };
        let backend = BackendConfig::Cloudflare {
            api_token: self.api_token.clone().unwrap_or_default(),
            account_id: self.account_id.clone().unwrap_or_default(),
            tunnel_id: self.tunnel_id.clone().unwrap_or_default(),
            zone_id: if self.no_dns { None } else { self.zone_id.clone() },
            api_base: self.api_base.clone(),
        };
        let options = SyncOptions::default()
            .with_dry_run(self.dry_run)
            .with_manage_dns(!self.no_dns)
            .with_dns_apply_concurrency(self.dns_concurrency);

        let config = SyncConfig::new(source, backend).with_options(options);
        config.validate()?;
        Ok(config)
    }

    fn log_level(&self) -> Level {
        match self.log_level.as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                SyncExitCode::ConfigError.into()
            } else {
                SyncExitCode::Success.into()
            };
        }
    };

    // Logs go to stderr so stdout carries only the report
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    let config = match cli.sync_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    info!("Starting tunnel-sync");
    info!("Backend: {:?}", config.backend);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_sync(config, cli.json)).into()
}

/// Wire the engine from configuration
fn build_engine(config: &SyncConfig) -> tunnel_sync_core::Result<SyncEngine> {
    let source = match &config.source {
        SourceConfig::File { path } => FileRouteSource::new(path),
    };

    let tunnel = CloudflareClient::from_config(&config.backend)?;
    let dns = if config.options.manage_dns {
        Some(Box::new(CloudflareClient::from_config(&config.backend)?)
            as Box<dyn tunnel_sync_core::DnsBackend>)
    } else {
        None
    };

    SyncEngine::new(
        Box::new(source),
        Box::new(tunnel),
        dns,
        config.options.clone(),
    )
}

/// Run one sync and map the outcome to an exit code
async fn run_sync(config: SyncConfig, json: bool) -> SyncExitCode {
    let engine = match build_engine(&config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to initialize sync engine: {}", e);
            return SyncExitCode::ConfigError;
        }
    };

    let report = match engine.run().await {
        Ok(report) => report,
        Err(e) if e.is_config() => {
            error!("Error loading configuration: {}", e);
            return SyncExitCode::ConfigError;
        }
        Err(e) => {
            error!("Sync failed: {}", e);
            return SyncExitCode::RuntimeError;
        }
    };

    if let Err(e) = print_report(&report, json) {
        error!("Failed to render report: {}", e);
        return SyncExitCode::RuntimeError;
    }

    exit_code_for(&report)
}

fn print_report(report: &SyncReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}

fn exit_code_for(report: &SyncReport) -> SyncExitCode {
    if report.has_failures() {
        error!("Sync finished with failures");
        SyncExitCode::ApplyFailed
    } else {
        info!("Sync completed");
        SyncExitCode::Success
    }
}
