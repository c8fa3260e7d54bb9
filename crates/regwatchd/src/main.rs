// # regwatchd - Regwatch Daemon
//
// The regwatchd daemon is a thin integration layer. It is responsible for:
// 1. Locating and reading the JSON configuration file
// 2. Initializing tracing and the tokio runtime
// 3. Registering the built-in notification handlers
// 4. Failing fast on unresolvable action references
// 5. Running the update watcher until SIGTERM/SIGINT
//
// All watch logic lives in regwatch-core.
//
// ## Configuration
//
// The configuration file path is the first CLI argument, or the
// `REGWATCH_CONFIG` environment variable, or `/etc/regwatch/config.json`.
// `REGWATCH_LOG_LEVEL` overrides the configured log level.
//
// ## Example
//
// ```bash
// regwatchd /etc/regwatch/config.json
// ```
//
// ```json
// {
//   "registry": { "username": "watcher", "password": "..." },
//   "interval_minutes": 60,
//   "state_path": "/var/lib/regwatch/state.json",
//   "services": [
//     {
//       "image": "grafana/loki:2.9",
//       "actions": [
//         { "type": "mail-hook", "instance": "corp", "recipient": "ops@example.com" },
//         { "type": "web-hook", "instance": "chat" }
//       ]
//     }
//   ],
//   "smtp_servers": {
//     "corp": { "host": "smtp.example.com", "from": "regwatch@example.com" }
//   },
//   "webhooks": {
//     "chat": { "url": "https://chat.example.com/hook", "body": { "text": "$msg" } }
//   }
// }
// ```

use anyhow::{Context, Result};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use regwatch_core::{FileStateStore, HandlerRegistry, UpdateWatcher, WatchConfig};
use regwatch_hub::DockerHubClient;
use regwatch_notify_mail::MailHook;
use regwatch_notify_webhook::WebHook;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default configuration file path
const DEFAULT_CONFIG_PATH: &str = "/etc/regwatch/config.json";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration load or parse error
/// - 2: Configuration/action validation failure
/// - 3: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum RegwatchExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration file missing or unparsable
    ConfigError = 1,
    /// Configuration or action references failed validation
    ValidationError = 2,
    /// Runtime error (unexpected failure)
    RuntimeError = 3,
}

impl From<RegwatchExitCode> for ExitCode {
    fn from(code: RegwatchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Locate and parse the configuration file
fn load_config() -> Result<WatchConfig> {
    let path = env::args()
        .nth(1)
        .or_else(|| env::var("REGWATCH_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file {}", path))?;

    let config: WatchConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse configuration file {}", path))?;

    Ok(config)
}

fn parse_log_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn main() -> ExitCode {
    // Load and validate configuration before anything else
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {:#}", e);
            return RegwatchExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("configuration validation error: {}", e);
        return RegwatchExitCode::ValidationError.into();
    }

    // Initialize tracing
    let level = env::var("REGWATCH_LOG_LEVEL")
        .ok()
        .as_deref()
        .and_then(parse_log_level)
        .or_else(|| parse_log_level(&config.log_level))
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to set tracing subscriber: {}", e);
        return RegwatchExitCode::ConfigError.into();
    }

    info!("starting regwatchd");
    info!(
        "configuration loaded: {} service(s), interval {} minute(s)",
        config.services.len(),
        config.interval_minutes
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {}", e);
            return RegwatchExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config)).into()
}

/// Run the daemon
async fn run_daemon(config: WatchConfig) -> RegwatchExitCode {
    // Register built-in notification handlers
    let handlers = Arc::new(HandlerRegistry::new());
    handlers.register(regwatch_notify_mail::KIND, Arc::new(MailHook::new()));
    handlers.register(regwatch_notify_webhook::KIND, Arc::new(WebHook::new()));

    // Fail fast: every configured action must resolve to a registered
    // kind and a defined backend instance before the loop starts.
    if !handlers.validate_all(&config) {
        error!("notification actions reference unknown kinds or undefined instances");
        return RegwatchExitCode::ValidationError;
    }

    let registry = Box::new(DockerHubClient::new());
    let state_store = Box::new(FileStateStore::new(&config.state_path));

    let watcher = match UpdateWatcher::new(registry, state_store, handlers, config) {
        Ok(watcher) => watcher,
        Err(e) => {
            error!("failed to build watcher: {}", e);
            return RegwatchExitCode::ValidationError;
        }
    };

    // Route OS signals into the watcher's shutdown channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("received {}", signal),
            Err(e) => error!("signal handler error: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    match watcher.run_with_shutdown(Some(shutdown_rx)).await {
        Ok(()) => {
            info!("regwatchd stopped");
            RegwatchExitCode::CleanShutdown
        }
        Err(e) => {
            error!("daemon error: {}", e);
            RegwatchExitCode::RuntimeError
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
