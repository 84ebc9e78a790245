use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use env_flags::env_flags;
use once_cell::sync::OnceCell;
use rust_mcp_sdk::error::SdkResult;
use rust_mcp_sdk::mcp_server::{
    HyperServerOptions, ServerRuntime, hyper_server_core, server_runtime_core,
};
use rust_mcp_sdk::schema::{
    Implementation, InitializeResult, LATEST_PROTOCOL_VERSION, ServerCapabilities,
    ServerCapabilitiesTools,
};
use rust_mcp_sdk::{McpServer, StdioTransport, TransportOptions};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, prelude::*};

use confsync::catalog::{self, CatalogOverrides, FileCatalog, ModelCatalog};
use confsync::config::{UserConfig, expand_home, load_user_config, resolve_home, user_home};
use confsync::engine::SyncEngine;
use confsync::handler::SyncServerHandler;
use confsync::model::TargetKind;
use confsync::service::SyncService;
use confsync::target::Target;

env_flags! {
    /// Confsync home directory (absolute). Defaults to $HOME/.confsync
    CONFSYNC_HOME: &str = "";
}

fn env_set(k: &str) -> bool {
    std::env::var_os(k).is_some()
}

/// Env value when the variable is set and non-empty, else the config file
/// value.
fn env_or_file(key: &str, env_val: &str, file_val: Option<&String>) -> Option<String> {
    if env_set(key) && !env_val.is_empty() {
        Some(env_val.to_string())
    } else {
        file_val.cloned()
    }
}

#[derive(Clone, Copy, Debug)]
enum LogStyle {
    Json,
    Compact,
    Pretty,
    Full,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn fmt_layer<W>(style: LogStyle, ansi: bool, writer: W) -> BoxedLayer
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let base = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);
    match style {
        LogStyle::Json => base.json().boxed(),
        LogStyle::Compact => base.compact().boxed(),
        LogStyle::Pretty => base.pretty().boxed(),
        LogStyle::Full => base.boxed(),
    }
}

fn init_tracing(home: &Path, user_cfg: Option<&UserConfig>) {
    env_flags! {
        /// Tracing filter, e.g. "info", "debug", or targets format.
        RUST_LOG: &str = "info";
        /// Preferred filter env (alias). If set, overrides RUST_LOG.
        TRACING_FILTER: &str = "";
        /// Pretty formatting for logs (ignored if TRACING_JSON=true).
        TRACING_PRETTY: bool = false;
        /// Compact single-line formatting for logs (ignored if TRACING_JSON=true)
        TRACING_COMPACT: bool = true;
        /// JSON formatting for logs
        TRACING_JSON: bool = false;
        /// If true, also log to file under <CONFSYNC_HOME>/logs or LOG_DIR
        LOG_TO_FILE: bool = true;
        /// Optional explicit log directory (absolute). Defaults to <CONFSYNC_HOME>/logs
        LOG_DIR: &str = "";
    }

    let mut rust_log = if !(*TRACING_FILTER).is_empty() {
        (*TRACING_FILTER).to_string()
    } else {
        (*RUST_LOG).to_string()
    };
    let mut tracing_json = *TRACING_JSON;
    let mut tracing_compact = *TRACING_COMPACT;
    let mut tracing_pretty = *TRACING_PRETTY;
    let mut log_to_file = *LOG_TO_FILE;
    let mut log_dir: Option<PathBuf> = if !(*LOG_DIR).is_empty() {
        Some(PathBuf::from((*LOG_DIR).to_string()))
    } else {
        None
    };

    if let Some(cfg) = user_cfg.and_then(|c| c.logging.as_ref()) {
        if !(env_set("TRACING_FILTER") || env_set("RUST_LOG"))
            && let Some(level) = cfg.level.as_ref()
        {
            rust_log = level.clone();
        }
        if !env_set("TRACING_JSON")
            && let Some(v) = cfg.json
        {
            tracing_json = v;
        }
        if !env_set("TRACING_COMPACT")
            && let Some(v) = cfg.compact
        {
            tracing_compact = v;
        }
        if !env_set("TRACING_PRETTY")
            && let Some(v) = cfg.pretty
        {
            tracing_pretty = v;
        }
        if !env_set("LOG_TO_FILE")
            && let Some(v) = cfg.to_file
        {
            log_to_file = v;
        }
        if !env_set("LOG_DIR")
            && let Some(dir) = cfg.dir.as_ref()
        {
            log_dir = Some(expand_home(dir));
        }
    }

    let style = if tracing_json {
        LogStyle::Json
    } else if tracing_compact {
        LogStyle::Compact
    } else if tracing_pretty {
        LogStyle::Pretty
    } else {
        LogStyle::Full
    };
    let filter = EnvFilter::try_new(rust_log).unwrap_or_else(|_| EnvFilter::new("info"));

    // Always write logs to stderr to avoid contaminating stdio JSON-RPC.
    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(style, true, std::io::stderr)];
    static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
    let mut file_error = None;
    if log_to_file {
        let dir = log_dir.unwrap_or_else(|| home.join("logs"));
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(&dir, "confsync-mcp.log");
                let (nb, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                layers.push(fmt_layer(style, false, nb));
            }
            Err(e) => file_error = Some((dir, e)),
        }
    }

    let subscriber = tracing_subscriber::registry().with(layers).with(filter);
    if let Err(e) = subscriber.try_init() {
        tracing::debug!("tracing already set: {:?}", e);
    }
    if let Some((dir, e)) = file_error {
        tracing::warn!("failed to create log dir {}: {}", dir.display(), e);
    }
}

fn build_catalog(home: &Path, user_cfg: Option<&UserConfig>) -> FileCatalog {
    env_flags! {
        /// Catalog TOML path. Defaults to <CONFSYNC_HOME>/catalog.toml
        CATALOG_FILE: &str = "";
        /// Proxy base URL written into synced entries
        PROXY_URL: &str = "";
        /// API key written into synced entries
        PROXY_API_KEY: &str = "";
    }

    let cfg = user_cfg.and_then(|c| c.catalog.as_ref());
    let overrides = CatalogOverrides {
        proxy_url: env_or_file("PROXY_URL", *PROXY_URL, cfg.and_then(|c| c.proxy_url.as_ref())),
        api_key: env_or_file(
            "PROXY_API_KEY",
            *PROXY_API_KEY,
            cfg.and_then(|c| c.api_key.as_ref()),
        ),
    };
    let path = env_or_file("CATALOG_FILE", *CATALOG_FILE, cfg.and_then(|c| c.file.as_ref()))
        .map(|p| expand_home(&p))
        .unwrap_or_else(|| home.join("catalog.toml"));
    if !path.exists() {
        tracing::info!("no catalog at {}; using built-in models", path.display());
        return catalog::load_default(&overrides);
    }
    match catalog::load_from_file(&path, &overrides) {
        Ok(c) => {
            tracing::info!("loaded {} model(s) from {}", c.models.len(), path.display());
            c
        }
        Err(e) => {
            tracing::warn!(
                "failed to load catalog {}: {} (using built-in models)",
                path.display(),
                e
            );
            catalog::load_default(&overrides)
        }
    }
}

fn build_targets(user_cfg: Option<&UserConfig>) -> (Target, Target) {
    env_flags! {
        /// Droid config directory. Defaults to $HOME/.factory
        DROID_HOME: &str = "";
        /// OpenCode config directory. Defaults to $HOME/.config/opencode
        OPENCODE_CONFIG_DIR: &str = "";
    }

    let home = user_home();
    let cfg = user_cfg.and_then(|c| c.targets.as_ref());
    let mut droid = Target::default_for(TargetKind::Droid, &home);
    if let Some(dir) = env_or_file("DROID_HOME", *DROID_HOME, cfg.and_then(|c| c.droid_home.as_ref())) {
        droid = droid.with_config_dir(expand_home(&dir));
    }
    let mut opencode = Target::default_for(TargetKind::OpenCode, &home);
    if let Some(dir) = env_or_file(
        "OPENCODE_CONFIG_DIR",
        *OPENCODE_CONFIG_DIR,
        cfg.and_then(|c| c.opencode_config_dir.as_ref()),
    ) {
        opencode = opencode.with_config_dir(expand_home(&dir));
    }
    for t in [&droid, &opencode] {
        tracing::info!(
            "target {}: {} (installed={})",
            t.kind(),
            t.primary_file().display(),
            t.is_installed()
        );
    }
    (droid, opencode)
}

#[tokio::main]
async fn main() -> SdkResult<()> {
    env_flags! {
        /// Transport: "stdio" (default) or "http"
        TRANSPORT: &str = "stdio";
        /// Host for HTTP transport
        HOST: &str = "127.0.0.1";
        /// Port for HTTP transport
        PORT: u16 = 8081;
        /// Ping interval for HTTP SSE
        PING_SECS: u64 = 5;
        /// Enable JSON response mode for HTTP
        HTTP_JSON: bool = false;
    }

    let home = resolve_home(*CONFSYNC_HOME);
    let (user_cfg, cfg_error) = match load_user_config(&home) {
        Ok(c) => (c, None),
        Err(e) => (None, Some(e)),
    };
    init_tracing(&home, user_cfg.as_ref());
    if let Some(e) = cfg_error {
        tracing::warn!("ignoring {}: {}", home.join("config.toml").display(), e);
    }

    tracing::info!("starting confsync-mcp (transport={})", *TRANSPORT);

    let catalog = build_catalog(&home, user_cfg.as_ref());
    let (droid, opencode) = build_targets(user_cfg.as_ref());
    tracing::info!(
        "catalog: {} model(s), proxy {}",
        catalog.list_models().len(),
        catalog.base_url(TargetKind::Droid)
    );
    let service = SyncService::new(SyncEngine::new(droid, opencode, Arc::new(catalog)));

    let server_details = InitializeResult {
        server_info: Implementation {
            name: "confsync-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some("Model Config Sync MCP Server".to_string()),
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools { list_changed: None }),
            ..Default::default()
        },
        meta: None,
        instructions: Some(
            "Call get_status first; preview_merge shows what execute_sync would write.".to_string(),
        ),
        protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
    };

    let handler = SyncServerHandler::new(service);

    if *TRANSPORT == "stdio" {
        let transport = StdioTransport::new(TransportOptions::default())?;
        let server: ServerRuntime =
            server_runtime_core::create_server(server_details, transport, handler);
        tracing::info!("starting stdio server");
        if let Err(e) = server.start().await {
            let msg = match e.rpc_error_message() {
                Some(m) => m.to_string(),
                None => e.to_string(),
            };
            tracing::error!("server runtime error: {}", msg);
        }
    } else {
        let host = (*HOST).to_string();
        let port = *PORT;
        let server = hyper_server_core::create_server(
            server_details,
            handler,
            HyperServerOptions {
                host: host.clone(),
                port,
                ping_interval: Duration::from_secs(*PING_SECS),
                enable_json_response: Some(*HTTP_JSON),
                ..Default::default()
            },
        );
        tracing::info!(
            "http server configured; starting listener on {}:{} (json={}, ping_secs={})",
            host,
            port,
            *HTTP_JSON,
            *PING_SECS
        );
        if let Err(e) = server.start().await {
            let msg = match e.rpc_error_message() {
                Some(m) => m.to_string(),
                None => e.to_string(),
            };
            tracing::error!("hyper server error: {}", msg);
        }
    }
    tracing::info!("server stopped");
    Ok(())
}
