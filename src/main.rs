//! switchyard demo server.
//!
//! Loads configuration, registers a small route tree, and serves it.
//!
//! ```text
//! /health                  GET
//! /api/users               GET (?limit=N), POST (name=...)
//! /api/users/<int:id>      GET, DELETE
//! /api/*                   no_route fallback
//! /articles/<slug:slug>    GET
//! /debug/panic             GET   (only with debug.expose_errors)
//! ```
//!
//! Root middleware, outermost first: access log, security headers, CORS.
//! The `api/` subtree adds bearer auth when enabled.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use switchyard::config::{load_config, validate_config, ConfigError, ServerConfig};
use switchyard::http::{handler_fn, DispatchOptions, Dispatcher, HttpServer, Request, Response};
use switchyard::lifecycle::{wait_for_signal, Shutdown};
use switchyard::middleware::{
    install_panic_hook, AccessLogMiddleware, BearerAuthMiddleware, CorsMiddleware,
    SecurityHeadersMiddleware,
};
use switchyard::observability::{init_logging, init_metrics};
use switchyard::routing::{RouteError, RouterNode, ViewSet};
use switchyard::ConverterRegistry;

#[derive(Parser, Debug)]
#[command(name = "switchyard")]
#[command(version, about = "Typed-route HTTP dispatch server", long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate config, print the route table, and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    init_logging(&config.observability);
    install_panic_hook();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "switchyard starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        max_body_bytes = config.limits.max_body_bytes,
        cors = config.cors.enabled,
        auth = config.auth.enabled,
        "Configuration loaded"
    );

    let router = build_routes(&config)?;
    for route in router.routes() {
        tracing::info!(
            template = %format!("/{}", route.template),
            methods = ?route.methods,
            fallback = route.fallback,
            middleware = route.middleware,
            "Route"
        );
    }
    if cli.check {
        return Ok(());
    }

    if config.debug.expose_errors {
        tracing::warn!("debug.expose_errors is on: panic messages reach clients");
    }
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let dispatcher = Dispatcher::new(
        router,
        DispatchOptions {
            expose_errors: config.debug.expose_errors,
        },
    );
    let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, dispatcher);
    let mut task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        signal = wait_for_signal() => {
            tracing::info!(signal, "Signal received");
            shutdown.trigger();
            match tokio::time::timeout(grace, &mut task).await {
                Ok(joined) => joined??,
                Err(_) => tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed, forcing exit"),
            }
        }
        joined = &mut task => joined??,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_routes(config: &ServerConfig) -> Result<RouterNode, RouteError> {
    let mut root = RouterNode::root(Arc::new(ConverterRegistry::with_builtins()));

    root.use_middleware(AccessLogMiddleware::new());
    if config.security_headers.enabled {
        root.use_middleware(SecurityHeadersMiddleware::new(&config.security_headers));
    }
    if config.cors.enabled {
        root.use_middleware(CorsMiddleware::new(&config.cors));
    }

    root.path(
        "health",
        ViewSet::new().get(handler_fn(|_req: Request| async { json!({"status": "ok"}) })),
    )?;

    let api = root.include("api/")?;
    if config.auth.enabled {
        api.use_middleware(BearerAuthMiddleware::new(&config.auth));
    }
    api.path(
        "users",
        ViewSet::new()
            .get(handler_fn(list_users))
            .post(handler_fn(create_user)),
    )?;
    api.path(
        "users/<int:id>",
        ViewSet::new()
            .get(handler_fn(show_user))
            .delete(handler_fn(|_req: Request| async { StatusCode::NO_CONTENT })),
    )?;
    api.set_no_route(handler_fn(|req: Request| async move {
        Response::error(
            StatusCode::NOT_FOUND,
            "unknown_endpoint",
            format!("No API endpoint at {}", req.path()),
        )
    }));

    root.path(
        "articles/<slug:slug>",
        ViewSet::new().get(handler_fn(|req: Request| async move {
            req.path_params
                .get::<String>("slug")
                .map(|slug| json!({"slug": slug, "title": slug.replace('-', " ")}))
        })),
    )?;

    if config.debug.expose_errors {
        root.path(
            "debug/panic",
            ViewSet::new().get(handler_fn(|_req: Request| async {
                if true {
                    panic!("requested panic");
                }
                StatusCode::OK
            })),
        )?;
    }

    Ok(root)
}

async fn list_users(req: Request) -> Result<Response, switchyard::http::ParamError> {
    let limit = req.query_params.get_opt::<usize>("limit")?.unwrap_or(10).min(100);
    let users: Vec<_> = (1..=limit as i64)
        .map(|id| json!({"id": id, "name": format!("user-{}", id)}))
        .collect();
    Ok(Response::json(&users))
}

async fn create_user(req: Request) -> Result<(StatusCode, Response), switchyard::http::ParamError> {
    let name = req.body_params.get::<String>("name")?;
    Ok((StatusCode::CREATED, Response::json(&json!({"id": 101, "name": name}))))
}

async fn show_user(req: Request) -> Result<Response, switchyard::http::ParamError> {
    let id = req.path_params.get::<i64>("id")?;
    Ok(Response::json(&json!({"id": id, "name": format!("user-{}", id)})))
}
