/*
 * Responsibility
 * - Config読み込み → 依存生成 (pooled client / verifier / route table) → Router 組み立て
 * - Middleware の適用 (CORS / request-id / body limit / timeout / trace)
 * - axum::serve() で起動、SIGINT / SIGTERM で graceful shutdown
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::auth::build_verifier;
use crate::services::proxy::{Forwarder, RouteTable, Upstream, build_client};
use crate::state::AppState;
use crate::{api, middleware};

fn init_tracing() {
    // RUST_LOG が優先。未設定なら info。
    // 例:
    // RUST_LOG=info,campus_gateway=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development では即落として気付けるようにする
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("failed to load configuration")?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        env = ?config.app_env,
        addr = %config.addr,
        verifier = ?config.verifier,
        "starting api gateway"
    );
    for upstream in Upstream::ALL {
        tracing::info!(upstream = %upstream, url = config.upstreams.get(upstream), "upstream configured");
    }

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("api gateway stopped");
    Ok(())
}

/// Build the process-wide services and inject them into the shared state.
pub fn build_state(config: &Config) -> Result<AppState> {
    let client = build_client(config.upstream_timeout).context("failed to build http client")?;
    let verifier = build_verifier(config, &client)?;
    let routes = Arc::new(RouteTable::campus(config.upstreams.clone()));

    Ok(AppState::new(
        verifier,
        Forwarder::new(client),
        routes,
        config.max_body_bytes,
    ))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = api::routes(state.clone()).with_state(state);

    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
