//! HTTP listener and process wiring: health endpoint, optional Telegram
//! webhook, inbound dispatch loop, graceful shutdown.

use crate::channels::{InboundMessage, TelegramChannel, TelegramUpdate, Transport};
use crate::config::{self, Config};
use crate::router::Router;
use crate::upstream::UpstreamClient;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router as HttpRouter,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Clone)]
struct ServerState {
    config: Arc<Config>,
    inbound_tx: mpsc::Sender<InboundMessage>,
}

/// Run the bot: construct the upstream client, Telegram channel, and router
/// as explicit instances, start the inbound dispatch loop, and serve the
/// health endpoint. Blocks until shutdown (Ctrl+C or SIGTERM).
pub async fn run(config: Config) -> Result<()> {
    let base_url = config::resolve_upstream_base_url(&config)
        .context("upstream base URL not configured (set upstream.baseUrl or UPSTREAM_BASE_URL)")?;
    let upstream = Arc::new(UpstreamClient::new(base_url));

    let telegram_token = config::resolve_telegram_token(&config);
    let telegram = Arc::new(TelegramChannel::new(telegram_token));
    let tick = Duration::from_millis(config.actions.tick_ms);
    let transport: Arc<dyn Transport> = telegram.clone();
    let router = Arc::new(Router::new(transport, upstream, tick));

    let (inbound_tx, mut inbound_rx) = mpsc::channel::<InboundMessage>(64);

    {
        let router = router.clone();
        tokio::spawn(async move {
            while let Some(msg) = inbound_rx.recv().await {
                router.dispatch(msg).await;
            }
        });
    }

    let mut channel_tasks: Vec<JoinHandle<()>> = Vec::new();
    let webhook_url = config.channels.telegram.webhook_url.clone();
    let mut webhook_registered = false;
    if telegram.has_token() {
        if let Some(ref url) = webhook_url {
            let secret = config.channels.telegram.webhook_secret.as_deref();
            if let Err(e) = telegram.set_webhook(url, secret).await {
                log::warn!("telegram set_webhook failed: {}", e);
            } else {
                log::info!("telegram channel registered (webhook mode): {}", url);
                webhook_registered = true;
            }
        } else {
            channel_tasks.push(telegram.clone().start_inbound(inbound_tx.clone()));
            log::info!("telegram channel registered and getUpdates loop started");
        }
    } else {
        log::warn!("telegram bot token not configured; channel disabled");
    }

    let state = ServerState {
        config: Arc::new(config.clone()),
        inbound_tx,
    };
    let app = HttpRouter::new()
        .route("/", get(health_http))
        .route("/telegram/webhook", post(telegram_webhook))
        .with_state(state);

    let bind_addr = format!("{}:{}", config.server.bind.trim(), config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(
            telegram,
            channel_tasks,
            webhook_registered,
        ))
        .await
        .context("server exited")?;
    log::info!("server stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or
/// SIGTERM). Stops the channel connector, removes the Telegram webhook if
/// one was registered, then awaits in-process channel tasks.
async fn shutdown_signal(
    telegram: Arc<TelegramChannel>,
    channel_tasks: Vec<JoinHandle<()>>,
    webhook_registered: bool,
) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, stopping channel connector");

    telegram.stop();
    if webhook_registered {
        if let Err(e) = telegram.delete_webhook().await {
            log::debug!("telegram delete_webhook on shutdown: {}", e);
        }
    }

    for handle in channel_tasks {
        let _ = handle.await;
    }
    log::info!("channel tasks finished");
}

/// POST /telegram/webhook — receives Telegram update JSON; verifies optional
/// secret, pushes the inbound message to the dispatch loop.
async fn telegram_webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(ref expected) = state.config.channels.telegram.webhook_secret {
        let provided = headers
            .get("X-Telegram-Bot-Api-Secret-Token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.as_str() {
            return StatusCode::FORBIDDEN;
        }
    }
    let update: TelegramUpdate = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(_) => return StatusCode::BAD_REQUEST,
    };
    let Some(inbound) = crate::channels::inbound_from_update(&update) else {
        return StatusCode::OK;
    };
    if state.inbound_tx.send(inbound).await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}

/// GET / returns a fixed 200 text body (for deployment liveness probes).
async fn health_http() -> &'static str {
    "ok"
}
