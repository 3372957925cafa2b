//! Prometheus metrics for the game server
//!
//! Counters are kept in a private registry and can be scraped over HTTP
//! (see [`serve`]).

use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tokio::net::TcpListener;
use tracing::{info, warn};
use walle_core::{Action, GameStatus};

/// How a single action request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    Won,
    Lost,
    NoOp,
}

impl ActionOutcome {
    /// Classify an action from its result and the status before and after
    pub fn classify(success: bool, before: GameStatus, after: GameStatus) -> Self {
        match (success, after) {
            (true, GameStatus::Won) => ActionOutcome::Won,
            (true, _) => ActionOutcome::Success,
            (false, GameStatus::Lost) if before == GameStatus::InProgress => ActionOutcome::Lost,
            (false, _) => ActionOutcome::NoOp,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActionOutcome::Success => "success",
            ActionOutcome::Won => "won",
            ActionOutcome::Lost => "lost",
            ActionOutcome::NoOp => "noop",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    games_created: IntCounter,
    games_removed: IntCounter,
    actions: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let games_created = IntCounter::with_opts(Opts::new(
            "walle_games_created_total",
            "Number of games created",
        ))?;
        let games_removed = IntCounter::with_opts(Opts::new(
            "walle_games_removed_total",
            "Number of games removed from the registry",
        ))?;
        let actions = IntCounterVec::new(
            Opts::new("walle_actions_total", "Robot actions by kind and outcome"),
            &["action", "outcome"],
        )?;

        registry.register(Box::new(games_created.clone()))?;
        registry.register(Box::new(games_removed.clone()))?;
        registry.register(Box::new(actions.clone()))?;

        Ok(Self {
            registry,
            games_created,
            games_removed,
            actions,
        })
    }

    pub fn record_game_created(&self) {
        self.games_created.inc();
    }

    pub fn record_game_removed(&self) {
        self.games_removed.inc();
    }

    pub fn record_action(&self, action: Action, outcome: ActionOutcome) {
        self.actions
            .with_label_values(&[action.name(), outcome.label()])
            .inc();
    }

    pub fn games_created(&self) -> u64 {
        self.games_created.get()
    }

    pub fn games_removed(&self) -> u64 {
        self.games_removed.get()
    }

    pub fn actions(&self, action: Action, outcome: ActionOutcome) -> u64 {
        self.actions
            .with_label_values(&[action.name(), outcome.label()])
            .get()
    }

    /// Prometheus text exposition of every registered metric
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// HTTP routes for scraping: `GET /metrics` only
pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(scrape))
        .with_state(metrics)
}

async fn scrape(State(metrics): State<Arc<Metrics>>) -> Response {
    match metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            warn!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Serve [`router`] on `listener` until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    metrics: Arc<Metrics>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "metrics endpoint listening");

    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(shutdown)
        .await
}
