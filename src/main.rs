//! merit-engine server entry point.
//!
//! Starts the Axum HTTP server over the PostgreSQL-backed store.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use merit_engine::api;
use merit_engine::app_state::AppState;
use merit_engine::config::EngineConfig;
use merit_engine::domain::{BadgeRuleSet, EventBus};
use merit_engine::persistence::{EngineStore, PostgresStore};
use merit_engine::service::{
    ActivityService, BadgeService, EvaluationService, HttpRemoteEvaluator, LeaderboardService,
    PointsService, RemoteEvaluator, SyntheticRankGenerator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = EngineConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting merit-engine");

    // Connect to PostgreSQL and run embedded migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!().run(&pool).await?;

    let store: Arc<dyn EngineStore> = Arc::new(PostgresStore::new(pool));
    let rules = Arc::new(BadgeRuleSet::standard());
    let event_bus = EventBus::new(config.event_bus_capacity);

    // Remote evaluator is optional: unset URL means local-only.
    let remote: Option<Arc<dyn RemoteEvaluator>> = config.remote_evaluator_url.clone().map(|url| {
        Arc::new(HttpRemoteEvaluator::new(
            url,
            config.remote_evaluator_token.clone(),
        )) as Arc<dyn RemoteEvaluator>
    });
    if remote.is_none() {
        tracing::info!("no remote evaluator configured, evaluations run locally");
    }

    let synthetic = config.leaderboard_synthetic_enabled.then(|| {
        Arc::new(SyntheticRankGenerator::new(
            config.leaderboard_base_points,
            config.leaderboard_point_decrement,
        )) as Arc<dyn merit_engine::service::RankGenerator>
    });

    // Build service layer
    let badge_service = BadgeService::new(
        Arc::clone(&store),
        Arc::clone(&rules),
        event_bus.clone(),
    );
    let evaluation_service = EvaluationService::new(
        Arc::clone(&store),
        Arc::clone(&rules),
        badge_service.clone(),
        remote,
        config.remote_timeout(),
        event_bus.clone(),
    );
    let activity_service = ActivityService::new(Arc::clone(&store), event_bus.clone());
    let leaderboard_service = LeaderboardService::new(Arc::clone(&store), synthetic);
    let points_service = PointsService::new(Arc::clone(&store), event_bus.clone());

    // Log engine events as they happen
    spawn_event_logger(&event_bus);

    // Build application state
    let app_state = AppState {
        activity_service: Arc::new(activity_service),
        evaluation_service: Arc::new(evaluation_service),
        badge_service: Arc::new(badge_service),
        leaderboard_service: Arc::new(leaderboard_service),
        points_service: Arc::new(points_service),
        event_bus,
    };

    // Build router
    #[allow(unused_mut)]
    let mut app = api::build_router();
    #[cfg(feature = "swagger-ui")]
    {
        app = app.merge(api::swagger_router());
    }
    let app: Router = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Subscribes to the event bus and logs every engine event.
fn spawn_event_logger(event_bus: &merit_engine::domain::EventBus) {
    let mut events = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    tracing::debug!(
                        user_id = %event.user_id(),
                        event = event.event_type_str(),
                        "engine event"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event logger lagged behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
