use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use interview_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    // Countdown worker: once a minute, route every session whose time budget
    // ran out through the termination path. A submission arriving on an
    // expired session is caught there as well, so a missed tick cannot keep
    // an interview alive.
    {
        let state = app_state.clone();
        tokio::spawn(async move {
            loop {
                let expired = state.session_service.expire_overdue().await;
                if expired > 0 {
                    info!(expired, "expired overdue interview sessions");
                }
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let public_api = Router::new()
        .route(
            "/api/interview/start",
            post(routes::interview::start_interview),
        )
        .route(
            "/api/interview/:id/answer",
            post(routes::interview::submit_answer),
        )
        .route(
            "/api/interview/:id/end",
            post(routes::interview::end_interview),
        )
        .route(
            "/api/interview/:id/status",
            get(routes::interview::get_status),
        )
        .route(
            "/api/interview/reports/:id",
            get(routes::interview::get_report),
        )
        .route("/api/resume/analyze", post(routes::resume::analyze_resume))
        .route(
            "/api/user/:external_id/recent",
            get(routes::user::recent_activity),
        )
        .layer(axum::middleware::from_fn_with_state(
            interview_backend::middleware::rate_limit::RateLimiter::new(config.public_rps),
            interview_backend::middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(public_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
