use anyhow::Context;
use axum::http::{header, Method};
use axum::response::{IntoResponse, Response};
use axum::{extract::FromRef, middleware, routing::get, Router};
use prometheus::{Encoder, TextEncoder};
use routes::{category_router, questions_router, quizzes_router, ApiResponse};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::error::{mirror_logical_status, ApiError};
use super::routes;
use crate::configuration::ApplicationSettings;

/// Number of questions per page of `GET /questions`.
#[derive(Clone, Copy, Debug)]
pub struct PageSize(pub i64);

#[derive(FromRef, Clone)]
pub struct AppState {
    pool: SqlitePool,
    page_size: PageSize,
}

impl AppState {
    pub fn new(pool: SqlitePool, settings: &ApplicationSettings) -> Self {
        Self {
            pool,
            page_size: PageSize(settings.questions_per_page),
        }
    }
}

pub fn app(pool: SqlitePool, settings: &ApplicationSettings) -> Router {
    let state = AppState::new(pool, settings);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::PUT,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let mut app = Router::new()
        .route("/metrics", get(metrics))
        .merge(category_router(state.clone()))
        .merge(questions_router(state.clone()))
        .merge(quizzes_router(state))
        .fallback(|| async {
            tracing::info!("Fallback");
            ApiError::NotFound
        });
    if settings.mirror_status_codes {
        app = app.layer(middleware::map_response(mirror_logical_status));
    }
    app.layer(cors).layer(TraceLayer::new_for_http())
}

pub async fn run_server(pool: SqlitePool, settings: ApplicationSettings) -> anyhow::Result<()> {
    let addr = settings.address();
    let app = app(pool, &settings);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Serving on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics() -> ApiResponse<Response> {
    let encoder = TextEncoder::new();
    let metrics = prometheus::gather();
    let mut buf = vec![];
    encoder.encode(&metrics, &mut buf)?;
    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_owned())],
        buf,
    )
        .into_response())
}
