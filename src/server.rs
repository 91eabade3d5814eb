use crate::config::Config;
use crate::config_validator::ConfigValidator;
use crate::error::Result;
use crate::handlers::{
    category_with_products, delete_rating, health_check, list_categories, list_products,
    list_ratings, list_sub_categories, list_vendors, metrics, my_rating, readiness_check,
    submit_rating,
};
use crate::health;
use crate::middleware::logging_middleware;
use crate::state::{AppState, SharedState};
use axum::routing::{delete, get};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the router over already constructed state
pub fn create_app(state: SharedState) -> Router {
    Router::new()
        // Catalog
        .route("/api/vendors", get(list_vendors))
        .route("/api/users", get(list_vendors))
        .route("/api/products", get(list_products))
        .route("/api/categories", get(list_categories))
        .route("/api/sub-categories", get(list_sub_categories))
        .route(
            "/api/categories-with-products/:category_id",
            get(category_with_products),
        )
        // Ratings
        .route(
            "/api/products/:product_id/ratings",
            get(list_ratings).post(submit_rating),
        )
        .route("/api/products/:product_id/my-rating", get(my_rating))
        .route("/api/ratings/:rating_id", delete(delete_rating))
        // Health, readiness and metrics endpoints
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(logging_middleware)),
        )
}

pub struct Server {
    app: Router,
    bind_addr: SocketAddr,
}

impl Server {
    pub async fn new(config: Config) -> Result<Self> {
        ConfigValidator::validate(&config)?;
        health::mark_started();

        let state = Arc::new(AppState::from_config(&config).await?);
        let app = create_app(state);

        Ok(Self {
            app,
            bind_addr: config.bind_addr,
        })
    }

    pub async fn run(self) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        tracing::info!("Storefront proxy listening on {}", self.bind_addr);
        tracing::info!("Health check available at /health");
        tracing::info!("Readiness check available at /ready");

        // Run server with graceful shutdown
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
