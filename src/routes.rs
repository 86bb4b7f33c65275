use axum::{
    extract::State,
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use crate::app_state::AppState;
use crate::ws::ws_handler;

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.config.allowed_origin.as_deref());
    let static_dir = state.config.static_dir.clone();

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler));

    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    )
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST]);
    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(AllowOrigin::exact(origin)),
        Some(Err(_)) => {
            warn!("ALLOWED_ORIGIN не является корректным заголовком, CORS закрыт");
            layer
        }
        None => layer.allow_origin(Any),
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "rooms": state.admission.room_count().await,
        "pending": state.admission.pending_count().await,
        "connections": state.hub.connection_count().await,
    }))
}
