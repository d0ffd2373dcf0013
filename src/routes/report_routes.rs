use crate::AppState;
use crate::handlers::report_handler::{
    delete_report, get_report, health, list_reports, method_not_allowed, notify_report,
    submit_report,
};
use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{MethodRouter, delete, get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// All report routes, without middleware. Each handler answers on its
/// current path and on the path the first deployment used.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/submit-report", json_405(post(submit_report)))
        .route("/api/enviar-reporte-dsme", json_405(post(submit_report)))
        .route("/api/notify-report", json_405(post(notify_report)))
        .route("/api/enviar-reporte-personal", json_405(post(notify_report)))
        .route("/api/get-report", json_405(get(get_report)))
        .route("/api/get-reporte-individual", json_405(get(get_report)))
        .route("/api/list-reports", json_405(get(list_reports)))
        .route("/api/get-reportes-empresa", json_405(get(list_reports)))
        .route("/api/delete-report", json_405(delete(delete_report)))
        .route("/api/eliminar-reporte", json_405(delete(delete_report)))
        .with_state(state)
}

// Wrong methods get the JSON 405 body instead of axum's empty one.
fn json_405(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(method_not_allowed)
}

/// The full application: routes plus CORS and request tracing.
pub fn app(state: AppState, cors_allow_origin: Option<&str>) -> Router {
    router(state)
        .layer(cors_layer(cors_allow_origin))
        .layer(TraceLayer::new_for_http())
}

pub fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let origin = match allow_origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(e)) => {
            tracing::warn!("invalid CORS_ALLOW_ORIGIN ({}), allowing any origin", e);
            AllowOrigin::any()
        }
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}
