use std::{net::SocketAddr, sync::Arc};
use axum::{http::{self, request::Parts}, Router};
use tower::{limit::ConcurrencyLimitLayer, ServiceBuilder};
use tower_http::request_id::{RequestId, MakeRequestId};
use tower_http::{trace::TraceLayer, request_id::{PropagateRequestIdLayer, SetRequestIdLayer}, limit::RequestBodyLimitLayer};
use cors_core::{config::AppConfig, Cors};
use http::header::HeaderName;
use crate::{state::AppState, cors::{build_cors, with_cors}, routes, observability::REQUEST_ID_HEADER};
use uuid::Uuid;

#[derive(Clone)]
struct MakeRequestUuid;
impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        http::HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Books API with CORS configured from `cfg.cors`.
pub fn build_app(cfg: Arc<AppConfig>) -> anyhow::Result<Router> {
    let cors = build_cors(&cfg)?;
    Ok(build_app_with(cfg, cors))
}

/// Books API with the given CORS engine applied to every route.
pub fn build_app_with(cfg: Arc<AppConfig>, cors: Cors<Parts>) -> Router {
    let state = AppState::new(cfg);
    let router = with_cors(routes::routes(), cors).with_state(state.clone());
    wrap_common(router, state.config())
}

/// Books API where only `/book/:id` carries CORS headers.
pub fn build_app_single_route(cfg: Arc<AppConfig>, cors: Cors<Parts>) -> Router {
    let state = AppState::new(cfg);
    let book_by_id = with_cors(
        Router::new().route(
            "/book/:id",
            axum::routing::get(|| async { "cors enabled for this route only" }),
        ),
        cors,
    );
    let router = Router::new()
        .route("/book", axum::routing::get(|| async { "no cors here" }))
        .merge(book_by_id)
        .with_state(state.clone());
    wrap_common(router, state.config())
}

fn wrap_common(router: Router, cfg: &AppConfig) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &http::Request<_>| {
            let method = req.method().clone();
            let uri = req.uri().path().to_string();
            tracing::info_span!("request", %method, %uri, status = tracing::field::Empty)
        })
        .on_response(|res: &http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
            let status = res.status().as_u16();
            span.record("status", tracing::field::display(status));
            tracing::info!(parent: span, status, latency_ms = latency.as_millis(), "request.completed");
        });
    let body_limit = RequestBodyLimitLayer::new(cfg.http.max_request_size_bytes as usize);

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id_header.clone(), MakeRequestUuid))
        .layer(PropagateRequestIdLayer::new(request_id_header))
        .layer(trace)
        .layer(body_limit)
        .layer(ConcurrencyLimitLayer::new(cfg.http.concurrency_limit));

    router.layer(middleware)
}

pub fn server_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.app.host, cfg.app.port).parse()?)
}
