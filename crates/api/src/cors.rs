use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    Router,
};
use cors_core::{config::AppConfig, vary, Cors, CorsContext, CorsResult, Outcome};
use tracing::warn;

/// The engine as mounted on axum routes. Options delegates see the request head.
pub type SharedCors = Arc<Cors<Parts>>;

pub fn build_cors(cfg: &AppConfig) -> CorsResult<Cors<Parts>> {
    Ok(Cors::new(cfg.cors.to_cors_config()?))
}

/// Wraps every route of `router` (fallback included) in the CORS middleware.
pub fn with_cors<S>(router: Router<S>, cors: Cors<Parts>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(Arc::new(cors), cors_middleware))
}

/// Request head plus the response headers and status staged by the engine.
pub struct HttpCorsContext<'a> {
    parts: &'a Parts,
    headers: HeaderMap,
    status: Option<StatusCode>,
}

impl<'a> HttpCorsContext<'a> {
    pub fn new(parts: &'a Parts) -> Self {
        Self { parts, headers: HeaderMap::new(), status: None }
    }
}

impl CorsContext for HttpCorsContext<'_> {
    fn request_method(&self) -> &str { self.parts.method.as_str() }

    fn request_header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn response_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn set_response_header(&mut self, name: &str, value: &str) {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!(header = name, "dropping cors header that is not a valid header value"),
        }
    }

    fn set_status(&mut self, code: u16) {
        match StatusCode::from_u16(code) {
            Ok(status) => self.status = Some(status),
            Err(_) => warn!(code, "ignoring invalid preflight status"),
        }
    }
}

pub async fn cors_middleware(State(cors): State<SharedCors>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let mut ctx = HttpCorsContext::new(&parts);
    let outcome = cors.handle(&parts, &mut ctx).await;
    let HttpCorsContext { headers: staged, status, .. } = ctx;

    match outcome {
        Outcome::Complete => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = status.unwrap_or(StatusCode::NO_CONTENT);
            *response.headers_mut() = staged;
            response
        }
        Outcome::Continue => {
            let mut response = next.run(Request::from_parts(parts, body)).await;
            merge_staged(response.headers_mut(), &staged);
            response
        }
    }
}

/// Headers the handler set itself win, except `Vary` which is merged.
fn merge_staged(target: &mut HeaderMap, staged: &HeaderMap) {
    for (name, value) in staged {
        if name == header::VARY {
            let Some(existing) = target.get(header::VARY).and_then(|v| v.to_str().ok()) else {
                target.insert(header::VARY, value.clone());
                continue;
            };
            let merged = vary::append(existing, value.to_str().unwrap_or_default());
            if let Ok(merged) = HeaderValue::from_str(&merged) {
                target.insert(header::VARY, merged);
            }
        } else if !target.contains_key(name) {
            target.insert(name.clone(), value.clone());
        }
    }
}
