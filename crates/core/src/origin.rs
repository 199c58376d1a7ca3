use crate::{error::CorsResult, options::OriginSpec};

/// The value written to `Access-Control-Allow-Origin` for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginDecision {
    /// `*`, no `Vary` contribution.
    Any,
    /// A configured literal origin.
    Literal(String),
    /// The request origin passed the check and is echoed back. `None` when the request
    /// carried no `Origin` header.
    Reflect(Option<String>),
    /// The request origin failed the check; written as the literal `false`.
    Denied,
}

impl OriginDecision {
    pub fn header_value(&self) -> Option<&str> {
        match self {
            OriginDecision::Any => Some("*"),
            OriginDecision::Literal(origin) => Some(origin),
            OriginDecision::Reflect(origin) => origin.as_deref(),
            OriginDecision::Denied => Some("false"),
        }
    }

    /// Whether the response must carry `Vary: Origin`.
    pub fn varies(&self) -> bool {
        !matches!(self, OriginDecision::Any)
    }
}

/// Recursive membership check of `request_origin` against `spec`.
pub fn is_allowed(request_origin: Option<&str>, spec: &OriginSpec) -> bool {
    match spec {
        OriginSpec::List(list) => list.iter().any(|s| is_allowed(request_origin, s)),
        OriginSpec::Exact(allowed) => request_origin == Some(allowed.as_str()),
        OriginSpec::Pattern(re) => request_origin.is_some_and(|o| re.is_match(o)),
        other => other.is_truthy(),
    }
}

pub fn evaluate(configured: &OriginSpec, request_origin: Option<&str>) -> OriginDecision {
    match configured {
        OriginSpec::Exact(s) if s.is_empty() || s == "*" => OriginDecision::Any,
        OriginSpec::Bool(false) => OriginDecision::Any,
        OriginSpec::Exact(s) => OriginDecision::Literal(s.clone()),
        spec if is_allowed(request_origin, spec) => {
            OriginDecision::Reflect(request_origin.map(str::to_string))
        }
        _ => OriginDecision::Denied,
    }
}

/// Outer origin stage: turns the configured spec into the one used for header
/// composition, running a delegate if needed. `None` means no CORS headers at all.
pub async fn resolve(
    configured: &OriginSpec,
    request_origin: Option<&str>,
) -> CorsResult<Option<OriginSpec>> {
    if !configured.is_truthy() {
        return Ok(None);
    }
    let spec = match configured {
        OriginSpec::Delegate(delegate) => delegate.origin(request_origin).await?,
        other => Some(other.clone()),
    };
    Ok(spec.filter(OriginSpec::is_truthy))
}
