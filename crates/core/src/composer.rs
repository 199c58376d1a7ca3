//! Turns resolved options plus a view of the request into the header writes for the
//! response. Each step is a plain function; `Vary` contributions are threaded through a
//! [`VaryAccumulator`] and emitted once at the end of the pass.

use tracing::debug;

use crate::{
    context::CorsContext,
    options::{HeaderList, ResolvedCorsOptions},
    origin,
    vary::VaryAccumulator,
};

pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";
pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
pub const MAX_AGE: &str = "Access-Control-Max-Age";
pub const EXPOSE_HEADERS: &str = "Access-Control-Expose-Headers";
pub const VARY: &str = "Vary";
pub const CONTENT_LENGTH: &str = "Content-Length";

pub const ORIGIN: &str = "Origin";
pub const REQUEST_HEADERS: &str = "Access-Control-Request-Headers";

/// What the binding does after the headers are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Hand the request to the next handler.
    Continue,
    /// The response is finished, no further handler runs.
    Complete,
}

/// The request-side inputs the composer reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestView<'a> {
    pub method: &'a str,
    pub origin: Option<&'a str>,
    pub request_headers: Option<&'a str>,
    /// `Vary` already present on the response before composition.
    pub vary: Option<&'a str>,
}

impl<'a> RequestView<'a> {
    pub fn from_context<C: CorsContext + ?Sized>(ctx: &'a C) -> Self {
        Self {
            method: ctx.request_method(),
            origin: ctx.request_header(ORIGIN),
            request_headers: ctx.request_header(REQUEST_HEADERS),
            vary: ctx.response_header(VARY),
        }
    }

    pub fn is_preflight(&self) -> bool {
        self.method.eq_ignore_ascii_case("OPTIONS")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderWrite {
    pub name: &'static str,
    pub value: String,
}

impl HeaderWrite {
    fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self { name, value: value.into() }
    }
}

/// The full set of effects of one composition pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPlan {
    pub headers: Vec<HeaderWrite>,
    pub status: Option<u16>,
    pub outcome: Outcome,
}

impl HeaderPlan {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Writes the plan through `ctx` and returns what the binding should do next.
    pub fn apply<C: CorsContext + ?Sized>(self, ctx: &mut C) -> Outcome {
        for header in &self.headers {
            ctx.set_response_header(header.name, &header.value);
        }
        if let Some(status) = self.status {
            ctx.set_status(status);
        }
        if self.outcome == Outcome::Complete {
            ctx.end_response();
        }
        self.outcome
    }
}

type Step = fn(&ResolvedCorsOptions, &RequestView<'_>, &mut VaryAccumulator) -> Option<HeaderWrite>;

const PREFLIGHT_STEPS: &[Step] = &[
    configure_origin,
    configure_credentials,
    configure_methods,
    configure_allowed_headers,
    configure_max_age,
    configure_exposed_headers,
];

const SIMPLE_STEPS: &[Step] = &[configure_origin, configure_credentials, configure_exposed_headers];

pub fn compose(options: &ResolvedCorsOptions, request: &RequestView<'_>) -> HeaderPlan {
    let preflight = request.is_preflight();
    let steps = if preflight { PREFLIGHT_STEPS } else { SIMPLE_STEPS };

    let mut vary = VaryAccumulator::new(request.vary);
    let mut headers: Vec<HeaderWrite> =
        steps.iter().filter_map(|step| step(options, request, &mut vary)).collect();
    if let Some(value) = vary.finish() {
        headers.push(HeaderWrite::new(VARY, value));
    }

    if !preflight {
        debug!(method = request.method, "cors simple request");
        return HeaderPlan { headers, status: None, outcome: Outcome::Continue };
    }

    if options.preflight_continue {
        debug!("cors preflight handed to next handler");
        HeaderPlan { headers, status: None, outcome: Outcome::Continue }
    } else {
        debug!(status = options.options_success_status, "cors preflight answered");
        headers.push(HeaderWrite::new(CONTENT_LENGTH, "0"));
        HeaderPlan {
            headers,
            status: Some(options.options_success_status),
            outcome: Outcome::Complete,
        }
    }
}

fn configure_origin(
    options: &ResolvedCorsOptions,
    request: &RequestView<'_>,
    vary: &mut VaryAccumulator,
) -> Option<HeaderWrite> {
    let decision = origin::evaluate(&options.origin, request.origin);
    if decision.varies() {
        vary.add(ORIGIN);
    }
    decision.header_value().map(|v| HeaderWrite::new(ALLOW_ORIGIN, v))
}

fn configure_credentials(
    options: &ResolvedCorsOptions,
    _request: &RequestView<'_>,
    _vary: &mut VaryAccumulator,
) -> Option<HeaderWrite> {
    options.credentials.then(|| HeaderWrite::new(ALLOW_CREDENTIALS, "true"))
}

fn configure_methods(
    options: &ResolvedCorsOptions,
    _request: &RequestView<'_>,
    _vary: &mut VaryAccumulator,
) -> Option<HeaderWrite> {
    Some(HeaderWrite::new(ALLOW_METHODS, options.methods.joined()))
}

fn configure_allowed_headers(
    options: &ResolvedCorsOptions,
    request: &RequestView<'_>,
    vary: &mut VaryAccumulator,
) -> Option<HeaderWrite> {
    let value = match &options.allowed_headers {
        Some(list) if *list != HeaderList::One(String::new()) => list.joined(),
        _ => {
            vary.add(REQUEST_HEADERS);
            request.request_headers.unwrap_or_default().to_string()
        }
    };
    (!value.is_empty()).then(|| HeaderWrite::new(ALLOW_HEADERS, value))
}

fn configure_max_age(
    options: &ResolvedCorsOptions,
    _request: &RequestView<'_>,
    _vary: &mut VaryAccumulator,
) -> Option<HeaderWrite> {
    let value = options.max_age.as_ref()?.header_value()?;
    Some(HeaderWrite::new(MAX_AGE, value))
}

fn configure_exposed_headers(
    options: &ResolvedCorsOptions,
    _request: &RequestView<'_>,
    _vary: &mut VaryAccumulator,
) -> Option<HeaderWrite> {
    let exposed = options.exposed_headers.as_ref().filter(|list| !list.is_empty())?;
    Some(HeaderWrite::new(EXPOSE_HEADERS, exposed.joined()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::testing::RecordingContext,
        options::{CorsConfig, MaxAge},
    };
    use regex::Regex;

    fn resolved(config: CorsConfig) -> ResolvedCorsOptions {
        ResolvedCorsOptions::resolve(config)
    }

    fn get(origin: &str) -> RequestView<'_> {
        RequestView { method: "GET", origin: Some(origin), ..Default::default() }
    }

    fn options_req<'a>(origin: &'a str, request_headers: Option<&'a str>) -> RequestView<'a> {
        RequestView { method: "OPTIONS", origin: Some(origin), request_headers, vary: None }
    }

    #[test]
    fn default_simple_request_gets_wildcard_without_vary() {
        let plan = compose(&ResolvedCorsOptions::default(), &get("http://x.com"));
        assert_eq!(plan.header(ALLOW_ORIGIN), Some("*"));
        assert_eq!(plan.header(VARY), None);
        assert_eq!(plan.header(ALLOW_METHODS), None);
        assert_eq!(plan.outcome, Outcome::Continue);
        assert_eq!(plan.status, None);
    }

    #[test]
    fn literal_origin_adds_vary() {
        let plan = compose(&resolved(CorsConfig::new().origin("http://example.com")), &get("http://x.com"));
        assert_eq!(plan.header(ALLOW_ORIGIN), Some("http://example.com"));
        assert_eq!(plan.header(VARY), Some("Origin"));
    }

    #[test]
    fn pattern_origin_reflects_or_writes_false() {
        let opts = resolved(CorsConfig::new().origin(Regex::new(r"example\.com$").unwrap()));

        let plan = compose(&opts, &get("http://a.example.com"));
        assert_eq!(plan.header(ALLOW_ORIGIN), Some("http://a.example.com"));
        assert_eq!(plan.header(VARY), Some("Origin"));

        let plan = compose(&opts, &get("http://other.org"));
        assert_eq!(plan.header(ALLOW_ORIGIN), Some("false"));
        assert_eq!(plan.header(VARY), Some("Origin"));
    }

    #[test]
    fn simple_request_only_sets_origin_credentials_and_exposed() {
        let opts = resolved(
            CorsConfig::new()
                .credentials(true)
                .exposed_headers(["X-Total-Count", "X-Page"])
                .allowed_headers("X-Foo")
                .max_age(MaxAge::Seconds(600)),
        );
        let plan = compose(&opts, &get("http://x.com"));
        let names: Vec<_> = plan.headers.iter().map(|h| h.name).collect();
        assert_eq!(names, vec![ALLOW_ORIGIN, ALLOW_CREDENTIALS, EXPOSE_HEADERS]);
        assert_eq!(plan.header(EXPOSE_HEADERS), Some("X-Total-Count,X-Page"));
    }

    #[test]
    fn preflight_default_completes_with_204() {
        let plan = compose(&ResolvedCorsOptions::default(), &options_req("http://x.com", None));
        assert_eq!(plan.outcome, Outcome::Complete);
        assert_eq!(plan.status, Some(204));
        assert_eq!(plan.header(CONTENT_LENGTH), Some("0"));
        assert_eq!(plan.header(ALLOW_METHODS), Some("GET,HEAD,PUT,PATCH,POST,DELETE"));
        assert_eq!(plan.header(ALLOW_HEADERS), None);
        assert_eq!(plan.header(VARY), Some("Access-Control-Request-Headers"));
    }

    #[test]
    fn preflight_skips_non_numeric_max_age() {
        let plan = compose(&resolved(CorsConfig::new().max_age("ten minutes")), &options_req("http://x.com", None));
        assert_eq!(plan.header(MAX_AGE), None);

        let plan = compose(&resolved(CorsConfig::new().max_age("120")), &options_req("http://x.com", None));
        assert_eq!(plan.header(MAX_AGE), Some("120"));
    }

    #[test]
    fn preflight_header_order() {
        let opts = resolved(
            CorsConfig::new()
                .origin(vec!["http://x.com"])
                .credentials(true)
                .allowed_headers("Content-Type")
                .max_age("3600")
                .exposed_headers("X-Id"),
        );
        let plan = compose(&opts, &options_req("http://x.com", None));
        let names: Vec<_> = plan.headers.iter().map(|h| h.name).collect();
        assert_eq!(
            names,
            vec![
                ALLOW_ORIGIN,
                ALLOW_CREDENTIALS,
                ALLOW_METHODS,
                ALLOW_HEADERS,
                MAX_AGE,
                EXPOSE_HEADERS,
                VARY,
                CONTENT_LENGTH
            ]
        );
        assert_eq!(plan.header(MAX_AGE), Some("3600"));
        assert_eq!(plan.header(VARY), Some("Origin"));
    }

    #[test]
    fn preflight_reflects_requested_headers() {
        let opts = resolved(CorsConfig::new().origin(vec!["http://x.com"]));
        let plan = compose(&opts, &options_req("http://x.com", Some("X-Foo")));
        assert_eq!(plan.header(ALLOW_HEADERS), Some("X-Foo"));
        assert_eq!(plan.header(VARY), Some("Origin, Access-Control-Request-Headers"));
    }

    #[test]
    fn empty_allowed_headers_string_reflects() {
        let opts = resolved(CorsConfig::new().allowed_headers(""));
        let plan = compose(&opts, &options_req("http://x.com", Some("X-Bar")));
        assert_eq!(plan.header(ALLOW_HEADERS), Some("X-Bar"));
    }

    #[test]
    fn empty_allowed_headers_list_sends_nothing() {
        let opts = resolved(CorsConfig { allowed_headers: Some(HeaderList::Many(vec![])), ..Default::default() });
        let plan = compose(&opts, &options_req("http://x.com", Some("X-Bar")));
        assert_eq!(plan.header(ALLOW_HEADERS), None);
        assert_eq!(plan.header(VARY), None);
    }

    #[test]
    fn preflight_continue_leaves_status_alone() {
        let opts = resolved(CorsConfig::new().preflight_continue(true));
        let plan = compose(&opts, &options_req("http://x.com", None));
        assert_eq!(plan.outcome, Outcome::Continue);
        assert_eq!(plan.status, None);
        assert_eq!(plan.header(CONTENT_LENGTH), None);
        assert!(plan.header(ALLOW_METHODS).is_some());
    }

    #[test]
    fn method_is_matched_case_insensitively() {
        let request = RequestView { method: "options", ..Default::default() };
        assert!(request.is_preflight());
        let plan = compose(&ResolvedCorsOptions::default(), &request);
        assert_eq!(plan.outcome, Outcome::Complete);
    }

    #[test]
    fn custom_success_status() {
        let opts = resolved(CorsConfig::new().options_success_status(200));
        let plan = compose(&opts, &options_req("http://x.com", None));
        assert_eq!(plan.status, Some(200));
    }

    #[test]
    fn existing_vary_is_extended() {
        let opts = resolved(CorsConfig::new().origin("http://example.com"));
        let request = RequestView { method: "GET", origin: None, request_headers: None, vary: Some("Accept-Encoding") };
        let plan = compose(&opts, &request);
        assert_eq!(plan.header(VARY), Some("Accept-Encoding, Origin"));

        let request = RequestView { vary: Some("*"), ..request };
        assert_eq!(compose(&opts, &request).header(VARY), None);
    }

    #[test]
    fn apply_writes_through_context() {
        let mut ctx = RecordingContext::new("OPTIONS").with_header("Origin", "http://x.com");
        let plan = compose(&ResolvedCorsOptions::default(), &RequestView::from_context(&ctx));
        let outcome = plan.apply(&mut ctx);
        assert_eq!(outcome, Outcome::Complete);
        assert!(ctx.ended);
        assert_eq!(ctx.status, Some(204));
        assert_eq!(ctx.header("access-control-allow-origin"), Some("*"));
        assert_eq!(ctx.header("content-length"), Some("0"));
    }
}
