use std::{fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use regex::Regex;

use crate::error::CorsResult;

pub const DEFAULT_ORIGIN: &str = "*";
pub const DEFAULT_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";
pub const DEFAULT_OPTIONS_SUCCESS_STATUS: u16 = 204;

/// Which origins may read the response.
#[derive(Clone)]
pub enum OriginSpec {
    Bool(bool),
    Exact(String),
    Pattern(Regex),
    List(Vec<OriginSpec>),
    /// Resolved against the request `Origin` before headers are composed.
    Delegate(Arc<dyn OriginDelegate>),
}

impl OriginSpec {
    pub fn any() -> Self {
        OriginSpec::Exact(DEFAULT_ORIGIN.to_string())
    }

    pub fn delegate<D: OriginDelegate>(delegate: D) -> Self {
        OriginSpec::Delegate(Arc::new(delegate))
    }

    /// `false` and the empty string switch CORS off for the request.
    pub fn is_truthy(&self) -> bool {
        match self {
            OriginSpec::Bool(b) => *b,
            OriginSpec::Exact(s) => !s.is_empty(),
            OriginSpec::Pattern(_) | OriginSpec::List(_) | OriginSpec::Delegate(_) => true,
        }
    }
}

impl fmt::Debug for OriginSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginSpec::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            OriginSpec::Exact(s) => f.debug_tuple("Exact").field(s).finish(),
            OriginSpec::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            OriginSpec::List(list) => f.debug_tuple("List").field(list).finish(),
            OriginSpec::Delegate(_) => write!(f, "Delegate(<function>)"),
        }
    }
}

impl From<bool> for OriginSpec {
    fn from(b: bool) -> Self { OriginSpec::Bool(b) }
}

impl From<&str> for OriginSpec {
    fn from(s: &str) -> Self { OriginSpec::Exact(s.to_string()) }
}

impl From<String> for OriginSpec {
    fn from(s: String) -> Self { OriginSpec::Exact(s) }
}

impl From<Regex> for OriginSpec {
    fn from(re: Regex) -> Self { OriginSpec::Pattern(re) }
}

impl<T: Into<OriginSpec>> From<Vec<T>> for OriginSpec {
    fn from(list: Vec<T>) -> Self { OriginSpec::List(list.into_iter().map(Into::into).collect()) }
}

/// A header value given either as one string or as a list joined with `,`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderList {
    One(String),
    Many(Vec<String>),
}

impl HeaderList {
    pub fn joined(&self) -> String {
        match self {
            HeaderList::One(s) => s.clone(),
            HeaderList::Many(list) => list.join(","),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            HeaderList::One(s) => s.is_empty(),
            HeaderList::Many(list) => list.is_empty(),
        }
    }
}

impl From<&str> for HeaderList {
    fn from(s: &str) -> Self { HeaderList::One(s.to_string()) }
}

impl From<String> for HeaderList {
    fn from(s: String) -> Self { HeaderList::One(s) }
}

impl<S: Into<String>> From<Vec<S>> for HeaderList {
    fn from(list: Vec<S>) -> Self { HeaderList::Many(list.into_iter().map(Into::into).collect()) }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for HeaderList {
    fn from(arr: [S; N]) -> Self { HeaderList::Many(arr.into_iter().map(Into::into).collect()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaxAge {
    Seconds(u64),
    Text(String),
}

impl MaxAge {
    /// The `Access-Control-Max-Age` value, if there is one to send.
    ///
    /// Text that is not a whole number of seconds is never sent.
    pub fn header_value(&self) -> Option<String> {
        match self {
            MaxAge::Seconds(secs) => Some(secs.to_string()),
            MaxAge::Text(text) => {
                let text = text.trim();
                (!text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())).then(|| text.to_string())
            }
        }
    }
}

impl From<u64> for MaxAge {
    fn from(secs: u64) -> Self { MaxAge::Seconds(secs) }
}

impl From<&str> for MaxAge {
    fn from(s: &str) -> Self { MaxAge::Text(s.to_string()) }
}

/// Caller supplied CORS settings. Every field left as `None` keeps its default.
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    pub origin: Option<OriginSpec>,
    pub methods: Option<HeaderList>,
    pub allowed_headers: Option<HeaderList>,
    pub exposed_headers: Option<HeaderList>,
    pub credentials: Option<bool>,
    pub max_age: Option<MaxAge>,
    pub preflight_continue: Option<bool>,
    pub options_success_status: Option<u16>,
}

impl CorsConfig {
    pub fn new() -> Self { Self::default() }

    pub fn origin(mut self, origin: impl Into<OriginSpec>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn methods(mut self, methods: impl Into<HeaderList>) -> Self {
        self.methods = Some(methods.into());
        self
    }

    pub fn allowed_headers(mut self, headers: impl Into<HeaderList>) -> Self {
        self.allowed_headers = Some(headers.into());
        self
    }

    pub fn exposed_headers(mut self, headers: impl Into<HeaderList>) -> Self {
        self.exposed_headers = Some(headers.into());
        self
    }

    pub fn credentials(mut self, credentials: bool) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn max_age(mut self, max_age: impl Into<MaxAge>) -> Self {
        self.max_age = Some(max_age.into());
        self
    }

    pub fn preflight_continue(mut self, preflight_continue: bool) -> Self {
        self.preflight_continue = Some(preflight_continue);
        self
    }

    pub fn options_success_status(mut self, status: u16) -> Self {
        self.options_success_status = Some(status);
        self
    }
}

/// Settings for exactly one request, with every default filled in.
#[derive(Debug, Clone)]
pub struct ResolvedCorsOptions {
    pub origin: OriginSpec,
    pub methods: HeaderList,
    pub allowed_headers: Option<HeaderList>,
    pub exposed_headers: Option<HeaderList>,
    pub credentials: bool,
    pub max_age: Option<MaxAge>,
    pub preflight_continue: bool,
    pub options_success_status: u16,
}

impl Default for ResolvedCorsOptions {
    fn default() -> Self { Self::resolve(CorsConfig::default()) }
}

impl ResolvedCorsOptions {
    /// Shallow override of the defaults by whatever `config` sets.
    pub fn resolve(config: CorsConfig) -> Self {
        Self {
            origin: config.origin.unwrap_or_else(OriginSpec::any),
            methods: config.methods.unwrap_or_else(|| HeaderList::from(DEFAULT_METHODS)),
            allowed_headers: config.allowed_headers,
            exposed_headers: config.exposed_headers,
            credentials: config.credentials.unwrap_or(false),
            max_age: config.max_age,
            preflight_continue: config.preflight_continue.unwrap_or(false),
            options_success_status: config
                .options_success_status
                .unwrap_or(DEFAULT_OPTIONS_SUCCESS_STATUS),
        }
    }
}

/// Produces the settings for one request. `Ok(None)` means "use the defaults".
#[async_trait]
pub trait CorsOptionsDelegate<R: ?Sized>: Send + Sync + 'static {
    async fn options(&self, request: &R) -> CorsResult<Option<CorsConfig>>;
}

#[async_trait]
impl<R, F, Fut> CorsOptionsDelegate<R> for F
where
    R: ?Sized + Sync,
    F: Fn(&R) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CorsResult<Option<CorsConfig>>> + Send + 'static,
{
    async fn options(&self, request: &R) -> CorsResult<Option<CorsConfig>> {
        (self)(request).await
    }
}

/// Decides the origin spec for one request from its `Origin` header.
/// `Ok(None)` leaves the request without CORS headers.
#[async_trait]
pub trait OriginDelegate: Send + Sync + 'static {
    async fn origin(&self, request_origin: Option<&str>) -> CorsResult<Option<OriginSpec>>;
}

#[async_trait]
impl<F, Fut> OriginDelegate for F
where
    F: Fn(Option<&str>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CorsResult<Option<OriginSpec>>> + Send + 'static,
{
    async fn origin(&self, request_origin: Option<&str>) -> CorsResult<Option<OriginSpec>> {
        (self)(request_origin).await
    }
}

/// Where a [`crate::Cors`] gets its settings from.
pub enum ConfigSource<R: ?Sized> {
    Static(CorsConfig),
    Delegate(Arc<dyn CorsOptionsDelegate<R>>),
}

impl<R: ?Sized> Clone for ConfigSource<R> {
    fn clone(&self) -> Self {
        match self {
            ConfigSource::Static(config) => ConfigSource::Static(config.clone()),
            ConfigSource::Delegate(delegate) => ConfigSource::Delegate(delegate.clone()),
        }
    }
}

impl<R: ?Sized> fmt::Debug for ConfigSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Static(config) => f.debug_tuple("Static").field(config).finish(),
            ConfigSource::Delegate(_) => write!(f, "Delegate(<function>)"),
        }
    }
}

impl<R: ?Sized + Sync + 'static> ConfigSource<R> {
    /// Runs the delegate if there is one and merges the result over the defaults.
    pub async fn resolve(&self, request: &R) -> CorsResult<ResolvedCorsOptions> {
        let config = match self {
            ConfigSource::Static(config) => config.clone(),
            ConfigSource::Delegate(delegate) => delegate.options(request).await?.unwrap_or_default(),
        };
        Ok(ResolvedCorsOptions::resolve(config))
    }
}
