//! Framework-agnostic CORS header negotiation.
//!
//! A [`Cors`] resolves its settings for each request, evaluates the request `Origin`,
//! and writes the matching `Access-Control-*` and `Vary` headers through a
//! [`CorsContext`] supplied by the web framework binding.

pub mod composer;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod options;
pub mod origin;
pub mod vary;

pub use composer::{HeaderPlan, HeaderWrite, Outcome, RequestView};
pub use context::CorsContext;
pub use engine::Cors;
pub use error::{CorsError, CorsResult};
pub use options::{
    ConfigSource, CorsConfig, CorsOptionsDelegate, HeaderList, MaxAge, OriginDelegate, OriginSpec,
    ResolvedCorsOptions,
};
pub use origin::OriginDecision;
