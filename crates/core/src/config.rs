use regex::Regex;
use serde::Deserialize;
use std::env;

use crate::{
    error::{CorsError, CorsResult},
    options::{CorsConfig, MaxAge, OriginSpec},
};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSection,
    pub logging: LoggingSection,
    pub http: HttpSection,
    pub cors: CorsSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub env: String,
    pub name: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    pub max_request_size_bytes: u64,
    pub concurrency_limit: usize,
}

/// Flat, env friendly form of [`CorsConfig`]. Lists are comma separated.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSection {
    pub origin: String,
    pub origin_patterns: String,
    pub methods: String,
    pub allowed_headers: String,
    pub exposed_headers: String,
    pub credentials: bool,
    pub max_age: String,
    pub preflight_continue: bool,
    pub options_success_status: u32,
}

impl AppConfig {
    pub fn load() -> CorsResult<Self> {
        // Load .env if present
        let _ = dotenvy::dotenv();
        let builder = config::Config::builder()
            .set_default("app.env", env_or("APP_ENV", "local"))?
            .set_default("app.name", env_or("APP_NAME", "cors-api"))?
            .set_default("app.host", env_or("APP_HOST", "0.0.0.0"))?
            .set_default("app.port", env_or("APP_PORT", "8000"))?
            .set_default("logging.log_format", env_or("LOG_FORMAT", "text"))?
            .set_default("http.max_request_size_bytes", env_or("MAX_REQUEST_SIZE_BYTES", "1048576"))?
            .set_default("http.concurrency_limit", env_or("CONCURRENCY_LIMIT", "1024"))?
            .set_default("cors.origin", env_or("CORS_ORIGIN", "*"))?
            .set_default("cors.origin_patterns", env_or("CORS_ORIGIN_PATTERNS", ""))?
            .set_default("cors.methods", env_or("CORS_METHODS", crate::options::DEFAULT_METHODS))?
            .set_default("cors.allowed_headers", env_or("CORS_ALLOWED_HEADERS", ""))?
            .set_default("cors.exposed_headers", env_or("CORS_EXPOSED_HEADERS", ""))?
            .set_default("cors.credentials", env_or("CORS_CREDENTIALS", "false"))?
            .set_default("cors.max_age", env_or("CORS_MAX_AGE", ""))?
            .set_default("cors.preflight_continue", env_or("CORS_PREFLIGHT_CONTINUE", "false"))?
            .set_default("cors.options_success_status", env_or("CORS_OPTIONS_SUCCESS_STATUS", "204"))?;

        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    pub fn is_production(&self) -> bool { self.app.env == "production" }
}

impl CorsSection {
    pub fn to_cors_config(&self) -> CorsResult<CorsConfig> {
        let mut config = CorsConfig::new()
            .origin(self.origin_spec()?)
            .methods(self.methods.as_str())
            .credentials(self.credentials)
            .preflight_continue(self.preflight_continue)
            .options_success_status(self.status()?);

        if !self.allowed_headers.trim().is_empty() {
            config = config.allowed_headers(split_list(&self.allowed_headers));
        }
        if !self.exposed_headers.trim().is_empty() {
            config = config.exposed_headers(split_list(&self.exposed_headers));
        }
        config.max_age = self.max_age()?;
        Ok(config)
    }

    fn max_age(&self) -> CorsResult<Option<MaxAge>> {
        let raw = self.max_age.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<u64>().map(|secs| Some(MaxAge::Seconds(secs))).map_err(|_| CorsError::ConfigType {
            field: "max_age",
            reason: format!("{raw:?} is not a number of seconds"),
        })
    }

    fn origin_spec(&self) -> CorsResult<OriginSpec> {
        let origins = split_list(&self.origin);
        let patterns = split_list(&self.origin_patterns)
            .into_iter()
            .map(|p| {
                Regex::new(&p).map(OriginSpec::Pattern).map_err(|source| CorsError::Pattern { pattern: p, source })
            })
            .collect::<CorsResult<Vec<_>>>()?;

        if patterns.is_empty() {
            match origins.as_slice() {
                [] => return Ok(OriginSpec::Bool(false)),
                [single] if single == "true" => return Ok(OriginSpec::Bool(true)),
                [single] if single == "false" => return Ok(OriginSpec::Bool(false)),
                [single] => return Ok(OriginSpec::Exact(single.clone())),
                _ => {}
            }
        }
        let mut list: Vec<OriginSpec> = origins.into_iter().map(OriginSpec::Exact).collect();
        list.extend(patterns);
        Ok(OriginSpec::List(list))
    }

    fn status(&self) -> CorsResult<u16> {
        u16::try_from(self.options_success_status)
            .ok()
            .filter(|s| (100..=599).contains(s))
            .ok_or_else(|| CorsError::ConfigType {
                field: "options_success_status",
                reason: format!("{} is not an HTTP status code", self.options_success_status),
            })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{options::HeaderList, origin::is_allowed};

    fn section() -> CorsSection {
        CorsSection {
            origin: "*".into(),
            origin_patterns: String::new(),
            methods: "GET,POST".into(),
            allowed_headers: String::new(),
            exposed_headers: String::new(),
            credentials: false,
            max_age: String::new(),
            preflight_continue: false,
            options_success_status: 204,
        }
    }

    #[test]
    fn wildcard_section() {
        let config = section().to_cors_config().unwrap();
        assert!(matches!(config.origin, Some(OriginSpec::Exact(ref s)) if s == "*"));
        assert_eq!(config.methods, Some(HeaderList::from("GET,POST")));
        assert!(config.allowed_headers.is_none());
        assert!(config.max_age.is_none());
    }

    #[test]
    fn boolean_origin() {
        let config = CorsSection { origin: "false".into(), ..section() }.to_cors_config().unwrap();
        assert!(matches!(config.origin, Some(OriginSpec::Bool(false))));
    }

    #[test]
    fn list_and_patterns() {
        let config = CorsSection {
            origin: "http://a.com, http://b.com".into(),
            origin_patterns: r"\.trusted\.io$".into(),
            allowed_headers: "Content-Type, Authorization".into(),
            max_age: "600".into(),
            ..section()
        }
        .to_cors_config()
        .unwrap();

        let origin = config.origin.unwrap();
        assert!(is_allowed(Some("http://b.com"), &origin));
        assert!(is_allowed(Some("https://x.trusted.io"), &origin));
        assert!(!is_allowed(Some("http://c.com"), &origin));
        assert_eq!(config.allowed_headers.unwrap().joined(), "Content-Type,Authorization");
        assert_eq!(config.max_age, Some(MaxAge::Seconds(600)));
    }

    #[test]
    fn bad_pattern_is_rejected() {
        let err = CorsSection { origin_patterns: "(".into(), ..section() }.to_cors_config().unwrap_err();
        assert!(matches!(err, CorsError::Pattern { .. }));
    }

    #[test]
    fn bad_status_is_rejected() {
        let err = CorsSection { options_success_status: 70000, ..section() }.to_cors_config().unwrap_err();
        assert!(matches!(err, CorsError::ConfigType { field: "options_success_status", .. }));
    }

    #[test]
    fn non_numeric_max_age_is_rejected() {
        let err = CorsSection { max_age: "ten minutes".into(), ..section() }.to_cors_config().unwrap_err();
        assert!(matches!(err, CorsError::ConfigType { field: "max_age", .. }));

        let config = CorsSection { max_age: " 90 ".into(), ..section() }.to_cors_config().unwrap();
        assert_eq!(config.max_age, Some(MaxAge::Seconds(90)));
    }
}
