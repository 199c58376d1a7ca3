/// What a web framework binding has to offer the engine for one request/response pair.
///
/// "Continue to the next handler" is not part of the trait; [`crate::Cors::handle`]
/// returns an [`crate::Outcome`] and the binding acts on it.
pub trait CorsContext {
    fn request_method(&self) -> &str;
    fn request_header(&self, name: &str) -> Option<&str>;
    fn response_header(&self, name: &str) -> Option<&str>;
    fn set_response_header(&mut self, name: &str, value: &str);
    fn set_status(&mut self, code: u16);

    /// Called once a preflight has been answered. Frameworks that close the response
    /// implicitly can leave this alone.
    fn end_response(&mut self) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use super::CorsContext;

    /// In-memory context used by the engine tests.
    #[derive(Debug, Default)]
    pub struct RecordingContext {
        pub method: String,
        pub request_headers: Vec<(String, String)>,
        pub response_headers: Vec<(String, String)>,
        pub status: Option<u16>,
        pub ended: bool,
    }

    impl RecordingContext {
        pub fn new(method: &str) -> Self {
            Self { method: method.to_string(), ..Default::default() }
        }

        pub fn with_header(mut self, name: &str, value: &str) -> Self {
            self.request_headers.push((name.to_string(), value.to_string()));
            self
        }

        pub fn with_response_header(mut self, name: &str, value: &str) -> Self {
            self.response_headers.push((name.to_string(), value.to_string()));
            self
        }

        pub fn header(&self, name: &str) -> Option<&str> {
            self.response_header(name)
        }
    }

    fn find<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    impl CorsContext for RecordingContext {
        fn request_method(&self) -> &str { &self.method }

        fn request_header(&self, name: &str) -> Option<&str> { find(&self.request_headers, name) }

        fn response_header(&self, name: &str) -> Option<&str> { find(&self.response_headers, name) }

        fn set_response_header(&mut self, name: &str, value: &str) {
            self.response_headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
            self.response_headers.push((name.to_string(), value.to_string()));
        }

        fn set_status(&mut self, code: u16) { self.status = Some(code); }

        fn end_response(&mut self) { self.ended = true; }
    }
}
