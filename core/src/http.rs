//! HTTP exchange described as plain data.
//!
//! # Design
//! The core builds `HttpRequest` values and consumes `HttpResponse` values
//! without touching the network. Whatever executes the request, a
//! `Transport` or the caller's own code, only moves these values across the
//! wire. The response body is kept as raw bytes; the markup parser decides
//! whether it is text.

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `TrackerClient::build_*` methods. `path` is the absolute URL,
/// query string included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            path: "http://localhost/".to_string(),
            headers: vec![("X-TrackerToken".to_string(), "abc".to_string())],
            body: None,
        };
        assert_eq!(req.header("x-trackertoken"), Some("abc"));
        assert_eq!(req.header("content-type"), None);
    }

    #[test]
    fn response_accepts_str_or_bytes() {
        assert_eq!(HttpResponse::new(200, "<story/>").body, b"<story/>".to_vec());
        assert_eq!(HttpResponse::new(204, Vec::new()).body, Vec::<u8>::new());
    }
}
