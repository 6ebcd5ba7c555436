//! The seam between the core and the network.

use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one request and returns the raw response.
///
/// Any status code is a successful round trip; only connection and TLS
/// failures are errors (`TrackerError::Transport`).
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).send(request)
    }
}

#[cfg(feature = "ureq")]
pub use self::blocking::UreqTransport;

#[cfg(feature = "ureq")]
mod blocking {
    use log::trace;

    use super::Transport;
    use crate::error::{Result, TrackerError};
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    /// Blocking transport over a `ureq::Agent`.
    ///
    /// The agent is configured to hand 4xx/5xx responses back as data so the
    /// validator sees the service's error body.
    #[derive(Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        pub fn new() -> Self {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .new_agent();
            Self { agent }
        }

        pub fn with_agent(agent: ureq::Agent) -> Self {
            Self { agent }
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for UreqTransport {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
            trace!("{} {}", request.method.as_str(), request.path);
            let result = match request.method {
                HttpMethod::Get => with_headers(self.agent.get(&request.path), &request.headers).call(),
                HttpMethod::Delete => with_headers(self.agent.delete(&request.path), &request.headers).call(),
                HttpMethod::Post => {
                    let builder = with_headers(self.agent.post(&request.path), &request.headers);
                    match &request.body {
                        Some(body) => builder.send(body.as_bytes()),
                        None => builder.send_empty(),
                    }
                }
                HttpMethod::Put => {
                    let builder = with_headers(self.agent.put(&request.path), &request.headers);
                    match &request.body {
                        Some(body) => builder.send(body.as_bytes()),
                        None => builder.send_empty(),
                    }
                }
            };
            let mut response = result.map_err(|e| TrackerError::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect();
            let body = response
                .body_mut()
                .read_to_vec()
                .map_err(|e| TrackerError::Transport(e.to_string()))?;
            trace!("{} {} -> {status}", request.method.as_str(), request.path);

            Ok(HttpResponse { status, headers, body })
        }
    }

    fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        builder
    }
}
