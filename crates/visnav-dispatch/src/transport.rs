use std::time::Duration;

use crate::endpoint::CommandRequest;

/// Failure to deliver one request.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Delivers requests to the robot.
pub trait Transport {
    fn send(&mut self, request: &CommandRequest) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, request: &CommandRequest) -> Result<(), TransportError> {
        (**self).send(request)
    }
}

/// Blocking HTTP GET transport. Any 2xx response counts as delivered.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(250);

    /// Client whose requests give up after `timeout`.
    ///
    /// The robot sits on the local network, so system proxies are ignored.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .no_proxy()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, request: &CommandRequest) -> Result<(), TransportError> {
        let response = self
            .client
            .get(&request.url)
            .send()
            .map_err(|source| TransportError::Http {
                url: request.url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }
        log::trace!("GET {} -> {}", request.url, status);
        Ok(())
    }
}
