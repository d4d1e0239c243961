//! Network Transport
//!
//! The capability that actually performs a request. [`ReqwestTransport`] is the
//! production implementation; tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use tracing::debug;

use crate::config::Config;
use crate::error::TransportError;
use crate::provider::RequestDescriptor;

/// Raw response as seen by the fetch pipeline.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs `request` and returns status, headers and the full body.
    async fn send(&self, request: &RequestDescriptor) -> Result<TransportResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpClientParams {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl HttpClientParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.request_timeout),
            connect_timeout: Duration::from_secs(config.connect_timeout),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// [`Transport`] backed by a `reqwest::Client` using rustls.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(params: HttpClientParams) -> Result<Self, TransportError> {
        let client = reqwest::ClientBuilder::new()
            .use_rustls_tls()
            .timeout(params.timeout)
            .connect_timeout(params.connect_timeout)
            .user_agent(params.user_agent)
            .build()
            .map_err(|e| TransportError::Other(e.into()))?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .request(request.method.into(), request.url.clone())
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        debug!(
            "{} {} -> {} ({} bytes)",
            request.method,
            request.url,
            status,
            body.len()
        );

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_from_config() {
        let config = Config {
            request_timeout: 12,
            connect_timeout: 3,
            user_agent: "tester/1.0".to_string(),
            ..Config::default()
        };

        let params = HttpClientParams::from_config(&config);

        assert_eq!(params.timeout, Duration::from_secs(12));
        assert_eq!(params.connect_timeout, Duration::from_secs(3));
        assert_eq!(params.user_agent, "tester/1.0");
    }

    #[test]
    fn test_build_client() {
        let transport = ReqwestTransport::new(HttpClientParams::from_config(&Config::default()));
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_error() {
        // Bind then drop a listener so the port is known to be closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport =
            ReqwestTransport::new(HttpClientParams::from_config(&Config::default())).unwrap();
        let request = RequestDescriptor {
            method: crate::provider::HttpMethod::Get,
            url: url::Url::parse(&format!("http://{}/", addr)).unwrap(),
        };

        let result = transport.send(&request).await;
        assert!(matches!(result, Err(TransportError::Connection(_))));
    }
}
