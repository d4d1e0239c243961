//! API Provider
//!
//! Cache-then-network fetch of typed data.
//!
//! A fetch resolves its request, consults the cache when the policy allows,
//! and otherwise goes to the network, persisting the raw payload before
//! decoding it. Cache failures of any kind are logged and treated as a miss;
//! only network and decode failures on the network path reach the caller.

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{open_shared, CacheStore, ClearMethod};
use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::provider::{
    build_request, Decoder, FetchMethod, HttpClientParams, JsonDecoder, RequestDescriptor,
    ReqwestTransport, Transport,
};

/// Conventional success band.
pub const DEFAULT_STATUS_RANGE: Range<u16> = 200..300;

// == Cache Policy ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Neither read nor write the cache
    #[default]
    None,
    /// Read the cache first; store network responses for the given TTL
    Persistent(Duration),
}

// == Fetch Options ==
/// Everything a single fetch needs besides the target type.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub endpoint: Option<String>,
    pub method: FetchMethod,
    pub status_range: Range<u16>,
    pub cache: CachePolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            method: FetchMethod::default(),
            status_range: DEFAULT_STATUS_RANGE,
            cache: CachePolicy::None,
        }
    }
}

impl FetchOptions {
    pub fn endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: FetchMethod) -> Self {
        self.method = method;
        self
    }

    pub fn status_range(mut self, range: Range<u16>) -> Self {
        self.status_range = range;
        self
    }

    pub fn cache(mut self, policy: CachePolicy) -> Self {
        self.cache = policy;
        self
    }
}

// == API Provider ==
/// Typed fetch client over one base URL.
pub struct ApiProvider<D = JsonDecoder> {
    base_url: Url,
    transport: Arc<dyn Transport>,
    cache: CacheStore,
    decoder: D,
}

impl ApiProvider<JsonDecoder> {
    /// Creates a provider decoding JSON payloads.
    ///
    /// # Arguments
    /// * `base_url` - URL every endpoint is resolved against
    /// * `transport` - Network collaborator
    /// * `cache` - Store consulted for persistent-policy fetches
    pub fn new(base_url: &str, transport: Arc<dyn Transport>, cache: CacheStore) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url).map_err(crate::error::RequestError::from)?,
            transport,
            cache,
            decoder: JsonDecoder,
        })
    }

    /// Provider over the process-wide store and a reqwest transport.
    ///
    /// Opening the shared store also starts its expired-entry sweep at
    /// `config.cleanup_interval`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let cache = open_shared(config)?;
        let transport = ReqwestTransport::new(HttpClientParams::from_config(config))?;
        Ok(Self::new(&config.base_url, Arc::new(transport), cache)?)
    }
}

impl<D: Decoder> ApiProvider<D> {
    /// Swaps the payload decoder.
    pub fn with_decoder<E: Decoder>(self, decoder: E) -> ApiProvider<E> {
        ApiProvider {
            base_url: self.base_url,
            transport: self.transport,
            cache: self.cache,
            decoder,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Resolves `endpoint` and `method` against the base URL.
    pub fn request(&self, endpoint: Option<&str>, method: &FetchMethod) -> Result<RequestDescriptor> {
        Ok(build_request(&self.base_url, endpoint, method)?)
    }

    // == Fetch ==
    /// Fetches `endpoint` and decodes it as `T`.
    ///
    /// With [`CachePolicy::Persistent`] a fresh cached payload is returned
    /// without touching the network. A cached payload that no longer decodes
    /// as `T` is ignored and the network is used instead.
    pub async fn fetch<T: DeserializeOwned>(&self, options: FetchOptions) -> Result<T> {
        let request = self.request(options.endpoint.as_deref(), &options.method)?;
        let key = request.cache_key();

        if let CachePolicy::Persistent(_) = options.cache {
            if let Some(payload) = self.cached(key).await {
                match self.decoder.decode::<T>(&payload) {
                    Ok(value) => return Ok(value),
                    Err(e) => debug!("Cached payload for {} does not decode, refetching: {}", key, e),
                }
            }
        }

        let payload = self.send(&request, &options.status_range).await?;

        if let CachePolicy::Persistent(ttl) = options.cache {
            if let Err(e) = self.cache.put(key, payload.to_vec(), ttl).await {
                warn!("Failed to cache response for {}: {}", key, e);
            }
        }

        Ok(self.decoder.decode(&payload)?)
    }

    /// GET `endpoint` with no query.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str, cache: CachePolicy) -> Result<T> {
        self.fetch(FetchOptions::endpoint(endpoint).cache(cache)).await
    }

    /// Bulk-clears the provider's cache. Failures are logged, never returned.
    pub async fn clear_cache(&self, method: ClearMethod) {
        if let Err(e) = self.cache.clear(method).await {
            warn!("Failed to clear cache ({:?}): {}", method, e);
        }
    }

    async fn cached(&self, key: &str) -> Option<Vec<u8>> {
        self.cache.get(key).await.unwrap_or_else(|e| {
            warn!("Cache lookup failed for {}: {}", key, e);
            None
        })
    }

    async fn send(&self, request: &RequestDescriptor, status_range: &Range<u16>) -> Result<Bytes> {
        info!("{} {}", request.method, request.url);
        let response = self.transport.send(request).await?;

        if !status_range.contains(&response.status) {
            return Err(FetchError::StatusCode(response.status));
        }
        if response.body.is_empty() {
            return Err(FetchError::EmptyPayload);
        }
        Ok(response.body)
    }
}
