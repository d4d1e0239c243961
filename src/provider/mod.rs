//! Provider Module
//!
//! Typed fetch pipeline: request resolution, network transport, decoding and
//! the cache-or-network orchestration that ties them to the cache store.

mod client;
mod decoder;
mod request;
mod transport;

pub use client::{ApiProvider, CachePolicy, FetchOptions, DEFAULT_STATUS_RANGE};
pub use decoder::{DecodeError, Decoder, JsonDecoder};
pub use request::{
    build_request, FetchMethod, HttpMethod, QueryParams, QueryValue, RequestDescriptor,
};
pub use transport::{HttpClientParams, ReqwestTransport, Transport, TransportResponse};
