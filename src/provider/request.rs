//! Request Builder
//!
//! Resolves base URL, endpoint and query parameters into the method and final
//! URL of a request. The final URL string doubles as the cache key.

use std::collections::BTreeMap;
use std::fmt;

use url::Url;

use crate::error::RequestError;

// == HTTP Method ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

// == Query Values ==
/// A query parameter value. Converted to its string form when the request is built.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl QueryValue {
    /// String form of the value, or `None` when it has no faithful one (NaN, infinities).
    pub fn to_query_string(&self) -> Option<String> {
        match self {
            QueryValue::Str(s) => Some(s.clone()),
            QueryValue::Int(n) => Some(n.to_string()),
            QueryValue::UInt(n) => Some(n.to_string()),
            QueryValue::Float(x) if x.is_finite() => Some(x.to_string()),
            QueryValue::Float(_) => None,
            QueryValue::Bool(b) => Some(b.to_string()),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

macro_rules! query_value_from_int {
    ($variant:ident, $wide:ty: $($ty:ty),+) => {
        $(impl From<$ty> for QueryValue {
            fn from(value: $ty) -> Self {
                QueryValue::$variant(<$wide>::from(value))
            }
        })+
    };
}

query_value_from_int!(Int, i64: i8, i16, i32, i64);
query_value_from_int!(UInt, u64: u8, u16, u32, u64);

// == Query Params ==
/// Query parameters keyed by name. Kept sorted so equal parameter sets
/// always produce the same URL, and therefore the same cache key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(BTreeMap<String, QueryValue>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing an earlier one of the same name.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Stringifies every value, failing on the first one that has no string form.
    pub fn to_pairs(&self) -> Result<Vec<(&str, String)>, RequestError> {
        self.0
            .iter()
            .map(|(name, value)| {
                value
                    .to_query_string()
                    .map(|v| (name.as_str(), v))
                    .ok_or_else(|| RequestError::InvalidQueryValue { name: name.clone() })
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

// == Fetch Method ==
/// HTTP verb plus its query parameters.
///
/// The verb does not take part in the cache key: a GET and a POST that resolve
/// to the same URL share one cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchMethod {
    Get(QueryParams),
    Post(QueryParams),
}

impl FetchMethod {
    pub fn get() -> Self {
        FetchMethod::Get(QueryParams::new())
    }

    pub fn post() -> Self {
        FetchMethod::Post(QueryParams::new())
    }

    pub fn http_method(&self) -> HttpMethod {
        match self {
            FetchMethod::Get(_) => HttpMethod::Get,
            FetchMethod::Post(_) => HttpMethod::Post,
        }
    }

    pub fn query(&self) -> &QueryParams {
        match self {
            FetchMethod::Get(query) | FetchMethod::Post(query) => query,
        }
    }
}

impl Default for FetchMethod {
    fn default() -> Self {
        FetchMethod::get()
    }
}

// == Request Descriptor ==
/// Fully resolved request: method and final URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: Url,
}

impl RequestDescriptor {
    /// Canonical cache key: the resolved URL string.
    pub fn cache_key(&self) -> &str {
        self.url.as_str()
    }
}

// == Build ==
/// Resolves a request against `base`.
///
/// The endpoint is appended to the base path as one or more path segments;
/// without an endpoint the base URL is used unchanged. A non-empty query
/// replaces whatever query the base URL carried.
pub fn build_request(
    base: &Url,
    endpoint: Option<&str>,
    method: &FetchMethod,
) -> Result<RequestDescriptor, RequestError> {
    let mut url = base.clone();

    if let Some(endpoint) = endpoint {
        let segments: Vec<&str> = endpoint.split('/').filter(|s| !s.is_empty()).collect();
        if !segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| RequestError::CannotBeBase(base.to_string()))?
                .pop_if_empty()
                .extend(segments);
        }
    }

    let query = method.query();
    if !query.is_empty() {
        let pairs = query.to_pairs()?;
        url.set_query(None);
        url.query_pairs_mut().extend_pairs(pairs);
    }

    Ok(RequestDescriptor {
        method: method.http_method(),
        url,
    })
}
