//! Header utilities for requests to the inference server

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::error::{Error, Result};

/// Build default headers for JSON requests: bearer credential and content type
pub fn build_default_headers(api_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
        .map_err(|_| Error::Config("API key contains characters not allowed in a header".to_string()))?;
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(headers)
}

/// Default headers plus `Accept: text/event-stream` for streamed calls
pub fn build_stream_headers(api_key: &str) -> Result<HeaderMap> {
    let mut headers = build_default_headers(api_key)?;
    headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    Ok(headers)
}
