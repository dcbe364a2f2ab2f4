//! HTTP client utilities for making requests to chat-completion APIs.
//!
//! This module provides reusable HTTP client construction and
//! request building logic.

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;
use tracing::warn;

use crate::options::{HttpTransport, SecretString, TransportOptions};

/// Build a configured HTTP client from transport options.
///
/// This applies common configuration like timeouts and proxies. An
/// unparsable proxy URL is logged and ignored.
///
/// # Example
/// ```ignore
/// let client = build_http_client(&transport_options)?;
/// ```
pub fn build_http_client(
    transport_options: &TransportOptions<HttpTransport>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();

    if let Some(timeout) = transport_options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &transport_options.provider.proxy {
        match reqwest::Proxy::all(proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => warn!(error = %e, proxy = %proxy_url, "ignoring invalid proxy URL"),
        }
    }

    builder.build()
}

/// Attach `Authorization: Bearer <token>` when a token is configured.
///
/// The token is passed through unchanged; no header is sent without one.
pub fn add_bearer_auth(request: RequestBuilder, api_key: Option<&SecretString>) -> RequestBuilder {
    match api_key {
        Some(key) if !key.expose_secret().is_empty() => {
            request.header(AUTHORIZATION, format!("Bearer {}", key.expose_secret()))
        }
        _ => request,
    }
}

/// Add extra headers to a request if specified in transport options.
///
/// # Example
/// ```ignore
/// let mut req = client.post(url);
/// req = add_extra_headers(req, &transport_options.provider.extra_headers);
/// ```
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}
