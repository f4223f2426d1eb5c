use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use crate::constants::protocol::MISSING_BUCKETS_HEADER;
use crate::error::{FetchError, FetchResult};
use crate::streaming::wire::{parse_missing_buckets, BucketResponse, RequestBucketInfo};

/// One batched bucket request against a store layer endpoint.
///
/// `layer_url` is the layer base URL of either store; the transport appends
/// the `/data` route and the token.
#[async_trait]
pub trait BucketTransport: Send + Sync {
    async fn request_buckets(
        &self,
        layer_url: &str,
        token: &str,
        batch: &[RequestBucketInfo],
        timeout: Duration,
    ) -> FetchResult<BucketResponse>;
}

/// reqwest based transport
#[derive(Clone, Default)]
pub struct HttpBucketTransport {
    client: Client,
}

impl HttpBucketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BucketTransport for HttpBucketTransport {
    async fn request_buckets(
        &self,
        layer_url: &str,
        token: &str,
        batch: &[RequestBucketInfo],
        timeout: Duration,
    ) -> FetchResult<BucketResponse> {
        let timeout_ms = timeout.as_millis() as u64;

        let resp = self
            .client
            .post(format!("{}/data", layer_url))
            .query(&[("token", token)])
            .json(batch)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, timeout_ms))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let missing = parse_missing_buckets(
            resp.headers()
                .get(MISSING_BUCKETS_HEADER)
                .and_then(|v| v.to_str().ok()),
        );

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(e, timeout_ms))?;

        log::trace!(
            "[BucketFetch] {} bytes for {} buckets ({} missing)",
            bytes.len(),
            batch.len(),
            missing.len()
        );

        Ok(BucketResponse {
            buffer: bytes.to_vec(),
            missing,
        })
    }
}

fn classify_reqwest_error(err: reqwest::Error, timeout_ms: u64) -> FetchError {
    if err.is_timeout() {
        return FetchError::Timeout { timeout_ms };
    }
    FetchError::Http(format_reqwest_error(err))
}

/// The token travels in the query string, so it must never reach a log line
fn redact_url_for_logs(url: &Url) -> Url {
    let mut url = url.clone();
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url.set_query(None);
    url.set_fragment(None);
    url
}

fn format_reqwest_error(err: reqwest::Error) -> String {
    let mut msg = err.to_string();
    if let Some(url) = err.url() {
        let redacted = redact_url_for_logs(url);
        msg = msg.replace(url.as_str(), redacted.as_str());
    }
    msg
}
