//! HTTP/JSON channel to a single target.

use async_trait::async_trait;
use distrokv_common::{KvError, StatusResponse};
use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tokio::net::TcpStream;

use super::Dialer;
use distrokv_common::constants::DIAL_TIMEOUT_SECS;

/// Options applied when a channel is first dialed
#[derive(Clone, Debug)]
pub struct DialOptions {
    /// Bound on establishing the TCP connection
    pub connect_timeout: Duration,
    /// Bound on any single request made over the channel
    pub request_timeout: Duration,
}

impl Default for DialOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DIAL_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DIAL_TIMEOUT_SECS * 2),
        }
    }
}

/// A reusable channel to one `host:port` target.
///
/// Cloning is cheap; clones share the underlying keep-alive pool.
#[derive(Clone, Debug)]
pub struct HttpChannel {
    target: String,
    base_url: String,
    http: Client,
}

impl HttpChannel {
    /// The `host:port` this channel was dialed for
    pub fn target(&self) -> &str {
        &self.target
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and decode a JSON response regardless of HTTP status.
    ///
    /// Servers answer rejections with an error-coded body, so the body is the
    /// source of truth; the HTTP status only matters when the body is not JSON.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, KvError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let resp = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(&self.target, e))?;
        decode(&self.target, resp).await
    }

    /// GET and decode a JSON response
    pub async fn get_json<R>(&self, path: &str) -> Result<R, KvError>
    where
        R: DeserializeOwned,
    {
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| map_reqwest_error(&self.target, e))?;
        decode(&self.target, resp).await
    }

    /// POST and require a success code in the `{status, message}` body
    pub async fn call<B>(&self, path: &str, body: &B) -> Result<StatusResponse, KvError>
    where
        B: Serialize + ?Sized,
    {
        let response: StatusResponse = self.post_json(path, body).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(KvError::Rejected {
                status: response.status,
                message: response.message,
            })
        }
    }
}

async fn decode<R: DeserializeOwned>(target: &str, resp: reqwest::Response) -> Result<R, KvError> {
    let status = resp.status();
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| map_reqwest_error(target, e))?;

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(e) if status.is_success() => Err(KvError::Transport(format!(
            "invalid response from {}: {}",
            target, e
        ))),
        Err(_) => Err(KvError::Rejected {
            status: status.as_u16().to_string(),
            message: String::from_utf8_lossy(&bytes).into_owned(),
        }),
    }
}

fn map_reqwest_error(target: &str, err: reqwest::Error) -> KvError {
    if err.is_timeout() {
        KvError::Timeout(format!("request to {}", target))
    } else if err.is_connect() {
        KvError::Connect {
            target: target.to_string(),
            reason: err.to_string(),
        }
    } else {
        KvError::Transport(format!("{}: {}", target, err))
    }
}

/// Dials HTTP channels, probing the target with a bounded TCP connect first
#[derive(Clone, Debug, Default)]
pub struct HttpDialer;

#[async_trait]
impl Dialer for HttpDialer {
    type Connection = HttpChannel;

    async fn dial(&self, target: &str, options: &DialOptions) -> Result<HttpChannel, KvError> {
        match tokio::time::timeout(options.connect_timeout, TcpStream::connect(target)).await {
            Err(_) => return Err(KvError::Timeout(format!("dialing {}", target))),
            Ok(Err(e)) => {
                return Err(KvError::Connect {
                    target: target.to_string(),
                    reason: e.to_string(),
                });
            }
            Ok(Ok(_stream)) => {}
        }

        let http = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| KvError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(HttpChannel {
            target: target.to_string(),
            base_url: format!("http://{}", target),
            http,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_dial_live_target() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();

        let channel = HttpDialer.dial(&target, &DialOptions::default()).await.unwrap();
        assert_eq!(channel.target(), target);
        assert_eq!(channel.url("/nodes"), format!("http://{}/nodes", target));
    }

    #[tokio::test]
    async fn test_dial_closed_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = HttpDialer.dial(&target, &DialOptions::default()).await;
        assert!(matches!(result, Err(KvError::Connect { .. }) | Err(KvError::Timeout(_))));
    }
}
