use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::codec::{FrameDecoder, encode_frame};
use super::{RpcError, RpcReply, RpcRequest};

/// Client for the weather service. Each call opens its own connection, sends
/// one request and waits for the matching reply.
pub struct WeatherClient {
    addr: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl WeatherClient {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends `data` to the handler registered for `pattern` and returns its
    /// response. Remote handler errors come back as [`RpcError::Remote`].
    pub async fn send(&self, pattern: &str, data: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let request = RpcRequest {
            pattern: Value::String(pattern.to_string()),
            data,
            id: Some(id.clone()),
        };
        let millis = self.timeout.as_millis() as u64;
        timeout(self.timeout, self.exchange(&request, &id))
            .await
            .map_err(|_| RpcError::Timeout(millis))?
    }

    async fn exchange(&self, request: &RpcRequest, id: &str) -> Result<Value, RpcError> {
        let mut stream = TcpStream::connect(&self.addr).await?;
        let body = serde_json::to_string(request)?;
        stream.write_all(&encode_frame(&body)).await?;
        debug!(addr = %self.addr, pattern = %request.pattern_name(), id, "RPC request sent.");

        let mut decoder = FrameDecoder::new();
        let mut buf = vec![0u8; 8192];
        loop {
            while let Some(frame) = decoder.next_frame()? {
                let reply: RpcReply = serde_json::from_str(&frame)?;
                if reply.id != id {
                    continue;
                }
                if let Some(err) = reply.err {
                    let message = match &err {
                        Value::String(s) => s.clone(),
                        Value::Object(map) => map
                            .get("message")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| err.to_string()),
                        other => other.to_string(),
                    };
                    return Err(RpcError::Remote(message));
                }
                return Ok(reply.response.unwrap_or(Value::Null));
            }

            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Err(RpcError::ConnectionClosed);
            }
            decoder.push(&buf[..n])?;
        }
    }
}
