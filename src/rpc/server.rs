use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use super::codec::{FrameDecoder, encode_frame};
use super::{RpcError, RpcReply, RpcRequest};

/// Message handlers exposed over the TCP transport.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    /// Handles one message. Unknown patterns return [`RpcError::NoHandler`].
    async fn handle(&self, pattern: &str, data: Value) -> Result<Value, RpcError>;
}

/// Accepts connections until the listener fails, serving each on its own task.
pub async fn serve(listener: TcpListener, handler: Arc<dyn RpcHandler>) -> Result<(), RpcError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "RPC server listening.");
    }
    loop {
        let (stream, peer) = listener.accept().await?;
        let handler = handler.clone();
        tokio::spawn(async move {
            debug!(%peer, "RPC connection accepted.");
            if let Err(e) = handle_connection(stream, handler).await {
                warn!(%peer, error = %e, "RPC connection closed with error.");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, handler: Arc<dyn RpcHandler>) -> Result<(), RpcError> {
    let mut decoder = FrameDecoder::new();
    let mut buf = vec![0u8; 8192];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        decoder.push(&buf[..n])?;

        while let Some(frame) = decoder.next_frame()? {
            let request: RpcRequest = match serde_json::from_str(&frame) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "Dropping malformed RPC message.");
                    continue;
                }
            };
            let pattern = request.pattern_name();
            let result = handler.handle(&pattern, request.data).await;

            let Some(id) = request.id else {
                if let Err(e) = result {
                    warn!(pattern, error = %e, "Event handler failed.");
                }
                continue;
            };

            let reply = match result {
                Ok(response) => RpcReply {
                    id,
                    response: Some(response),
                    err: None,
                    is_disposed: true,
                },
                Err(e) => {
                    error!(pattern, error = %e, "RPC handler failed.");
                    RpcReply {
                        id,
                        response: None,
                        err: Some(Value::String(e.to_string())),
                        is_disposed: true,
                    }
                }
            };
            let body = serde_json::to_string(&reply)?;
            stream.write_all(&encode_frame(&body)).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::WeatherClient;
    use serde_json::json;
    use std::time::Duration;

    struct EchoHandler;

    #[async_trait]
    impl RpcHandler for EchoHandler {
        async fn handle(&self, pattern: &str, data: Value) -> Result<Value, RpcError> {
            match pattern {
                "echo" => Ok(json!({ "echo": data })),
                "fail" => Err(RpcError::Remote("Weather API error".to_string())),
                "slow" => {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok(Value::Null)
                }
                _ => Err(RpcError::NoHandler),
            }
        }
    }

    async fn start() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(serve(listener, Arc::new(EchoHandler)));
        addr
    }

    #[tokio::test]
    async fn request_gets_the_handler_response() {
        let client = WeatherClient::new(start().await, Duration::from_secs(2));
        let response = client.send("echo", json!({"zona": "Acobamba"})).await.unwrap();
        assert_eq!(response, json!({"echo": {"zona": "Acobamba"}}));
    }

    #[tokio::test]
    async fn unknown_pattern_reports_no_handler() {
        let client = WeatherClient::new(start().await, Duration::from_secs(2));
        let err = client.send("nope", Value::Null).await.unwrap_err();
        match err {
            RpcError::Remote(message) => assert_eq!(
                message,
                "There is no matching message handler defined in the remote service."
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn handler_error_is_returned_as_remote() {
        let client = WeatherClient::new(start().await, Duration::from_secs(2));
        let err = client.send("fail", Value::Null).await.unwrap_err();
        assert!(matches!(err, RpcError::Remote(m) if m == "Weather API error"));
    }

    #[tokio::test]
    async fn slow_handler_times_out() {
        let client = WeatherClient::new(start().await, Duration::from_millis(50));
        let err = client.send("slow", Value::Null).await.unwrap_err();
        assert!(matches!(err, RpcError::Timeout(50)));
    }

    #[tokio::test]
    async fn unreachable_service_is_an_io_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        let client = WeatherClient::new(addr, Duration::from_secs(1));
        assert!(matches!(client.send("echo", Value::Null).await, Err(RpcError::Io(_))));
    }
}
