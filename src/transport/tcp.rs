//! TCP transport using tokio.
//!
//! One connection per exchange: connect, write the request, read the response,
//! shut down.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tracing::debug;

use super::{read_response, write_request, Transport, TransportError, DEFAULT_MAX_RESPONSE_BYTES};

/// TCP transport configuration.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    /// Server address as `host:port`.
    pub address: String,
    /// Deadline for a whole exchange, connect included.
    pub timeout: Option<Duration>,
    /// Largest response payload accepted.
    pub max_response_bytes: usize,
}

impl TcpTransport {
    /// Create a transport for `address` with no timeout and the default size limit.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: None,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Set the per-exchange timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the response payload limit.
    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    async fn round_trip(&self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| TransportError::ConnectFailed {
                address: self.address.clone(),
                reason: e.to_string(),
            })?;

        let (read_half, write_half) = tokio::io::split(stream);
        let mut reader = BufReader::new(read_half);
        let mut writer = BufWriter::new(write_half);

        write_request(&mut writer, request).await?;
        let response = read_response(&mut reader, self.max_response_bytes).await?;

        // The response is complete; a failed shutdown doesn't change it.
        if let Err(e) = writer.shutdown().await {
            debug!(error = %e, "shutdown after exchange failed");
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        debug!(
            address = %self.address,
            request_bytes = request.len(),
            "exchange"
        );
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.round_trip(request))
                .await
                .map_err(|_| TransportError::Timeout(limit))??,
            None => self.round_trip(request).await?,
        };
        debug!(response_bytes = response.len(), "exchange complete");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_response, ResponseCode, REQUEST_HEADER_SIZE};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server_task = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = [0u8; REQUEST_HEADER_SIZE];
            stream.read_exact(&mut request).await.unwrap();

            let response = encode_response(ResponseCode::RegistrationSuccess, &[4u8; 16]).unwrap();
            stream.write_all(&response).await.unwrap();
            request
        });

        let mut transport = TcpTransport::new(addr.to_string());
        let request = [9u8; REQUEST_HEADER_SIZE];
        let response = transport.exchange(&request).await.unwrap();

        assert_eq!(response.len(), 7 + 16);
        assert_eq!(&response[7..], &[4u8; 16]);
        assert_eq!(server_task.await.unwrap(), request);
    }

    #[tokio::test]
    async fn test_tcp_connect_failure() {
        // Bind then drop to get a port nobody listens on.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let mut transport = TcpTransport::new(addr.to_string());
        let result = transport.exchange(&[0u8; 23]).await;
        assert!(matches!(result, Err(TransportError::ConnectFailed { .. })));
    }

    #[tokio::test]
    async fn test_tcp_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server_task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            // Hold the connection open without answering.
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(stream);
        });

        let mut transport =
            TcpTransport::new(addr.to_string()).with_timeout(Some(Duration::from_millis(200)));
        let result = transport.exchange(&[0u8; 23]).await;
        assert!(matches!(result, Err(TransportError::Timeout(_))));

        server_task.abort();
    }

    #[tokio::test]
    async fn test_tcp_server_closes_early() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 23];
            stream.read_exact(&mut request).await.unwrap();
            // Header promising 100 bytes, then hang up after 3.
            let response = encode_response(ResponseCode::ClientsList, &[0u8; 100]).unwrap();
            stream.write_all(&response[..10]).await.unwrap();
        });

        let mut transport = TcpTransport::new(addr.to_string());
        let result = transport.exchange(&[0u8; 23]).await;
        assert!(matches!(result, Err(TransportError::IoFailed(_))));
    }
}
