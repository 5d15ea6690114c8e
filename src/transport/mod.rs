//! Transport layer for server exchanges.
//!
//! The protocol is connectionless: every request opens a fresh connection,
//! sends one request, reads one response and closes. [`Transport`] captures
//! that single round trip so the client can run over TCP or a test double.

mod tcp;

pub use tcp::TcpTransport;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::{response_payload_size, RESPONSE_HEADER_SIZE};

/// Default upper bound on a response payload (64 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

/// Errors from a single request/response exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to connect to {address}: {reason}")]
    ConnectFailed { address: String, reason: String },

    #[error("I/O error: {0}")]
    IoFailed(String),

    #[error("Exchange timed out after {0:?}")]
    Timeout(Duration),

    #[error("Response payload of {size} bytes exceeds limit of {limit} bytes")]
    ResponseTooLarge { size: usize, limit: usize },
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::IoFailed(e.to_string())
    }
}

/// One request/response round trip with the server.
#[async_trait]
pub trait Transport: Send {
    /// Sends a complete encoded request and returns the complete response,
    /// header included.
    async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        (**self).exchange(request).await
    }
}

/// Writes a full request and flushes.
pub async fn write_request<W: AsyncWrite + Unpin>(
    writer: &mut W,
    request: &[u8],
) -> Result<(), TransportError> {
    writer.write_all(request).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one response: the fixed header, then exactly the declared payload.
pub async fn read_response<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_payload: usize,
) -> Result<Vec<u8>, TransportError> {
    let mut header = [0u8; RESPONSE_HEADER_SIZE];
    reader.read_exact(&mut header).await?;
    let size = response_payload_size(&header) as usize;

    if size > max_payload {
        return Err(TransportError::ResponseTooLarge {
            size,
            limit: max_payload,
        });
    }

    let mut response = Vec::with_capacity(RESPONSE_HEADER_SIZE + size);
    response.extend_from_slice(&header);
    response.resize(RESPONSE_HEADER_SIZE + size, 0);
    reader.read_exact(&mut response[RESPONSE_HEADER_SIZE..]).await?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_response, ResponseCode};

    #[tokio::test]
    async fn test_read_response_exact() {
        let mut wire = encode_response(ResponseCode::MessageSent, &[1u8; 20]).unwrap();
        let expected = wire.clone();
        // Trailing bytes belong to nobody and must not be consumed.
        wire.extend_from_slice(&[0xFF; 8]);

        let mut reader = wire.as_slice();
        let response = read_response(&mut reader, 1024).await.unwrap();
        assert_eq!(response, expected);
        assert_eq!(reader.len(), 8);
    }

    #[tokio::test]
    async fn test_read_response_too_large() {
        let wire = encode_response(ResponseCode::PullMessages, &[0u8; 100]).unwrap();
        let mut reader = wire.as_slice();
        assert_eq!(
            read_response(&mut reader, 50).await.unwrap_err(),
            TransportError::ResponseTooLarge {
                size: 100,
                limit: 50
            }
        );
    }

    #[tokio::test]
    async fn test_read_response_interrupted_payload() {
        let wire = encode_response(ResponseCode::ClientsList, &[0u8; 271]).unwrap();
        let mut reader = &wire[..100];
        assert!(matches!(
            read_response(&mut reader, 1024).await,
            Err(TransportError::IoFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_write_request() {
        let mut out = Vec::new();
        write_request(&mut out, &[1, 2, 3]).await.unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }
}
