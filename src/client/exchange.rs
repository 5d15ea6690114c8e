//! One request/response round trip, with response validation.

use async_trait::async_trait;
use tracing::debug;

use crate::crypto::decode_public_key;
use crate::error::{ClientError, ServerError};
use crate::peers::KeyDirectory;
use crate::protocol::{
    decode_response, encode_request, ClientId, ProtocolError, PublicKeyBytes, PublicKeyRequest,
    PublicKeyResponse, RequestCode, ResponseCode,
};
use crate::transport::Transport;

/// Borrowed transport plus the id requests are sent under.
pub(crate) struct Exchange<'a, T: ?Sized> {
    transport: &'a mut T,
    client_id: ClientId,
}

impl<'a, T: Transport + ?Sized> Exchange<'a, T> {
    pub(crate) fn new(transport: &'a mut T, client_id: ClientId) -> Self {
        Self {
            transport,
            client_id,
        }
    }

    /// Sends `payload` under `code` and returns the body of an `expected`
    /// response. GENERAL_ERROR becomes [`ServerError::GeneralError`]; any
    /// other code is [`ProtocolError::UnexpectedResponse`].
    pub(crate) async fn round_trip(
        &mut self,
        code: RequestCode,
        payload: &[u8],
        expected: ResponseCode,
    ) -> Result<Vec<u8>, ClientError> {
        let request = encode_request(code, self.client_id, payload)?;
        debug!(?code, payload_bytes = payload.len(), "request");

        let response = self.transport.exchange(&request).await?;
        let (header, body) = decode_response(&response)?;
        debug!(code = ?header.code, version = header.version, payload_bytes = body.len(), "response");

        match header.code {
            ResponseCode::GeneralError => Err(ServerError::GeneralError.into()),
            got if got != expected => {
                Err(ProtocolError::UnexpectedResponse { expected, got }.into())
            }
            _ => Ok(body.to_vec()),
        }
    }
}

#[async_trait]
impl<T: Transport + ?Sized> KeyDirectory for Exchange<'_, T> {
    async fn fetch_public_key(&mut self, peer_id: &ClientId) -> Result<PublicKeyBytes, ClientError> {
        let payload = PublicKeyRequest { client_id: *peer_id }.encode();
        let body = self
            .round_trip(RequestCode::PublicKey, &payload, ResponseCode::PublicKey)
            .await?;
        let response = PublicKeyResponse::decode(&body)?;

        if response.client_id != *peer_id {
            return Err(ClientError::peer_mismatch(*peer_id, response.client_id));
        }
        // Refuse to cache anything we couldn't encrypt to later.
        decode_public_key(&response.public_key)?;
        Ok(response.public_key)
    }
}
