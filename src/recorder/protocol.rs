//! OBS WebSocket v5 message types.
//!
//! Every frame is a JSON object `{"op": <opcode>, "d": <payload>}`. Only the
//! opcodes the bridge needs are modelled; anything else decodes to
//! [`ServerMessage::Other`].

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{RecorderError, RequestOutcome};

/// RPC version negotiated during identification.
pub const RPC_VERSION: u32 = 1;

const OP_HELLO: u8 = 0;
const OP_IDENTIFY: u8 = 1;
const OP_IDENTIFIED: u8 = 2;
const OP_EVENT: u8 = 5;
const OP_REQUEST: u8 = 6;
const OP_REQUEST_RESPONSE: u8 = 7;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    op: u8,
    d: T,
}

/// Authentication challenge sent in `Hello`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthChallenge {
    pub challenge: String,
    pub salt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    #[serde(default)]
    pub obs_web_socket_version: Option<String>,
    pub rpc_version: u32,
    #[serde(default)]
    pub authentication: Option<AuthChallenge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identified {
    pub negotiated_rpc_version: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_type: String,
    #[serde(default)]
    pub event_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestStatus {
    pub result: bool,
    pub code: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

impl RequestStatus {
    #[must_use]
    pub fn into_outcome(self) -> RequestOutcome {
        if self.result {
            RequestOutcome::Success
        } else {
            RequestOutcome::Failure {
                code: self.code,
                comment: self.comment,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    pub request_type: String,
    pub request_id: String,
    pub request_status: RequestStatus,
}

/// A decoded frame received from OBS.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Hello(Hello),
    Identified(Identified),
    Event(Event),
    RequestResponse(RequestResponse),
    /// An opcode the bridge does not act on.
    Other(u8),
}

impl ServerMessage {
    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::Protocol`] if the frame is not valid JSON or the
    /// payload does not match its opcode.
    pub fn decode(text: &str) -> Result<Self, RecorderError> {
        let envelope: Envelope<serde_json::Value> = serde_json::from_str(text)?;
        let message = match envelope.op {
            OP_HELLO => Self::Hello(serde_json::from_value(envelope.d)?),
            OP_IDENTIFIED => Self::Identified(serde_json::from_value(envelope.d)?),
            OP_EVENT => Self::Event(serde_json::from_value(envelope.d)?),
            OP_REQUEST_RESPONSE => Self::RequestResponse(serde_json::from_value(envelope.d)?),
            other => Self::Other(other),
        };
        Ok(message)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Identify<'a> {
    rpc_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    authentication: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Request<'a> {
    request_type: &'a str,
    request_id: &'a str,
}

/// Encode the `Identify` frame answering a `Hello`.
///
/// # Errors
///
/// Returns [`RecorderError::Handshake`] if the server requires authentication
/// and no password is configured.
pub fn encode_identify(hello: &Hello, password: Option<&str>) -> Result<String, RecorderError> {
    let authentication = match (&hello.authentication, password) {
        (Some(auth), Some(password)) => Some(auth_response(password, &auth.salt, &auth.challenge)),
        (Some(_), None) => {
            return Err(RecorderError::Handshake(
                "server requires a password but none is configured".into(),
            ));
        }
        (None, _) => None,
    };

    let frame = Envelope {
        op: OP_IDENTIFY,
        d: Identify {
            rpc_version: RPC_VERSION,
            authentication: authentication.as_deref(),
        },
    };
    Ok(serde_json::to_string(&frame)?)
}

/// Encode a request frame.
///
/// # Errors
///
/// Returns [`RecorderError::Protocol`] if serialization fails.
pub fn encode_request(request_type: &str, request_id: &str) -> Result<String, RecorderError> {
    let frame = Envelope {
        op: OP_REQUEST,
        d: Request {
            request_type,
            request_id,
        },
    };
    Ok(serde_json::to_string(&frame)?)
}

/// Compute the authentication string for a `Hello` challenge.
///
/// `base64(sha256(base64(sha256(password + salt)) + challenge))`
#[must_use]
pub fn auth_response(password: &str, salt: &str, challenge: &str) -> String {
    let secret = BASE64.encode(Sha256::digest(format!("{password}{salt}")));
    BASE64.encode(Sha256::digest(format!("{secret}{challenge}")))
}
