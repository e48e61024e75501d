//! Frame payload encoding
//!
//! A frame carries one JSON `{type, data}` envelope. Requests that have nothing
//! to say may omit `data` or send `null`; both decode as an empty payload.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::messages::Message;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Frame is not a {{type, data}} envelope")]
    NotAnEnvelope,
}

pub fn encode(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(message).map_err(ProtocolError::Encode)
}

pub fn decode(bytes: &[u8]) -> Result<Message, ProtocolError> {
    let mut value: Value = serde_json::from_slice(bytes).map_err(ProtocolError::Decode)?;
    let envelope = value.as_object_mut().ok_or(ProtocolError::NotAnEnvelope)?;
    if !envelope.contains_key("type") {
        return Err(ProtocolError::NotAnEnvelope);
    }
    if envelope.get("data").map_or(true, Value::is_null) {
        envelope.insert("data".to_string(), Value::Object(Map::new()));
    }
    serde_json::from_value(value).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{CredentialsData, StatusData};
    use crate::responses::ResultCode;

    #[test]
    fn test_decode_accepts_missing_or_null_data() {
        assert_eq!(decode(br#"{"type":"ping"}"#).unwrap(), Message::ping());
        assert_eq!(
            decode(br#"{"type":"logout","data":null}"#).unwrap(),
            Message::Logout(StatusData::default())
        );
    }

    #[test]
    fn test_decode_login_request() {
        let message = decode(br#"{"type":"login","data":{"user":"ana","password":"pw"}}"#).unwrap();
        assert_eq!(
            message,
            Message::Login(CredentialsData {
                user: "ana".into(),
                password: "pw".into(),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_decode_rejects_unknown_tags_and_garbage() {
        assert!(matches!(
            decode(br#"{"type":"teleport","data":{}}"#),
            Err(ProtocolError::Decode(_))
        ));
        assert!(matches!(decode(b"[1,2]"), Err(ProtocolError::NotAnEnvelope)));
        assert!(matches!(decode(b"{"), Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_writes_the_envelope() {
        let reply = Message::Logout(StatusData {
            result: "bye".into(),
            result_code: ResultCode::OK,
        });
        let value: Value = serde_json::from_slice(&encode(&reply).unwrap()).unwrap();
        assert_eq!(value["type"], "logout");
        assert_eq!(value["data"]["result_code"], 200);
    }
}
