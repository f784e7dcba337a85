use axum::{Json, body::Bytes};
use pinboard_core::Gated;
use pinboard_types::api::{ApiResponse, GateData, PasswordBody};
use serde::Serialize;

use crate::error::ApiError;

/// Reads the optional `{password}` body of a gated read. An empty body or an
/// empty password means none was sent.
pub fn optional_password(body: &Bytes) -> Result<Option<String>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let parsed: PasswordBody = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e)))?;
    Ok(Some(parsed.password).filter(|p| !p.is_empty()))
}

/// Payload of a gated read: the full data, or only the gate flags.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GatedBody<T> {
    Allowed(T),
    Refused(GateData),
}

/// Gate refusals are not HTTP errors: they travel as `200` with the gate's status and message.
pub fn gated_response<T: Serialize>(gated: Gated<T>) -> Json<ApiResponse<GatedBody<T>>> {
    match gated {
        Gated::Allowed(data) => Json(ApiResponse::ok(GatedBody::Allowed(data))),
        Gated::Refused { outcome, gate } => Json(ApiResponse::with_message(
            GatedBody::Refused(gate),
            outcome.status(),
            outcome.message(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_bodies_carry_no_password() {
        assert_eq!(optional_password(&Bytes::new()).unwrap(), None);
        assert_eq!(optional_password(&Bytes::from_static(b"  \n")).unwrap(), None);
        assert_eq!(optional_password(&Bytes::from_static(b"{}")).unwrap(), None);
        assert_eq!(
            optional_password(&Bytes::from_static(br#"{"password":""}"#)).unwrap(),
            None
        );
    }

    #[test]
    fn password_is_read_from_json() {
        let body = Bytes::from_static(br#"{"password":"hunter22"}"#);
        assert_eq!(optional_password(&body).unwrap().as_deref(), Some("hunter22"));
        assert!(optional_password(&Bytes::from_static(b"not json")).is_err());
    }
}
