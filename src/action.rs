//! Uniform action outcome handed to UI and API callers.
//!
//! Serialized as `{ "success": bool, "message": string, "data"?: T }`. Failures are carried as values;
//! the HTTP status is derived from the error kind but the body shape never changes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::{ErrorKind, Result, StorefrontError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionResult<T> {
    Ok { message: String, data: Option<T> },
    Err { kind: ErrorKind, message: String },
}

impl<T> ActionResult<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self { Self::Ok { message: message.into(), data: Some(data) } }

    pub fn done(message: impl Into<String>) -> Self { Self::Ok { message: message.into(), data: None } }

    pub fn failed(error: &StorefrontError) -> Self {
        let kind = error.kind();
        if kind == ErrorKind::Upstream {
            tracing::error!(error = %error, "action failed upstream");
        }
        Self::Err { kind, message: error.public_message() }
    }

    /// Maps a service result, using `message` as the success text.
    pub fn from_result(result: Result<T>, message: impl Into<String>) -> Self {
        match result {
            Ok(data) => Self::ok(message, data),
            Err(e) => Self::failed(&e),
        }
    }

    pub fn is_success(&self) -> bool { matches!(self, Self::Ok { .. }) }

    pub fn message(&self) -> &str {
        match self { Self::Ok { message, .. } | Self::Err { message, .. } => message }
    }

    pub fn data(&self) -> Option<&T> {
        match self { Self::Ok { data, .. } => data.as_ref(), Self::Err { .. } => None }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Ok { .. } => StatusCode::OK,
            Self::Err { kind, .. } => kind.status(),
        }
    }
}

impl<T: Serialize> Serialize for ActionResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let data = self.data();
        let mut state = serializer.serialize_struct("ActionResult", if data.is_some() { 3 } else { 2 })?;
        state.serialize_field("success", &self.is_success())?;
        state.serialize_field("message", self.message())?;
        if let Some(data) = data {
            state.serialize_field("data", data)?;
        } else {
            state.skip_field("data")?;
        }
        state.end()
    }
}

impl<T: Serialize> IntoResponse for ActionResult<T> {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_with_data() {
        let result = ActionResult::ok("Order created", 7);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "message": "Order created", "data": 7 }));
    }

    #[test]
    fn failure_serializes_without_data() {
        let result: ActionResult<u32> = ActionResult::from_result(Err(StorefrontError::Unauthorized), "unused");
        assert!(!result.is_success());
        assert_eq!(result.status(), StatusCode::FORBIDDEN);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "message": "User is not authorized" }));
    }
}
