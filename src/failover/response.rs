//! Response shape returned to the trigger.
//!
//! # Design Decisions
//! - 200 for a completed (possibly no-op) action, 500 for any error
//! - Wire form matches the deployed function: `statusCode`, a
//!   `Content-Type` header, and `body` holding a JSON document as a string

use serde::ser::{Error as _, SerializeStruct};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::failover::error::FailoverError;

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Response body: either a status report or an error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Status {
        status: String,
    },
    Error {
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

/// Structured result of one failover request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverResponse {
    pub status_code: u16,
    pub content_type: &'static str,
    pub body: ResponseBody,
}

impl FailoverResponse {
    pub fn ok(status: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            content_type: CONTENT_TYPE_JSON,
            body: ResponseBody::Status {
                status: status.into(),
            },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            content_type: CONTENT_TYPE_JSON,
            body: ResponseBody::Error {
                error_message: message.into(),
            },
        }
    }

    pub fn from_error(err: &FailoverError) -> Self {
        Self::error(err.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// Status text of a successful response.
    pub fn status(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Status { status } => Some(status),
            ResponseBody::Error { .. } => None,
        }
    }

    /// Error message of a failed response.
    pub fn error_message(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Error { error_message } => Some(error_message),
            ResponseBody::Status { .. } => None,
        }
    }
}

impl Serialize for FailoverResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let body = serde_json::to_string(&self.body).map_err(S::Error::custom)?;
        let headers = BTreeMap::from([("Content-Type", self.content_type)]);

        let mut state = serializer.serialize_struct("FailoverResponse", 3)?;
        state.serialize_field("statusCode", &self.status_code)?;
        state.serialize_field("headers", &headers)?;
        state.serialize_field("body", &body)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_wire_shape() {
        let response = FailoverResponse::ok("Changed route table for subnet-a to rtb-1\n");
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["headers"]["Content-Type"], "application/json");
        let body: serde_json::Value =
            serde_json::from_str(value["body"].as_str().unwrap()).unwrap();
        assert_eq!(body["status"], "Changed route table for subnet-a to rtb-1\n");
    }

    #[test]
    fn test_error_wire_shape() {
        let response = FailoverResponse::from_error(&FailoverError::MissingGroup);
        assert!(!response.is_success());
        assert_eq!(response.error_message(), Some("Group name not passed"));

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["statusCode"], 500);
        let body: serde_json::Value =
            serde_json::from_str(value["body"].as_str().unwrap()).unwrap();
        assert_eq!(body["errorMessage"], "Group name not passed");
        assert!(body.get("status").is_none());
    }
}
