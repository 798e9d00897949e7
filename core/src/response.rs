//! The uniform result shape handed to application code.
//!
//! Callers branch on `success` and `code`; expected failures never
//! surface as panics or opaque errors.

use crate::error::{DeskError, DeskResult, ErrorCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data:    Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error:   Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code:    Option<ErrorCode>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None, code: None }
    }

    pub fn err(error: &DeskError) -> Self {
        Self {
            success: false,
            data:    None,
            error:   Some(error.to_string()),
            code:    Some(error.code()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            data:    self.data.map(f),
            error:   self.error,
            code:    self.code,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.success
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Erase the payload type, for transports that speak JSON.
    pub fn into_json(self) -> ApiResponse<serde_json::Value> {
        match self.data.as_ref().map(serde_json::to_value).transpose() {
            Ok(data) => ApiResponse {
                success: self.success,
                data,
                error:   self.error,
                code:    self.code,
            },
            Err(e) => ApiResponse::err(&DeskError::from(e)),
        }
    }
}

impl<T> From<DeskResult<T>> for ApiResponse<T> {
    fn from(result: DeskResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                if !e.is_validation() {
                    log::debug!("response: {} {e}", e.code());
                }
                Self::err(&e)
            }
        }
    }
}
