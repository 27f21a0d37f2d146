// Copyright Materialize, Inc. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository, or online at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;
use std::fmt;

use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};

/// An error returned by a [`Client`].
///
/// [`Client`]: crate::Client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error in the underlying transport. No HTTP response was received.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest_middleware::Error),
    /// An error returned by the Microsoft Graph API.
    #[error("{0}")]
    Api(Box<GraphErrorInfo>),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Error {
        Error::Transport(e.into())
    }
}

impl From<GraphErrorInfo> for Error {
    fn from(e: GraphErrorInfo) -> Error {
        Error::Api(Box::new(e))
    }
}

impl Error {
    /// Returns the normalized error record for this error.
    ///
    /// Transport failures are reported as a status `0` record in the
    /// [`ErrorCategory::Network`] category.
    pub fn info(&self) -> GraphErrorInfo {
        match self {
            Error::Transport(e) => GraphErrorInfo::network(e.to_string()),
            Error::Api(info) => (**info).clone(),
        }
    }

    /// The HTTP status code, or `0` if no response was received.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Transport(_) => 0,
            Error::Api(info) => info.status_code,
        }
    }

    /// The coarse classification of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Transport(_) => ErrorCategory::Network,
            Error::Api(info) => info.category,
        }
    }
}

/// The coarse classification of a Graph API failure.
///
/// The set is closed. Anything that cannot be classified is a
/// [`ErrorCategory::Service`] error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize_enum_str, Serialize_enum_str)]
pub enum ErrorCategory {
    /// The caller could not be authenticated (HTTP 401).
    Authentication,
    /// The caller lacks permission for the operation (HTTP 403).
    Authorization,
    /// The request was rejected as invalid (HTTP 400 or 422).
    Validation,
    /// The caller is being rate limited (HTTP 429).
    Throttling,
    /// The service failed to process the request.
    Service,
    /// No HTTP response was received.
    Network,
}

impl ErrorCategory {
    /// Returns the name of the category, e.g. `"Throttling"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "Authentication",
            ErrorCategory::Authorization => "Authorization",
            ErrorCategory::Validation => "Validation",
            ErrorCategory::Throttling => "Throttling",
            ErrorCategory::Service => "Service",
            ErrorCategory::Network => "Network",
        }
    }
}

/// Classifies an error by its status code, falling back to its OData error
/// code.
///
/// The first matching rule wins. The error code is matched as a
/// case-insensitive substring.
pub fn categorize(status_code: u16, error_code: &str) -> ErrorCategory {
    match status_code {
        401 => return ErrorCategory::Authentication,
        403 => return ErrorCategory::Authorization,
        400 | 422 => return ErrorCategory::Validation,
        429 => return ErrorCategory::Throttling,
        500 | 502 | 503 | 504 => return ErrorCategory::Service,
        0 => return ErrorCategory::Network,
        _ => (),
    }
    let code = error_code.to_lowercase();
    if code.contains("auth") {
        ErrorCategory::Authentication
    } else if code.contains("forbidden") {
        ErrorCategory::Authorization
    } else if code.contains("throttle") {
        ErrorCategory::Throttling
    } else if code.contains("network") {
        ErrorCategory::Network
    } else {
        ErrorCategory::Service
    }
}

/// A normalized Microsoft Graph error.
///
/// Built once per failed HTTP exchange by [`extract()`](crate::extract()). Header
/// derived tracking values take precedence over the values reported in the
/// OData `innerError` object.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphErrorInfo {
    /// The HTTP status code, or `0` for a network-level failure.
    pub status_code: u16,
    /// The OData `error.code`.
    pub error_code: String,
    /// The OData `error.message`, or the HTTP status text when the body is not
    /// an OData error.
    pub error_message: String,
    /// The OData `error.target`.
    pub target: String,
    /// Whether the body parsed as an OData error envelope with a non-empty
    /// code.
    pub is_odata_error: bool,
    /// The OData `error.innerError` objects.
    pub inner_errors: Vec<InnerErrorInfo>,
    /// The OData `error.details` entries, in order.
    pub error_details: Vec<ErrorDetailInfo>,
    /// The `request-id` tracker.
    pub request_id: String,
    /// The `client-request-id` tracker.
    pub client_request_id: String,
    /// The `ms-correlation-id` tracker.
    pub correlation_id: String,
    /// The `date` of the failure as reported by the service.
    pub error_date: String,
    /// The raw `Retry-After` header value.
    pub retry_after: String,
    /// The raw `x-throttled-reason` header value.
    pub throttled_reason: String,
    /// The coarse classification of the error.
    pub category: ErrorCategory,
    /// Values that have no dedicated field, e.g. `error_description`.
    pub additional_data: HashMap<String, serde_json::Value>,
    /// Every response header, keyed by lowercase name.
    pub headers: HashMap<String, Vec<String>>,
    /// The raw response body.
    pub response_body: String,
}

impl Default for GraphErrorInfo {
    fn default() -> GraphErrorInfo {
        GraphErrorInfo {
            status_code: 0,
            error_code: String::new(),
            error_message: String::new(),
            target: String::new(),
            is_odata_error: false,
            inner_errors: vec![],
            error_details: vec![],
            request_id: String::new(),
            client_request_id: String::new(),
            correlation_id: String::new(),
            error_date: String::new(),
            retry_after: String::new(),
            throttled_reason: String::new(),
            category: ErrorCategory::Network,
            additional_data: HashMap::new(),
            headers: HashMap::new(),
            response_body: String::new(),
        }
    }
}

impl GraphErrorInfo {
    /// Creates the record for a failure where no HTTP response was received.
    pub fn network(message: impl Into<String>) -> GraphErrorInfo {
        GraphErrorInfo {
            error_message: message.into(),
            ..Default::default()
        }
    }

    /// Reports whether the failed call may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self.status_code, 0 | 429 | 500 | 502 | 503 | 504)
    }

    /// Returns the known-error-code description, if one was recorded.
    pub fn error_description(&self) -> Option<&str> {
        self.additional_data
            .get("error_description")
            .and_then(|v| v.as_str())
    }
}

impl fmt::Display for GraphErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Graph API error {} ({})",
            self.status_code,
            self.category.as_str()
        )?;
        if !self.error_code.is_empty() {
            write!(f, ": {}", self.error_code)?;
        }
        if !self.error_message.is_empty() {
            write!(f, ": {}", self.error_message)?;
        }
        Ok(())
    }
}

impl std::error::Error for GraphErrorInfo {}

/// One OData `innerError` object.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InnerErrorInfo {
    /// The `request-id` property.
    pub request_id: String,
    /// The `client-request-id` property.
    pub client_req_id: String,
    /// The `date` property.
    pub date: String,
    /// The `@odata.type` property.
    pub odata_type: String,
    /// The `code` property.
    pub code: String,
    /// The `message` property.
    pub message: String,
}

/// One entry of the OData `error.details` array.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorDetailInfo {
    /// The detail's error code.
    pub code: String,
    /// The detail's message.
    pub message: String,
    /// The detail's target.
    pub target: String,
}
