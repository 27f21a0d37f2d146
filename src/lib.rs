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

//! Error normalization and retry planning for [Microsoft Graph] API clients.
//!
//! Microsoft Graph reports failures as OData error envelopes of the form
//! `{"error": {"code", "message", "target", "details", "innerError"}}`,
//! accompanied by tracking and throttling headers. This crate turns such a
//! response into a [`GraphErrorInfo`], plans how long to wait before retrying
//! it, and renders it into user-facing diagnostics.
//!
//! * [`extract()`] normalizes a failed response. It never fails: malformed
//!   bodies and missing headers yield a best-effort record.
//! * [`RetryPlanner`] computes a retry delay, honoring `Retry-After` and
//!   otherwise backing off quadratically with jitter.
//! * [`ErrorResponder`] decides the outcome of a failed lifecycle operation
//!   and writes it into an [`ErrorDiagnosticsSink`].
//! * [`Client`] is a small Graph client that wires the three together.
//!
//! [Microsoft Graph]: https://learn.microsoft.com/graph/errors

#![warn(missing_debug_implementations, missing_docs)]

mod client;
mod config;
mod description;
mod error;
mod extract;
mod respond;
mod retry;

pub use client::Client;
pub use config::{ClientBuilder, ClientConfig, ListParams, DEFAULT_ENDPOINT, DEFAULT_MAX_ATTEMPTS};
pub use description::{describe_error_code, ErrorDescription};
pub use error::{categorize, Error, ErrorCategory, ErrorDetailInfo, GraphErrorInfo, InnerErrorInfo};
pub use extract::{extract, extract_response, RawResponse};
pub use respond::{
    detailed_message, permission_message, ActionResponse, CreateResponse, DeleteResponse,
    Diagnostic, Diagnostics, ErrorDiagnosticsSink, ErrorResponder, Operation, ReadResponse,
    Severity, UnknownOperation, UpdateResponse,
};
pub use retry::{parse_retry_after, RetryPlanner, DEFAULT_MAX_DELAY};
