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

use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::description::ErrorDescription;
use crate::error::GraphErrorInfo;

/// The lifecycle operation during which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Creating a resource.
    Create,
    /// Reading a resource.
    Read,
    /// Updating a resource.
    Update,
    /// Deleting a resource.
    Delete,
    /// Invoking an action.
    Action,
}

impl Operation {
    /// Returns the name of the operation, e.g. `"Read"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "Create",
            Operation::Read => "Read",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
            Operation::Action => "Action",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error returned when parsing an unknown [`Operation`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation: {0}")]
pub struct UnknownOperation(String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Operation, UnknownOperation> {
        match s {
            "Create" => Ok(Operation::Create),
            "Read" => Ok(Operation::Read),
            "Update" => Ok(Operation::Update),
            "Delete" => Ok(Operation::Delete),
            "Action" => Ok(Operation::Action),
            _ => Err(UnknownOperation(s.into())),
        }
    }
}

/// A target for the user-visible outcome of a failed operation.
pub trait ErrorDiagnosticsSink {
    /// Records an error diagnostic.
    fn add_error(&mut self, summary: &str, detail: &str);

    /// Records a warning diagnostic.
    fn add_warning(&mut self, summary: &str, detail: &str);

    /// Removes the resource from state.
    ///
    /// Returns `false` if the sink has no state to remove the resource from.
    fn remove_from_state(&mut self) -> bool {
        false
    }
}

/// The severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The operation failed.
    Error,
    /// The operation succeeded, but something deserves attention.
    Warning,
}

/// A single diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: Severity,
    /// A short summary.
    pub summary: String,
    /// The full detail.
    pub detail: String,
}

/// An ordered collection of diagnostics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Returns all diagnostics in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Returns the error diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Error)
    }

    /// Reports whether any error diagnostic was added.
    pub fn has_error(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Returns the number of diagnostics.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Reports whether no diagnostics were added.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ErrorDiagnosticsSink for Diagnostics {
    fn add_error(&mut self, summary: &str, detail: &str) {
        self.0.push(Diagnostic {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        });
    }

    fn add_warning(&mut self, summary: &str, detail: &str) {
        self.0.push(Diagnostic {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        });
    }
}

macro_rules! stateless_response {
    ($(#[$doc:meta] $name:ident),* $(,)?) => {$(
        #[$doc]
        #[derive(Debug, Default, Clone, PartialEq, Eq)]
        pub struct $name {
            /// The diagnostics reported for the operation.
            pub diagnostics: Diagnostics,
        }

        impl ErrorDiagnosticsSink for $name {
            fn add_error(&mut self, summary: &str, detail: &str) {
                self.diagnostics.add_error(summary, detail)
            }

            fn add_warning(&mut self, summary: &str, detail: &str) {
                self.diagnostics.add_warning(summary, detail)
            }
        }
    )*};
}

stateless_response! {
    /// The response to a create operation.
    CreateResponse,
    /// The response to an update operation.
    UpdateResponse,
    /// The response to a delete operation.
    DeleteResponse,
    /// The response to an action invocation.
    ActionResponse,
}

/// The response to a read operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    /// The diagnostics reported for the operation.
    pub diagnostics: Diagnostics,
    /// Whether the resource is still present in state.
    pub in_state: bool,
}

impl Default for ReadResponse {
    fn default() -> ReadResponse {
        ReadResponse {
            diagnostics: Diagnostics::default(),
            in_state: true,
        }
    }
}

impl ErrorDiagnosticsSink for ReadResponse {
    fn add_error(&mut self, summary: &str, detail: &str) {
        self.diagnostics.add_error(summary, detail)
    }

    fn add_warning(&mut self, summary: &str, detail: &str) {
        self.diagnostics.add_warning(summary, detail)
    }

    fn remove_from_state(&mut self) -> bool {
        self.in_state = false;
        true
    }
}

/// Turns a [`GraphErrorInfo`] into the user-visible outcome of an operation.
#[derive(Debug, Default, Clone)]
pub struct ErrorResponder {
    remove_on_bad_read: bool,
}

impl ErrorResponder {
    /// Creates a responder.
    pub fn new() -> ErrorResponder {
        ErrorResponder::default()
    }

    /// Sets whether a read that fails with HTTP 400 removes the resource from
    /// state, as a read that fails with HTTP 404 does.
    ///
    /// Off by default: a 400 is usually a caller error, not a missing resource.
    pub fn remove_on_bad_read(mut self, remove: bool) -> Self {
        self.remove_on_bad_read = remove;
        self
    }

    /// Records the outcome of `info` into `sink`.
    ///
    /// `required_permissions` lists the Graph permissions any one of which
    /// would allow the operation. It is used to explain 401 and 403 errors.
    pub fn handle<S>(
        &self,
        info: &GraphErrorInfo,
        operation: Operation,
        sink: &mut S,
        required_permissions: &[&str],
    ) where
        S: ErrorDiagnosticsSink + ?Sized,
    {
        let description = ErrorDescription::for_status(info.status_code);
        let summary = format!("{operation} operation failed: {}", description.summary);
        match info.status_code {
            400 if operation == Operation::Read && self.remove_on_bad_read => {
                if remove_from_state(info, operation, sink) {
                    return;
                }
                sink.add_error(&summary, &detailed_message(info, &description.detail));
            }
            401 | 403 => {
                let mut detail = detailed_message(info, &description.detail);
                detail.push_str("\n\n");
                detail.push_str(&permission_message(required_permissions));
                sink.add_error(&summary, &detail);
            }
            404 if operation == Operation::Read => {
                if remove_from_state(info, operation, sink) {
                    return;
                }
                sink.add_error(&summary, &detailed_message(info, &description.detail));
            }
            429 => {
                warn!(
                    %operation,
                    retry_after = %info.retry_after,
                    throttled_reason = %info.throttled_reason,
                    "request was throttled"
                );
                let mut base = format!(
                    "Microsoft Graph throttled the {operation} request. Retry after: {}.",
                    or_unspecified(&info.retry_after)
                );
                if !info.throttled_reason.is_empty() {
                    base.push_str(&format!(" Throttled reason: {}.", info.throttled_reason));
                }
                sink.add_error(
                    &format!("{operation} operation failed: Rate limit exceeded"),
                    &detailed_message(info, &base),
                );
            }
            503 => {
                let base = format!(
                    "Microsoft Graph is temporarily unavailable. Retry after: {}.",
                    or_unspecified(&info.retry_after)
                );
                sink.add_error(
                    &format!("{operation} operation failed: Service unavailable"),
                    &detailed_message(info, &base),
                );
            }
            _ => sink.add_error(&summary, &detailed_message(info, &description.detail)),
        }
    }
}

fn remove_from_state<S>(info: &GraphErrorInfo, operation: Operation, sink: &mut S) -> bool
where
    S: ErrorDiagnosticsSink + ?Sized,
{
    let removed = sink.remove_from_state();
    if removed {
        info!(
            %operation,
            status_code = info.status_code,
            request_id = %info.request_id,
            "resource no longer exists, removing from state"
        );
    }
    removed
}

fn or_unspecified(value: &str) -> &str {
    if value.is_empty() {
        "unspecified"
    } else {
        value
    }
}

/// Explains which permissions an operation requires.
pub fn permission_message(required_permissions: &[&str]) -> String {
    match required_permissions {
        [] => "Ensure the application has been granted the Microsoft Graph permissions \
               this operation requires, and that admin consent has been given."
            .into(),
        [permission] => format!("This operation requires permission: {permission}"),
        permissions => format!(
            "This operation requires one of the following permissions: {}",
            permissions.join(", ")
        ),
    }
}

/// Renders every non-empty part of `info` as a multi-line message, starting
/// with `base`.
pub fn detailed_message(info: &GraphErrorInfo, base: &str) -> String {
    let mut parts = vec![];
    if !base.is_empty() {
        parts.push(base.to_string());
    }
    if !info.error_message.is_empty() {
        parts.push(format!("Error: {}", info.error_message));
    }
    if !info.error_code.is_empty() {
        let mut code = format!("Code: {}", info.error_code);
        if let Some(description) = info.error_description() {
            code.push_str(&format!(" Description: {description}"));
        }
        parts.push(code);
    }
    if !info.target.is_empty() {
        parts.push(format!("Target: {}", info.target));
    }

    let details: Vec<_> = info
        .error_details
        .iter()
        .map(|d| {
            let mut s = String::new();
            if !d.code.is_empty() {
                s.push_str(&format!("Code: {}", d.code));
            }
            if !d.message.is_empty() {
                if !s.is_empty() {
                    s.push_str(" - ");
                }
                s.push_str(&d.message);
            }
            if !d.target.is_empty() {
                if !s.is_empty() {
                    s.push(' ');
                }
                s.push_str(&format!("(Target: {})", d.target));
            }
            s
        })
        .filter(|s| !s.is_empty())
        .collect();
    if !details.is_empty() {
        parts.push(format!("Details: {}", details.join("; ")));
    }

    let inner_errors: Vec<_> = info
        .inner_errors
        .iter()
        .enumerate()
        .map(|(i, inner)| {
            let mut fields = vec![format!("Level {}", i + 1)];
            if !inner.odata_type.is_empty() {
                fields.push(format!("Type: {}", inner.odata_type));
            }
            if !inner.code.is_empty() {
                fields.push(format!("Code: {}", inner.code));
            }
            if !inner.message.is_empty() {
                fields.push(format!("Message: {}", inner.message));
            }
            fields.join(" - ")
        })
        .collect();
    if !inner_errors.is_empty() {
        parts.push(format!("Inner Errors: {}", inner_errors.join("; ")));
    }

    let trackers: Vec<_> = [
        ("Request ID", &info.request_id),
        ("Client Request ID", &info.client_request_id),
        ("Correlation ID", &info.correlation_id),
        ("Date", &info.error_date),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(name, value)| format!("{name}: {value}"))
    .collect();
    if !trackers.is_empty() {
        parts.push(format!("Tracking: {}", trackers.join(", ")));
    }

    parts.push(format!("Category: {}", info.category.as_str()));
    parts.join("\n")
}
