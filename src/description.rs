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

use std::borrow::Cow;

/// A human-facing description of an HTTP status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescription {
    /// A short title, suitable for a diagnostic summary.
    pub summary: Cow<'static, str>,
    /// A sentence explaining what the status usually means.
    pub detail: Cow<'static, str>,
}

impl ErrorDescription {
    const fn new(summary: &'static str, detail: &'static str) -> ErrorDescription {
        ErrorDescription {
            summary: Cow::Borrowed(summary),
            detail: Cow::Borrowed(detail),
        }
    }

    /// Looks up the description of `status_code`.
    ///
    /// Unmapped codes get a generic `HTTP Error <code>` description.
    pub fn for_status(status_code: u16) -> ErrorDescription {
        match status_code {
            0 => ErrorDescription::new(
                "Network Error",
                "The request did not reach Microsoft Graph or no response was received.",
            ),
            400 => ErrorDescription::new(
                "Bad Request",
                "The request is malformed or contains invalid values.",
            ),
            401 => ErrorDescription::new(
                "Unauthorized",
                "Required authentication information is either missing or not valid for the resource.",
            ),
            403 => ErrorDescription::new(
                "Forbidden",
                "Access is denied to the requested resource. The caller might not have enough permission.",
            ),
            404 => ErrorDescription::new(
                "Not Found",
                "The requested resource doesn't exist.",
            ),
            405 => ErrorDescription::new(
                "Method Not Allowed",
                "The HTTP method in the request is not allowed on the resource.",
            ),
            406 => ErrorDescription::new(
                "Not Acceptable",
                "The service doesn't support the format requested in the Accept header.",
            ),
            409 => ErrorDescription::new(
                "Conflict",
                "The current state conflicts with what the request expects.",
            ),
            410 => ErrorDescription::new(
                "Gone",
                "The requested resource is no longer available at the server.",
            ),
            411 => ErrorDescription::new(
                "Length Required",
                "A Content-Length header is required on the request.",
            ),
            412 => ErrorDescription::new(
                "Precondition Failed",
                "A precondition provided in the request does not match the resource's current state.",
            ),
            413 => ErrorDescription::new(
                "Request Entity Too Large",
                "The request size exceeds the maximum limit.",
            ),
            415 => ErrorDescription::new(
                "Unsupported Media Type",
                "The content type of the request is a format that is not supported by the service.",
            ),
            416 => ErrorDescription::new(
                "Requested Range Not Satisfiable",
                "The specified byte range is invalid or unavailable.",
            ),
            422 => ErrorDescription::new(
                "Unprocessable Entity",
                "The request cannot be processed because it is semantically incorrect.",
            ),
            423 => ErrorDescription::new(
                "Locked",
                "The resource that is being accessed is locked.",
            ),
            429 => ErrorDescription::new(
                "Too Many Requests",
                "Client application has been throttled and should not attempt to repeat the request until an amount of time has elapsed.",
            ),
            500 => ErrorDescription::new(
                "Internal Server Error",
                "There was an internal server error while processing the request.",
            ),
            501 => ErrorDescription::new(
                "Not Implemented",
                "The requested feature isn't implemented.",
            ),
            502 => ErrorDescription::new(
                "Bad Gateway",
                "The service received an invalid response from an upstream server.",
            ),
            503 => ErrorDescription::new(
                "Service Unavailable",
                "The service is temporarily unavailable for maintenance or is overloaded.",
            ),
            504 => ErrorDescription::new(
                "Gateway Timeout",
                "The server, while acting as a proxy, did not receive a timely response from the upstream server.",
            ),
            507 => ErrorDescription::new(
                "Insufficient Storage",
                "The maximum storage quota has been reached.",
            ),
            509 => ErrorDescription::new(
                "Bandwidth Limit Exceeded",
                "The application has been throttled for exceeding the maximum bandwidth cap.",
            ),
            _ => ErrorDescription {
                summary: Cow::Owned(format!("HTTP Error {status_code}")),
                detail: Cow::Owned(format!(
                    "The request failed with HTTP status code {status_code}."
                )),
            },
        }
    }
}

/// Describes a well-known Microsoft Graph error code.
///
/// Codes are matched exactly. Unknown codes have no description.
pub fn describe_error_code(code: &str) -> Option<&'static str> {
    let description = match code {
        "accessDenied" => "The caller doesn't have permission to perform the action.",
        "activityLimitReached" => "The app or user has been throttled.",
        "extensionError" => "The mailbox is located on premises and the Exchange server does not support federated Microsoft Graph requests.",
        "generalException" => "An unspecified error has occurred.",
        "invalidRange" => "The specified byte range is invalid or unavailable.",
        "invalidRequest" => "The request is malformed or incorrect.",
        "itemNotFound" => "The resource could not be found.",
        "malwareDetected" => "Malware was detected in the requested resource.",
        "nameAlreadyExists" => "The specified item name already exists.",
        "notAllowed" => "The action is not allowed by the system.",
        "notSupported" => "The request is not supported by the system.",
        "resourceModified" => "The resource being updated has changed since the caller last read it, usually an eTag mismatch.",
        "resyncRequired" => "The delta token is no longer valid, and the app must reset the sync state.",
        "serviceNotAvailable" => "The service is not available. Try the request again after a delay.",
        "syncStateNotFound" => "The sync state generation is not found.",
        "quotaLimitReached" => "The user has reached their quota limit.",
        "unauthenticated" => "The caller is not authenticated.",
        "InvalidAuthenticationToken" => "The access token is missing, expired, or invalid.",
        "Authorization_RequestDenied" => "Insufficient privileges to complete the operation.",
        "Authorization_IdentityNotFound" => "The identity of the calling application could not be established.",
        "Forbidden" => "The caller is not allowed to access the resource.",
        "Unauthorized" => "The caller is not authorized to access the resource.",
        "BadRequest" => "The request is malformed or contains invalid values.",
        "Request_BadRequest" => "One or more properties in the request contain invalid values.",
        "Request_ResourceNotFound" => "The referenced directory object does not exist.",
        "ResourceNotFound" => "The requested resource does not exist.",
        "TooManyRequests" => "Too many requests have been sent in a given amount of time.",
        "InternalServerError" => "The service encountered an internal error.",
        "ServiceUnavailable" => "The service is temporarily unavailable.",
        "UnknownError" => "The service returned an unknown error.",
        _ => return None,
    };
    Some(description)
}
