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

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::description::describe_error_code;
use crate::error::{categorize, ErrorDetailInfo, GraphErrorInfo, InnerErrorInfo};

/// A fully materialized HTTP response.
///
/// The body of a [`reqwest::Response`] can only be read once, so the response
/// is buffered before any parsing takes place.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The response body.
    pub body: String,
}

impl RawResponse {
    /// Consumes `res`, reading its body into memory.
    pub async fn read(res: reqwest::Response) -> Result<RawResponse, reqwest::Error> {
        let status = res.status();
        let headers = res.headers().clone();
        let body = res.text().await?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

#[derive(Deserialize)]
struct ODataErrorResponse {
    error: ODataError,
}

#[derive(Deserialize)]
struct ODataError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    details: Option<Vec<ODataErrorDetail>>,
    #[serde(default, rename = "innerError", alias = "innererror")]
    inner_error: Option<ODataInnerError>,
}

#[derive(Deserialize)]
struct ODataErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    target: Option<String>,
}

#[derive(Deserialize)]
struct ODataInnerError {
    #[serde(default, rename = "request-id")]
    request_id: Option<String>,
    #[serde(default, rename = "client-request-id")]
    client_request_id: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default, rename = "@odata.type")]
    odata_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Reads `res` and extracts a [`GraphErrorInfo`] from it.
///
/// A failure to read the body is treated as an empty body.
pub async fn extract_response(res: reqwest::Response) -> GraphErrorInfo {
    let status = res.status();
    let headers = res.headers().clone();
    let response = match RawResponse::read(res).await {
        Ok(response) => response,
        Err(e) => {
            debug!(error = %e, "failed to read error response body");
            RawResponse {
                status,
                headers,
                body: String::new(),
            }
        }
    };
    extract(Some(&response))
}

/// Normalizes a failed Graph API response into a [`GraphErrorInfo`].
///
/// Extraction never fails. A missing response yields a status `0` record,
/// and a body that is not an OData error envelope leaves
/// [`GraphErrorInfo::is_odata_error`] unset.
pub fn extract(response: Option<&RawResponse>) -> GraphErrorInfo {
    let mut info = GraphErrorInfo::default();
    let response = match response {
        Some(response) => response,
        None => return info,
    };

    info.status_code = response.status.as_u16();
    info.error_message = response
        .status
        .canonical_reason()
        .unwrap_or_default()
        .to_string();

    extract_headers(&mut info, &response.headers);

    info.response_body = response.body.clone();
    parse_odata_body(&mut info, &response.body);

    if let Some(description) = describe_error_code(&info.error_code) {
        info.additional_data.insert(
            "error_description".into(),
            serde_json::Value::String(description.into()),
        );
    }

    info.category = categorize(info.status_code, &info.error_code);
    debug!(
        status_code = info.status_code,
        error_code = %info.error_code,
        category = info.category.as_str(),
        request_id = %info.request_id,
        "extracted Graph API error"
    );
    info
}

fn extract_headers(info: &mut GraphErrorInfo, headers: &HeaderMap) {
    let mut headers_by_name: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers_by_name
            .entry(name.as_str().to_owned())
            .or_default()
            .push(value);
    }

    let first = |name: &str| {
        headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default()
    };
    info.request_id = first("request-id");
    info.client_request_id = first("client-request-id");
    info.correlation_id = first("ms-correlation-id");
    info.retry_after = first("retry-after");
    info.throttled_reason = first("x-throttled-reason");
    info.error_date = first("date");

    if tracing::enabled!(tracing::Level::DEBUG) {
        let mut names: Vec<_> = headers_by_name.keys().collect();
        names.sort();
        let details = names
            .into_iter()
            .map(|name| format!("{name}: {}", headers_by_name[name].join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        debug!(headers = %details, "error response headers");
    }

    info.headers = headers_by_name;
}

fn parse_odata_body(info: &mut GraphErrorInfo, body: &str) {
    let error = match serde_json::from_str::<ODataErrorResponse>(body) {
        Ok(res) => res.error,
        Err(e) => {
            if !body.is_empty() {
                debug!(error = %e, "error response body is not an OData error");
            }
            return;
        }
    };
    let code = error.code.unwrap_or_default();
    if code.is_empty() {
        return;
    }

    info.is_odata_error = true;
    info.error_code = code;
    info.error_message = error.message.unwrap_or_default();
    info.target = error.target.unwrap_or_default();

    info.error_details = error
        .details
        .unwrap_or_default()
        .into_iter()
        .map(|d| ErrorDetailInfo {
            code: d.code.unwrap_or_default(),
            message: d.message.unwrap_or_default(),
            target: d.target.unwrap_or_default(),
        })
        .collect();

    if let Some(inner) = error.inner_error {
        let inner = InnerErrorInfo {
            request_id: inner.request_id.unwrap_or_default(),
            client_req_id: inner.client_request_id.unwrap_or_default(),
            date: inner.date.unwrap_or_default(),
            odata_type: inner.odata_type.unwrap_or_default(),
            code: inner.code.unwrap_or_default(),
            message: inner.message.unwrap_or_default(),
        };
        if !inner.request_id.is_empty() || !inner.odata_type.is_empty() {
            // Header values always win over the inner error's.
            if info.request_id.is_empty() {
                info.request_id = inner.request_id.clone();
            }
            if info.client_request_id.is_empty() {
                info.client_request_id = inner.client_req_id.clone();
            }
            if info.error_date.is_empty() {
                info.error_date = inner.date.clone();
            }
            if info.error_code.is_empty() {
                info.error_code = inner.odata_type.clone();
            }
            info.inner_errors.push(inner);
        }
    }
}
