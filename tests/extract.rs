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

//! Tests for normalizing failed Graph API responses.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde_json::json;
use test_log::test;

use msgraph_errors::{categorize, extract, ErrorCategory, ErrorDetailInfo, RawResponse};

fn response(status: u16, headers: &[(&str, &str)], body: &str) -> RawResponse {
    let mut header_map = HeaderMap::new();
    for (name, value) in headers {
        header_map.append(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    RawResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers: header_map,
        body: body.into(),
    }
}

fn odata_body() -> String {
    json!({
        "error": {
            "code": "Request_BadRequest",
            "message": "Invalid value specified for property 'displayName'.",
            "target": "displayName",
            "details": [
                {"code": "InvalidValue", "message": "Too long", "target": "displayName"},
                {"code": "Required", "message": "Missing mailNickname"}
            ],
            "innerError": {
                "request-id": "inner-request-id",
                "client-request-id": "inner-client-request-id",
                "date": "2024-05-01T10:00:00",
                "@odata.type": "#microsoft.graph.innerError"
            }
        }
    })
    .to_string()
}

#[test]
fn test_missing_response() {
    let info = extract(None);
    assert_eq!(info.status_code, 0);
    assert_eq!(info.category, ErrorCategory::Network);
    assert!(!info.is_odata_error);
    assert!(info.headers.is_empty());
    assert!(info.additional_data.is_empty());
}

#[test]
fn test_empty_body_uses_status_text() {
    let info = extract(Some(&response(500, &[], "")));
    assert_eq!(info.status_code, 500);
    assert!(!info.is_odata_error);
    assert_eq!(info.category, ErrorCategory::Service);
    assert_eq!(info.error_message, "Internal Server Error");
    assert_eq!(info.response_body, "");
}

#[test]
fn test_odata_error() {
    let body = odata_body();
    let info = extract(Some(&response(400, &[], &body)));
    assert!(info.is_odata_error);
    assert_eq!(info.error_code, "Request_BadRequest");
    assert_eq!(
        info.error_message,
        "Invalid value specified for property 'displayName'."
    );
    assert_eq!(info.target, "displayName");
    assert_eq!(info.category, ErrorCategory::Validation);
    assert_eq!(
        info.error_details,
        vec![
            ErrorDetailInfo {
                code: "InvalidValue".into(),
                message: "Too long".into(),
                target: "displayName".into(),
            },
            ErrorDetailInfo {
                code: "Required".into(),
                message: "Missing mailNickname".into(),
                target: String::new(),
            },
        ]
    );
    assert_eq!(info.inner_errors.len(), 1);
    assert_eq!(info.inner_errors[0].odata_type, "#microsoft.graph.innerError");

    // Without headers, trackers come from the inner error.
    assert_eq!(info.request_id, "inner-request-id");
    assert_eq!(info.client_request_id, "inner-client-request-id");
    assert_eq!(info.error_date, "2024-05-01T10:00:00");
    assert_eq!(info.response_body, body);
}

#[test]
fn test_headers_take_precedence_over_inner_error() {
    let info = extract(Some(&response(
        400,
        &[
            ("request-id", "header-request-id"),
            ("Date", "Wed, 01 May 2024 10:00:00 GMT"),
        ],
        &odata_body(),
    )));
    assert_eq!(info.request_id, "header-request-id");
    assert_eq!(info.error_date, "Wed, 01 May 2024 10:00:00 GMT");
    // Not provided by a header, so backfilled.
    assert_eq!(info.client_request_id, "inner-client-request-id");
    // The inner error still records its own values.
    assert_eq!(info.inner_errors[0].request_id, "inner-request-id");
}

#[test]
fn test_recognized_headers() {
    let info = extract(Some(&response(
        429,
        &[
            ("Retry-After", "30"),
            ("X-Throttled-Reason", "ApplicationRequestsExceeded"),
            ("MS-Correlation-ID", "correlation"),
            ("Client-Request-Id", "client"),
            ("x-ms-ags-diagnostic", "a"),
            ("x-ms-ags-diagnostic", "b"),
        ],
        "",
    )));
    assert_eq!(info.retry_after, "30");
    assert_eq!(info.throttled_reason, "ApplicationRequestsExceeded");
    assert_eq!(info.correlation_id, "correlation");
    assert_eq!(info.client_request_id, "client");
    assert_eq!(info.category, ErrorCategory::Throttling);
    assert_eq!(info.error_message, "Too Many Requests");
    assert_eq!(
        info.headers["x-ms-ags-diagnostic"],
        vec!["a".to_string(), "b".to_string()]
    );
    assert_eq!(info.headers["retry-after"], vec!["30".to_string()]);
}

#[test]
fn test_known_error_code_description() {
    let body = json!({
        "error": {
            "code": "InvalidAuthenticationToken",
            "message": "Access token has expired."
        }
    });
    let info = extract(Some(&response(401, &[], &body.to_string())));
    assert_eq!(info.category, ErrorCategory::Authentication);
    assert_eq!(
        info.error_description(),
        Some("The access token is missing, expired, or invalid.")
    );

    let body = json!({"error": {"code": "SomethingUnusual", "message": "?"}});
    let info = extract(Some(&response(409, &[], &body.to_string())));
    assert_eq!(info.error_description(), None);
    assert!(!info.additional_data.contains_key("error_description"));
}

#[test]
fn test_non_odata_bodies() {
    for body in [
        "<html>Bad Gateway</html>",
        "{\"error\": \"invalid_grant\"}",
        "{\"error\": {\"code\": \"\", \"message\": \"no code\"}}",
        "{\"error\": {\"message\": \"no code\"}}",
        "[]",
    ] {
        let info = extract(Some(&response(502, &[], body)));
        assert!(!info.is_odata_error, "{body}");
        assert_eq!(info.error_code, "", "{body}");
        assert_eq!(info.error_message, "Bad Gateway", "{body}");
        assert_eq!(info.response_body, body);
    }
}

#[test]
fn test_inner_error_requires_request_id_or_type() {
    let body = json!({
        "error": {
            "code": "generalException",
            "message": "General exception while processing",
            "innerError": {"date": "2024-05-01T10:00:00"}
        }
    });
    let info = extract(Some(&response(500, &[], &body.to_string())));
    assert!(info.is_odata_error);
    assert!(info.inner_errors.is_empty());
    assert_eq!(info.error_date, "");
}

#[test]
fn test_null_fields_are_tolerated() {
    let body = json!({
        "error": {
            "code": "itemNotFound",
            "message": null,
            "target": null,
            "details": null,
            "innerError": null
        }
    });
    let info = extract(Some(&response(404, &[], &body.to_string())));
    assert!(info.is_odata_error);
    assert_eq!(info.error_code, "itemNotFound");
    assert_eq!(info.error_message, "");
    assert!(info.error_details.is_empty());
    assert_eq!(info.category, ErrorCategory::Service);
}

#[test]
fn test_categorize_status_codes() {
    assert_eq!(categorize(401, ""), ErrorCategory::Authentication);
    assert_eq!(categorize(403, ""), ErrorCategory::Authorization);
    assert_eq!(categorize(400, ""), ErrorCategory::Validation);
    assert_eq!(categorize(422, ""), ErrorCategory::Validation);
    assert_eq!(categorize(429, ""), ErrorCategory::Throttling);
    for status in [500, 502, 503, 504] {
        assert_eq!(categorize(status, ""), ErrorCategory::Service);
    }
    assert_eq!(categorize(0, ""), ErrorCategory::Network);

    // The status wins over the error code.
    assert_eq!(categorize(403, "AuthFailed"), ErrorCategory::Authorization);
}

#[test]
fn test_categorize_error_codes() {
    assert_eq!(categorize(409, "AUTHENTICATION_FAILED"), ErrorCategory::Authentication);
    assert_eq!(categorize(409, "resourceForbidden"), ErrorCategory::Authorization);
    assert_eq!(categorize(409, "requestThrottled"), ErrorCategory::Throttling);
    assert_eq!(categorize(409, "NetworkUnreachable"), ErrorCategory::Network);
    assert_eq!(categorize(404, "itemNotFound"), ErrorCategory::Service);
    assert_eq!(categorize(418, ""), ErrorCategory::Service);
}

#[test]
fn test_category_serializes_as_name() {
    for category in [
        ErrorCategory::Authentication,
        ErrorCategory::Authorization,
        ErrorCategory::Validation,
        ErrorCategory::Throttling,
        ErrorCategory::Service,
        ErrorCategory::Network,
    ] {
        let json = serde_json::to_string(&category).unwrap();
        assert_eq!(json, format!("\"{}\"", category.as_str()));
        let parsed: ErrorCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, category);
    }
}

#[test]
fn test_categorize_is_total() {
    let codes = ["", "auth", "forbidden", "throttle", "network", "unknown"];
    for status in 0..600 {
        for code in codes {
            let category = categorize(status, code);
            let expected = match status {
                401 => ErrorCategory::Authentication,
                403 => ErrorCategory::Authorization,
                400 | 422 => ErrorCategory::Validation,
                429 => ErrorCategory::Throttling,
                500 | 502 | 503 | 504 => ErrorCategory::Service,
                0 => ErrorCategory::Network,
                _ => match code {
                    "auth" => ErrorCategory::Authentication,
                    "forbidden" => ErrorCategory::Authorization,
                    "throttle" => ErrorCategory::Throttling,
                    "network" => ErrorCategory::Network,
                    _ => ErrorCategory::Service,
                },
            };
            assert_eq!(category, expected, "status {status}, code {code:?}");
        }
    }
}
