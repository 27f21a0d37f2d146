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

use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::{Response, Url};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{
    default_on_request_failure, RetryTransientMiddleware, Retryable, RetryableStrategy,
};

use crate::client::Client;
use crate::retry::RetryPlanner;

/// The Microsoft Graph beta endpoint.
pub static DEFAULT_ENDPOINT: Lazy<Url> = Lazy::new(|| {
    "https://graph.microsoft.com/beta"
        .parse()
        .expect("url known to be valid")
});

/// The default number of times an API call is attempted.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Configures the required parameters of a [`Client`].
#[derive(Debug)]
pub struct ClientConfig {
    /// The OAuth 2.0 access token to authenticate with.
    pub access_token: String,
}

/// A builder for a [`Client`].
#[derive(Debug)]
pub struct ClientBuilder {
    endpoint: Url,
    transport_retry_policy: Option<ExponentialBackoff>,
    max_attempts: u32,
    planner: RetryPlanner,
}

impl Default for ClientBuilder {
    fn default() -> ClientBuilder {
        ClientBuilder {
            endpoint: DEFAULT_ENDPOINT.clone(),
            transport_retry_policy: Some(
                ExponentialBackoff::builder()
                    .retry_bounds(Duration::from_secs(1), Duration::from_secs(5))
                    .build_with_max_retries(3),
            ),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            planner: RetryPlanner::default(),
        }
    }
}

/// Retry requests that failed to produce a response.
///
/// Responses, whatever their status, are left to the [`Client`], which plans
/// its retries from the normalized error and the `Retry-After` header.
struct RetryTransportFailures;
impl RetryableStrategy for RetryTransportFailures {
    fn handle(&self, res: &Result<Response, reqwest_middleware::Error>) -> Option<Retryable> {
        match res {
            Ok(_) => None,
            Err(error) => default_on_request_failure(error),
        }
    }
}

impl ClientBuilder {
    /// Sets the policy for retrying requests that fail before a response is
    /// received.
    pub fn with_transport_retry_policy(mut self, policy: ExponentialBackoff) -> Self {
        self.transport_retry_policy = Some(policy);
        self
    }

    /// Disables retries of requests that fail before a response is received.
    pub fn without_transport_retries(mut self) -> Self {
        self.transport_retry_policy = None;
        self
    }

    /// Sets how many times an API call is attempted when Microsoft Graph
    /// responds with a retryable status. A value of `1` disables API retries.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the planner used to compute the delay between API retries.
    pub fn with_retry_planner(mut self, planner: RetryPlanner) -> Self {
        self.planner = planner;
        self
    }

    /// Sets the endpoint.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Creates a [`Client`] that incorporates the optional parameters
    /// configured on the builder and the specified required parameters.
    pub fn build(self, config: ClientConfig) -> Client {
        let client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(60))
            .build()
            .expect("static client configuration is valid");
        Client {
            inner: match self.transport_retry_policy {
                Some(policy) => reqwest_middleware::ClientBuilder::new(client)
                    .with(RetryTransientMiddleware::new_with_policy_and_strategy(
                        policy,
                        RetryTransportFailures,
                    ))
                    .build(),
                None => reqwest_middleware::ClientBuilder::new(client).build(),
            },
            access_token: config.access_token,
            endpoint: self.endpoint,
            max_attempts: self.max_attempts,
            planner: self.planner,
        }
    }
}

/// Parameters for a list operation.
#[derive(Debug, Clone)]
pub struct ListParams {
    pub(crate) page_size: u64,
}

impl Default for ListParams {
    fn default() -> ListParams {
        ListParams::DEFAULT
    }
}

impl ListParams {
    /// The default list parameters.
    ///
    /// Exposed as a constant for use in constant evaluation contexts.
    pub const DEFAULT: ListParams = ListParams { page_size: 100 };

    /// Sets the page size for the list operation, sent as the OData `$top`
    /// query option.
    ///
    /// The page size only affects the size of each HTTP response. It does not
    /// change the observable output of the API. Some Graph collections cap the
    /// page size below the requested value.
    pub const fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }
}
