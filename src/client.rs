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

use async_stream::try_stream;
use futures_core::Stream;
use reqwest::{Method, Response, Url};
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::ListParams;
use crate::extract::extract_response;
use crate::retry::RetryPlanner;
use crate::{ClientBuilder, ClientConfig, Error};

/// The header Microsoft Graph echoes back to correlate a request with its
/// server-side logs.
const CLIENT_REQUEST_ID: &str = "client-request-id";

/// An API client for Microsoft Graph.
///
/// The API client is designed to be wrapped in an [`Arc`] and used from
/// multiple threads simultaneously.
///
/// Failed calls are returned as [`Error::Api`] carrying a normalized
/// [`GraphErrorInfo`]. Calls that fail with a retryable status are retried
/// after the delay computed by the configured [`RetryPlanner`].
///
/// [`Arc`]: std::sync::Arc
/// [`GraphErrorInfo`]: crate::GraphErrorInfo
#[derive(Debug)]
pub struct Client {
    pub(crate) inner: ClientWithMiddleware,
    pub(crate) access_token: String,
    pub(crate) endpoint: Url,
    pub(crate) max_attempts: u32,
    pub(crate) planner: RetryPlanner,
}

impl Client {
    /// Creates a new `Client` from its required configuration parameters.
    pub fn new(config: ClientConfig) -> Client {
        ClientBuilder::default().build(config)
    }

    /// Creates a builder for a `Client` that allows for customization of
    /// optional parameters.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Fetches the entity at `path`.
    pub async fn get<T, P>(&self, path: P) -> Result<T, Error>
    where
        T: DeserializeOwned,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let req = self.build_request(Method::GET, path);
        self.send_request(req).await
    }

    /// Creates an entity in the collection at `path`, returning the created
    /// entity.
    pub async fn create<B, T, P>(&self, path: P, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let req = self.build_request(Method::POST, path).json(body);
        self.send_request(req).await
    }

    /// Updates the entity at `path` with the properties in `body`.
    pub async fn update<B, P>(&self, path: P, body: &B) -> Result<(), Error>
    where
        B: Serialize + ?Sized,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let req = self.build_request(Method::PATCH, path).json(body);
        self.execute(req).await?;
        Ok(())
    }

    /// Deletes the entity at `path`.
    pub async fn delete<P>(&self, path: P) -> Result<(), Error>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let req = self.build_request(Method::DELETE, path);
        self.execute(req).await?;
        Ok(())
    }

    /// Lists the entities in the collection at `path`, following OData
    /// `@odata.nextLink` pagination.
    pub fn list<'a, T, P>(
        &'a self,
        path: P,
        params: &ListParams,
    ) -> impl Stream<Item = Result<T, Error>> + 'a
    where
        T: DeserializeOwned + 'a,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let req = self.build_request(Method::GET, path);
        self.stream_paginated_request(params, req)
    }

    fn build_request<P>(&self, method: Method, path: P) -> RequestBuilder
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .expect("builder validated URL can be a base")
            .pop_if_empty()
            .extend(path);
        self.authorize(self.inner.request(method, url))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.access_token)
            .header(CLIENT_REQUEST_ID, Uuid::new_v4().to_string())
    }

    /// Sends `req`, retrying while Microsoft Graph responds with a retryable
    /// status and attempts remain.
    async fn execute(&self, mut req: RequestBuilder) -> Result<Response, Error> {
        let mut attempt = 1;
        loop {
            // Requests with streaming bodies cannot be cloned and are sent
            // only once.
            let retry_req = if attempt < self.max_attempts {
                req.try_clone()
            } else {
                None
            };
            let res = req.send().await?;
            if res.status().is_success() {
                return Ok(res);
            }
            let info = extract_response(res).await;
            match retry_req {
                Some(retry_req) if info.is_retryable() => {
                    let delay = self.planner.compute_delay(&info, attempt);
                    info!(
                        attempt,
                        status_code = info.status_code,
                        category = info.category.as_str(),
                        delay_ms = delay.as_millis() as u64,
                        "retrying Graph API request"
                    );
                    tokio::time::sleep(delay).await;
                    req = retry_req;
                    attempt += 1;
                }
                _ => return Err(info.into()),
            }
        }
    }

    async fn send_request<T>(&self, req: RequestBuilder) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let res = self.execute(req).await?;
        Ok(res.json().await?)
    }

    fn stream_paginated_request<'a, T>(
        &'a self,
        params: &ListParams,
        req: RequestBuilder,
    ) -> impl Stream<Item = Result<T, Error>> + 'a
    where
        T: DeserializeOwned + 'a,
    {
        #[derive(Deserialize)]
        struct Paginated<T> {
            value: Vec<T>,
            #[serde(rename = "@odata.nextLink")]
            next_link: Option<String>,
        }

        let req = req.query(&[("$top", params.page_size)]);
        try_stream! {
            let mut current_req = req;
            loop {
                let res: Paginated<T> = self.send_request(current_req).await?;
                for datum in res.value {
                    yield datum;
                }
                match res.next_link {
                    None => break,
                    // The next link already carries every query option.
                    Some(next_link) => {
                        current_req = self.authorize(self.inner.get(next_link));
                    }
                }
            }
        }
    }
}
