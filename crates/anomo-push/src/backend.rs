//! Shared HTTP plumbing for the hosted backend.

use anomo_core::BackendConfig;
use anomo_net::{Fetcher, Request, Response};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;
use url::Url;

use crate::error::{PushError, PushResult};

/// Client for the hosted backend's REST, auth and function endpoints.
///
/// Every request carries the project API key. Requests are authorized with
/// the signed-in user's access token when there is one, else with the key.
/// Clones share the session.
pub struct BackendClient<F> {
    base: Url,
    api_key: String,
    fetcher: Arc<F>,
    session: Arc<RwLock<Option<String>>>,
}

impl<F> Clone for BackendClient<F> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            api_key: self.api_key.clone(),
            fetcher: Arc::clone(&self.fetcher),
            session: Arc::clone(&self.session),
        }
    }
}

impl<F: Fetcher> BackendClient<F> {
    pub fn new(config: &BackendConfig, fetcher: F) -> Self {
        Self {
            base: config.base_url(),
            api_key: config.api_key.clone(),
            fetcher: Arc::new(fetcher),
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Store the access token of a signed-in user.
    pub fn sign_in(&self, access_token: impl Into<String>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(access_token.into());
    }

    pub fn sign_out(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resolve a path such as `rest/v1/settings` against the project URL.
    pub fn endpoint(&self, path: &str) -> PushResult<Url> {
        self.base
            .join(path)
            .map_err(|e| PushError::Net(anomo_net::NetError::InvalidUrl(e.to_string())))
    }

    /// Attach credentials and send.
    pub async fn send(&self, request: Request) -> PushResult<Response> {
        let token = self.access_token().unwrap_or_else(|| self.api_key.clone());
        let request = request
            .try_header("apikey", &self.api_key)?
            .bearer_auth(&token)?;

        trace!(method = %request.method, url = %request.url, "Backend request");
        Ok(self.fetcher.fetch(request).await?)
    }
}
