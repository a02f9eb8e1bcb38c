//! Who is signed in.

use anomo_core::AuthUser;
use anomo_net::{Fetcher, Request};
use http::StatusCode;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::backend::BackendClient;
use crate::error::{PushError, PushResult};

/// Source of the current user.
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, or `None` when there is no session.
    fn current_user(&self) -> impl Future<Output = PushResult<Option<AuthUser>>> + Send;
}

impl<I: IdentityProvider> IdentityProvider for Arc<I> {
    fn current_user(&self) -> impl Future<Output = PushResult<Option<AuthUser>>> + Send {
        (**self).current_user()
    }
}

/// Identity backed by the hosted auth service's session.
pub struct SessionIdentity<F> {
    backend: BackendClient<F>,
}

impl<F: Fetcher> SessionIdentity<F> {
    pub fn new(backend: BackendClient<F>) -> Self {
        Self { backend }
    }

    pub fn sign_in(&self, access_token: impl Into<String>) {
        self.backend.sign_in(access_token);
    }

    pub fn sign_out(&self) {
        self.backend.sign_out();
    }
}

impl<F: Fetcher> IdentityProvider for SessionIdentity<F> {
    async fn current_user(&self) -> PushResult<Option<AuthUser>> {
        if self.backend.access_token().is_none() {
            return Ok(None);
        }

        let url = self.backend.endpoint("auth/v1/user")?;
        let response = self.backend.send(Request::get(url)).await?;

        if response.status == StatusCode::UNAUTHORIZED {
            debug!("Session rejected by auth service");
            return Ok(None);
        }
        if !response.ok() {
            return Err(PushError::Identity(format!(
                "user lookup returned {}",
                response.status
            )));
        }

        Ok(Some(response.json::<AuthUser>()?))
    }
}
