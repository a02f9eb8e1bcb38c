//! The browser surface the subscription manager drives.

use anomo_net::Fetcher;
use anomo_sw::{PushSubscription, PushSubscriptionOptions, ServiceWorkerContainer};
use std::future::Future;
use std::sync::Arc;
use url::Url;

use crate::error::PushResult;

/// Worker registration plus the push manager of a registration.
///
/// `ready` may never resolve; callers bound every call with a timeout.
pub trait PushPlatform: Send + Sync {
    /// Whether service workers and push are both available.
    fn supported(&self) -> bool;

    /// Register the worker script; resolves to the registration scope.
    fn register(&self, script_path: &str) -> impl Future<Output = PushResult<Url>> + Send;

    /// Resolve once a registration has an active worker.
    fn ready(&self) -> impl Future<Output = PushResult<Url>> + Send;

    fn get_subscription(
        &self,
        scope: &Url,
    ) -> impl Future<Output = PushResult<Option<PushSubscription>>> + Send;

    fn subscribe(
        &self,
        scope: &Url,
        options: &PushSubscriptionOptions,
    ) -> impl Future<Output = PushResult<PushSubscription>> + Send;

    /// Returns whether a subscription was removed.
    fn unsubscribe(&self, scope: &Url) -> impl Future<Output = PushResult<bool>> + Send;
}

impl<P: PushPlatform> PushPlatform for Arc<P> {
    fn supported(&self) -> bool {
        (**self).supported()
    }

    fn register(&self, script_path: &str) -> impl Future<Output = PushResult<Url>> + Send {
        (**self).register(script_path)
    }

    fn ready(&self) -> impl Future<Output = PushResult<Url>> + Send {
        (**self).ready()
    }

    fn get_subscription(
        &self,
        scope: &Url,
    ) -> impl Future<Output = PushResult<Option<PushSubscription>>> + Send {
        (**self).get_subscription(scope)
    }

    fn subscribe(
        &self,
        scope: &Url,
        options: &PushSubscriptionOptions,
    ) -> impl Future<Output = PushResult<PushSubscription>> + Send {
        (**self).subscribe(scope, options)
    }

    fn unsubscribe(&self, scope: &Url) -> impl Future<Output = PushResult<bool>> + Send {
        (**self).unsubscribe(scope)
    }
}

impl<F: Fetcher + 'static> PushPlatform for ServiceWorkerContainer<F> {
    fn supported(&self) -> bool {
        self.push_supported()
    }

    async fn register(&self, script_path: &str) -> PushResult<Url> {
        Ok(ServiceWorkerContainer::register(self, script_path).await?)
    }

    async fn ready(&self) -> PushResult<Url> {
        Ok(ServiceWorkerContainer::ready(self).await?)
    }

    async fn get_subscription(&self, scope: &Url) -> PushResult<Option<PushSubscription>> {
        Ok(ServiceWorkerContainer::get_subscription(self, scope).await?)
    }

    async fn subscribe(
        &self,
        scope: &Url,
        options: &PushSubscriptionOptions,
    ) -> PushResult<PushSubscription> {
        Ok(ServiceWorkerContainer::subscribe(self, scope, options).await?)
    }

    async fn unsubscribe(&self, scope: &Url) -> PushResult<bool> {
        Ok(ServiceWorkerContainer::unsubscribe(self, scope).await?)
    }
}
