//! Push manager of a registration.
//!
//! Stands in for the browser's push service client: it issues endpoints and
//! key material, and holds at most one active subscription.

use rand::Rng;
use std::fmt::Write as _;
use tracing::{debug, info};
use url::Url;

use crate::ServiceWorkerError;

/// Names accepted by [`PushSubscription::get_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushEncryptionKeyName {
    P256dh,
    Auth,
}

/// Options for `pushManager.subscribe()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSubscriptionOptions {
    pub user_visible_only: bool,
    pub application_server_key: String,
}

impl PushSubscriptionOptions {
    pub fn visible(application_server_key: impl Into<String>) -> Self {
        Self {
            user_visible_only: true,
            application_server_key: application_server_key.into(),
        }
    }
}

/// A platform-issued push subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSubscription {
    endpoint: Url,
    application_server_key: String,
    p256dh: Vec<u8>,
    auth: Vec<u8>,
}

impl PushSubscription {
    pub fn new(
        endpoint: Url,
        application_server_key: impl Into<String>,
        p256dh: Vec<u8>,
        auth: Vec<u8>,
    ) -> Self {
        Self {
            endpoint,
            application_server_key: application_server_key.into(),
            p256dh,
            auth,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn application_server_key(&self) -> &str {
        &self.application_server_key
    }

    /// Raw key material.
    pub fn get_key(&self, name: PushEncryptionKeyName) -> &[u8] {
        match name {
            PushEncryptionKeyName::P256dh => &self.p256dh,
            PushEncryptionKeyName::Auth => &self.auth,
        }
    }
}

#[derive(Debug)]
pub struct PushManager {
    service_url: Url,
    subscription: Option<PushSubscription>,
}

impl PushManager {
    pub fn new(service_url: Url) -> Self {
        Self {
            service_url,
            subscription: None,
        }
    }

    /// Subscribe, or return the active subscription when it was created for
    /// the same application server key.
    pub fn subscribe(
        &mut self,
        options: &PushSubscriptionOptions,
    ) -> Result<PushSubscription, ServiceWorkerError> {
        if !options.user_visible_only {
            return Err(ServiceWorkerError::PushError(
                "userVisibleOnly must be true".to_string(),
            ));
        }
        if options.application_server_key.is_empty() {
            return Err(ServiceWorkerError::PushError(
                "applicationServerKey is required".to_string(),
            ));
        }

        if let Some(existing) = &self.subscription {
            if existing.application_server_key == options.application_server_key {
                debug!(endpoint = %existing.endpoint, "Returning active push subscription");
                return Ok(existing.clone());
            }
            return Err(ServiceWorkerError::StateError(
                "A subscription with a different applicationServerKey already exists".to_string(),
            ));
        }

        let subscription = self.issue(&options.application_server_key)?;
        info!(endpoint = %subscription.endpoint, "Push subscription created");
        self.subscription = Some(subscription.clone());
        Ok(subscription)
    }

    pub fn get_subscription(&self) -> Option<PushSubscription> {
        self.subscription.clone()
    }

    /// Drop the active subscription. Returns whether one existed.
    pub fn unsubscribe(&mut self) -> bool {
        match self.subscription.take() {
            Some(subscription) => {
                info!(endpoint = %subscription.endpoint, "Push subscription removed");
                true
            }
            None => false,
        }
    }

    fn issue(&self, application_server_key: &str) -> Result<PushSubscription, ServiceWorkerError> {
        let mut rng = rand::thread_rng();

        let mut token = [0u8; 24];
        rng.fill(&mut token[..]);
        let token = token.iter().fold(String::with_capacity(48), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        });
        let endpoint = self
            .service_url
            .join(&token)
            .map_err(|e| ServiceWorkerError::PushError(e.to_string()))?;

        // Uncompressed P-256 point: 0x04 || X || Y.
        let mut p256dh = vec![0u8; 65];
        rng.fill(&mut p256dh[1..]);
        p256dh[0] = 0x04;

        let mut auth = vec![0u8; 16];
        rng.fill(&mut auth[..]);

        Ok(PushSubscription::new(
            endpoint,
            application_server_key,
            p256dh,
            auth,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PushManager {
        PushManager::new(Url::parse("https://push.anomo.world/wpush/v2/").unwrap())
    }

    #[test]
    fn test_subscribe_issues_endpoint_and_keys() {
        let mut manager = manager();
        let sub = manager.subscribe(&PushSubscriptionOptions::visible("key")).unwrap();

        assert!(sub
            .endpoint()
            .as_str()
            .starts_with("https://push.anomo.world/wpush/v2/"));
        assert_eq!(sub.get_key(PushEncryptionKeyName::P256dh).len(), 65);
        assert_eq!(sub.get_key(PushEncryptionKeyName::P256dh)[0], 0x04);
        assert_eq!(sub.get_key(PushEncryptionKeyName::Auth).len(), 16);
    }

    #[test]
    fn test_subscribe_twice_returns_same_subscription() {
        let mut manager = manager();
        let first = manager.subscribe(&PushSubscriptionOptions::visible("key")).unwrap();
        let second = manager.subscribe(&PushSubscriptionOptions::visible("key")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_subscribe_with_other_key_is_rejected() {
        let mut manager = manager();
        manager.subscribe(&PushSubscriptionOptions::visible("key")).unwrap();
        let err = manager
            .subscribe(&PushSubscriptionOptions::visible("other"))
            .unwrap_err();
        assert!(matches!(err, ServiceWorkerError::StateError(_)));
    }

    #[test]
    fn test_user_visible_only_is_required() {
        let mut manager = manager();
        let options = PushSubscriptionOptions {
            user_visible_only: false,
            application_server_key: "key".to_string(),
        };
        assert!(manager.subscribe(&options).is_err());
        assert!(manager.get_subscription().is_none());
    }

    #[test]
    fn test_unsubscribe() {
        let mut manager = manager();
        assert!(!manager.unsubscribe());
        let first = manager.subscribe(&PushSubscriptionOptions::visible("key")).unwrap();
        assert!(manager.unsubscribe());
        assert!(manager.get_subscription().is_none());

        let second = manager.subscribe(&PushSubscriptionOptions::visible("key")).unwrap();
        assert_ne!(first.endpoint(), second.endpoint());
    }
}
