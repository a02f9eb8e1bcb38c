//! Push subscription manager.
//!
//! Drives the platform's worker registration and push manager, then mirrors
//! the resulting subscription into the user's settings row so the backend
//! can address pushes to it.

use anomo_common::with_timeout;
use anomo_core::{AnomoConfig, PushConfig, StoredSubscription};
use anomo_sw::PushSubscriptionOptions;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::{PushError, PushResult};
use crate::identity::IdentityProvider;
use crate::platform::PushPlatform;
use crate::settings::SettingsStore;
use crate::subscription::stored_subscription;

pub struct SubscriptionManager<P, I, S> {
    platform: P,
    identity: I,
    settings: S,
    config: PushConfig,
    script_path: String,
}

impl<P, I, S> SubscriptionManager<P, I, S>
where
    P: PushPlatform,
    I: IdentityProvider,
    S: SettingsStore,
{
    pub fn new(platform: P, identity: I, settings: S, config: &AnomoConfig) -> Self {
        Self {
            platform,
            identity,
            settings,
            config: config.push.clone(),
            script_path: config.worker.script_path.clone(),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    fn timeout(&self) -> Duration {
        self.config.operation_timeout()
    }

    /// Subscribe this device and store the subscription for the current user.
    ///
    /// Returns `false` on any failure; the cause is logged.
    pub async fn subscribe(&self) -> bool {
        match self.try_subscribe().await {
            Ok(stored) => {
                info!(endpoint = %stored.endpoint, "Subscribed to push notifications");
                true
            }
            Err(e) => {
                error!(error = %e, "Error subscribing to push notifications");
                false
            }
        }
    }

    /// Remove this device's subscription and clear the stored copy.
    ///
    /// Having no subscription counts as success.
    pub async fn unsubscribe(&self) -> bool {
        match self.try_unsubscribe().await {
            Ok(removed) => {
                info!(removed, "Unsubscribed from push notifications");
                true
            }
            Err(e) => {
                error!(error = %e, "Error unsubscribing from push notifications");
                false
            }
        }
    }

    pub async fn try_subscribe(&self) -> PushResult<StoredSubscription> {
        if !self.platform.supported() {
            return Err(PushError::Unsupported);
        }
        let timeout = self.timeout();

        with_timeout(timeout, || self.platform.register(&self.script_path)).await??;
        let scope = with_timeout(timeout, || self.platform.ready()).await??;

        let existing = with_timeout(timeout, || self.platform.get_subscription(&scope)).await??;
        let subscription = match existing {
            Some(subscription) => {
                debug!(endpoint = %subscription.endpoint(), "Reusing active push subscription");
                subscription
            }
            None => {
                let options = PushSubscriptionOptions::visible(&self.config.vapid_public_key);
                with_timeout(timeout, || self.platform.subscribe(&scope, &options)).await??
            }
        };
        let stored = stored_subscription(&subscription);

        let user = with_timeout(timeout, || self.identity.current_user())
            .await??
            .ok_or(PushError::Unauthenticated)?;

        with_timeout(timeout, || self.settings.ensure_settings(&user.id)).await??;
        with_timeout(timeout, || {
            self.settings.set_push_subscription(&user.id, Some(&stored))
        })
        .await??;

        Ok(stored)
    }

    /// Returns whether a subscription was removed.
    pub async fn try_unsubscribe(&self) -> PushResult<bool> {
        let timeout = self.timeout();

        let scope = with_timeout(timeout, || self.platform.ready()).await??;
        let Some(subscription) =
            with_timeout(timeout, || self.platform.get_subscription(&scope)).await??
        else {
            debug!("No push subscription to remove");
            return Ok(false);
        };

        with_timeout(timeout, || self.platform.unsubscribe(&scope)).await??;
        debug!(endpoint = %subscription.endpoint(), "Platform subscription removed");

        let user = with_timeout(timeout, || self.identity.current_user())
            .await??
            .ok_or(PushError::Unauthenticated)?;

        with_timeout(timeout, || self.settings.set_push_subscription(&user.id, None)).await??;
        Ok(true)
    }
}
