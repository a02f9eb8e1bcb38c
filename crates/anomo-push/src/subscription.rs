//! Conversion of platform subscriptions into the stored wire shape.

use anomo_core::{StoredSubscription, SubscriptionKeys};
use anomo_sw::{PushEncryptionKeyName, PushSubscription};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Flatten a subscription into `{ endpoint, keys: { p256dh, auth } }` with
/// standard padded base64 key material.
pub fn stored_subscription(subscription: &PushSubscription) -> StoredSubscription {
    StoredSubscription {
        endpoint: subscription.endpoint().to_string(),
        keys: SubscriptionKeys {
            p256dh: STANDARD.encode(subscription.get_key(PushEncryptionKeyName::P256dh)),
            auth: STANDARD.encode(subscription.get_key(PushEncryptionKeyName::Auth)),
        },
    }
}
