//! Wire contracts shared between the worker, the subscription manager and
//! the remote services.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Grouping tag used when a push payload carries no `type`.
pub const DEFAULT_TAG: &str = "default";

/// Grouping tag for direct messages.
pub const CHAT_TAG: &str = "chat";

/// JSON body of a push message.
///
/// `title` and `body` are required; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PushPayload {
    /// Parse and validate a raw push message body.
    pub fn parse(data: &[u8]) -> CoreResult<Self> {
        serde_json::from_slice(data)
            .map_err(|e| CoreError::payload(format!("invalid push payload: {e}")))
    }

    /// Grouping tag for this payload. An absent or empty `type` means `"default"`.
    pub fn tag(&self) -> &str {
        match self.kind.as_deref() {
            Some(kind) if !kind.is_empty() => kind,
            _ => DEFAULT_TAG,
        }
    }

    /// URL a click on the resulting notification should open.
    pub fn target_url(&self) -> &str {
        match self.url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => "/",
        }
    }
}

/// Data attached to every shown notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Messages folded into this notification; absent means one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl NotificationData {
    pub fn new(url: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: kind.into(),
            count: None,
        }
    }

    /// Number of push messages this notification stands for.
    pub fn messages(&self) -> usize {
        self.count.unwrap_or(1)
    }
}

/// Base64-encoded subscription keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Push subscription as mirrored into `settings.push_subscription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// Request body sent to the push dispatch function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushDispatchRequest {
    pub subscription: StoredSubscription,
    pub title: String,
    pub body: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PushDispatchRequest {
    pub fn new(
        subscription: StoredSubscription,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            subscription,
            title: title.into(),
            body: body.into(),
            kind: None,
            url: None,
        }
    }

    /// Set the notification type (grouping tag).
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Set the click-through URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// The dispatch function rejects requests without a title, body or endpoint.
    pub fn validate(&self) -> CoreResult<()> {
        if self.subscription.endpoint.is_empty() {
            return Err(CoreError::payload("subscription endpoint is empty"));
        }
        if self.title.is_empty() || self.body.is_empty() {
            return Err(CoreError::payload("Missing required fields"));
        }
        Ok(())
    }
}

/// Response body of the push dispatch function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One row of the remote `settings` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsRecord {
    pub user_id: String,
    #[serde(default)]
    pub notifications_enabled: bool,
    #[serde(default)]
    pub email_notifications: bool,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub push_subscription: Option<StoredSubscription>,
}

fn default_theme() -> String {
    "light".to_string()
}

impl SettingsRecord {
    /// A fresh row with the table defaults.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            notifications_enabled: false,
            email_notifications: false,
            theme: default_theme(),
            push_subscription: None,
        }
    }
}

/// Authenticated user as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}
