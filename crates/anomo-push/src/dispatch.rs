//! Sending pushes through the hosted dispatch function.

use anomo_core::{DispatchResponse, PushConfig, PushDispatchRequest, CHAT_TAG};
use anomo_net::{Fetcher, Request};
use http::Method;
use tracing::{debug, info, warn};

use crate::backend::BackendClient;
use crate::error::{PushError, PushResult};
use crate::settings::SettingsStore;

/// Client of the `send-push-notification` function.
pub struct PushDispatcher<F> {
    backend: BackendClient<F>,
    function: String,
}

impl<F: Fetcher> PushDispatcher<F> {
    pub fn new(backend: BackendClient<F>, config: &PushConfig) -> Self {
        Self {
            backend,
            function: config.dispatch_function.clone(),
        }
    }

    /// Send one push. No retry: a non-2xx answer is returned as
    /// [`PushError::Dispatch`] with the function's response body.
    pub async fn dispatch(&self, request: &PushDispatchRequest) -> PushResult<DispatchResponse> {
        request.validate()?;

        let url = self
            .backend
            .endpoint(&format!("functions/v1/{}", self.function))?;
        let response = self
            .backend
            .send(Request::json(url, Method::POST, request)?)
            .await?;

        if !response.ok() {
            let body = response.text().unwrap_or_default();
            warn!(status = %response.status, %body, "Push dispatch rejected");
            return Err(PushError::Dispatch {
                status: response.status.as_u16(),
                body,
            });
        }

        let reply = if response.body().is_empty() {
            DispatchResponse::default()
        } else {
            response.json()?
        };
        debug!(endpoint = %request.subscription.endpoint, message = ?reply.message, "Push dispatched");
        Ok(reply)
    }
}

/// Push a notification to the recipient of a direct message.
pub struct ChatNotifier<S, F> {
    settings: S,
    dispatcher: PushDispatcher<F>,
}

impl<S: SettingsStore, F: Fetcher> ChatNotifier<S, F> {
    pub fn new(settings: S, dispatcher: PushDispatcher<F>) -> Self {
        Self {
            settings,
            dispatcher,
        }
    }

    /// Returns whether a push was sent; recipients without a stored
    /// subscription are skipped.
    pub async fn notify_message(
        &self,
        recipient_id: &str,
        sender_name: Option<&str>,
        content: &str,
    ) -> PushResult<bool> {
        let subscription = self
            .settings
            .fetch_settings(recipient_id)
            .await?
            .and_then(|row| row.push_subscription);

        let Some(subscription) = subscription else {
            debug!(recipient_id, "Recipient has no push subscription");
            return Ok(false);
        };

        let sender = sender_name.filter(|s| !s.is_empty()).unwrap_or("Someone");
        let request = PushDispatchRequest::new(subscription, format!("Message from {sender}"), content)
            .kind(CHAT_TAG);

        self.dispatcher.dispatch(&request).await?;
        info!(recipient_id, "Chat push sent");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::RestSettingsStore;
    use anomo_core::{AnomoConfig, BackendConfig, StoredSubscription, SubscriptionKeys};
    use anomo_net::{LoaderConfig, ResourceLoader};
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> (BackendClient<ResourceLoader>, AnomoConfig) {
        let mut config = AnomoConfig::default();
        config.backend = BackendConfig {
            url: Url::parse(&format!("{}/", server.uri())).unwrap(),
            api_key: "anon-key".to_string(),
            ..BackendConfig::default()
        };
        let loader = ResourceLoader::new(LoaderConfig::default()).unwrap();
        (BackendClient::new(&config.backend, loader), config)
    }

    fn subscription() -> StoredSubscription {
        StoredSubscription {
            endpoint: "https://push.anomo.world/wpush/v2/abc".to_string(),
            keys: SubscriptionKeys {
                p256dh: "BPk=".to_string(),
                auth: "AQI=".to_string(),
            },
        }
    }

    fn subscription_json() -> serde_json::Value {
        json!({
            "endpoint": "https://push.anomo.world/wpush/v2/abc",
            "keys": { "p256dh": "BPk=", "auth": "AQI=" }
        })
    }

    #[tokio::test]
    async fn test_dispatch_posts_to_function() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/functions/v1/send-push-notification"))
            .and(header("apikey", "anon-key"))
            .and(body_json(json!({
                "subscription": subscription_json(),
                "title": "Alice liked your post",
                "body": "...",
                "type": "like",
                "url": "/post/1"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "message": "Notification sent successfully" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (backend, config) = backend(&server);
        let dispatcher = PushDispatcher::new(backend, &config.push);
        let request = PushDispatchRequest::new(subscription(), "Alice liked your post", "...")
            .kind("like")
            .url("/post/1");

        let reply = dispatcher.dispatch(&request).await.unwrap();
        assert_eq!(reply.message.as_deref(), Some("Notification sent successfully"));
    }

    #[tokio::test]
    async fn test_dispatch_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "error": "Received unexpected response code" })),
            )
            .mount(&server)
            .await;

        let (backend, config) = backend(&server);
        let dispatcher = PushDispatcher::new(backend, &config.push);
        let request = PushDispatchRequest::new(subscription(), "t", "b");

        match dispatcher.dispatch(&request).await.unwrap_err() {
            PushError::Dispatch { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("unexpected response code"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_rejects_missing_fields_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (backend, config) = backend(&server);
        let dispatcher = PushDispatcher::new(backend, &config.push);
        let request = PushDispatchRequest::new(subscription(), "", "body");

        assert!(matches!(
            dispatcher.dispatch(&request).await,
            Err(PushError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_chat_notifier_sends_chat_push() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "user_id": "bob", "push_subscription": subscription_json() }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/functions/v1/send-push-notification"))
            .and(body_json(json!({
                "subscription": subscription_json(),
                "title": "Message from alice",
                "body": "hey",
                "type": "chat"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
            .expect(1)
            .mount(&server)
            .await;

        let (backend, config) = backend(&server);
        let notifier = ChatNotifier::new(
            RestSettingsStore::new(backend.clone(), &config.backend),
            PushDispatcher::new(backend, &config.push),
        );
        assert!(notifier.notify_message("bob", Some("alice"), "hey").await.unwrap());
    }

    #[tokio::test]
    async fn test_chat_notifier_skips_unsubscribed_recipient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "user_id": "carol", "push_subscription": null }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (backend, config) = backend(&server);
        let notifier = ChatNotifier::new(
            RestSettingsStore::new(backend.clone(), &config.backend),
            PushDispatcher::new(backend, &config.push),
        );
        assert!(!notifier.notify_message("carol", Some("alice"), "hey").await.unwrap());
    }

    #[tokio::test]
    async fn test_chat_notifier_anonymous_sender() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "user_id": "bob", "push_subscription": subscription_json() }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_json(json!({
                "subscription": subscription_json(),
                "title": "Message from Someone",
                "body": "hey",
                "type": "chat"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let (backend, config) = backend(&server);
        let notifier = ChatNotifier::new(
            RestSettingsStore::new(backend.clone(), &config.backend),
            PushDispatcher::new(backend, &config.push),
        );
        assert!(notifier.notify_message("bob", None, "hey").await.unwrap());
    }
}
