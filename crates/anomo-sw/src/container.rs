//! Service worker container (`navigator.serviceWorker`).
//!
//! Owns the platform side of every registration: the lifecycle records, the
//! running [`CacheWorker`] per scope, and the resources the workers share.
//! Events for the page are delivered on an unbounded channel.

use anomo_core::{AnomoConfig, WorkerConfig};
use anomo_net::Fetcher;
use hashbrown::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::CacheStorage;
use crate::clients::{Client, Clients};
use crate::notifications::{NotificationId, NotificationTray};
use crate::push::{PushSubscription, PushSubscriptionOptions};
use crate::registration::{ServiceWorker, ServiceWorkerRegistration};
use crate::worker::{CacheWorker, FetchEvent, FetchResponse};
use crate::{ServiceWorkerError, ServiceWorkerId, ServiceWorkerState};

/// What the hosting platform supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub service_worker: bool,
    pub push: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            service_worker: true,
            push: true,
        }
    }
}

/// Service worker events.
#[derive(Debug, Clone)]
pub enum ServiceWorkerEvent {
    /// State changed.
    StateChange {
        registration_scope: String,
        worker_id: ServiceWorkerId,
        new_state: ServiceWorkerState,
    },
    /// A new version started installing.
    UpdateFound { registration_scope: String },
    /// A version failed to install; the previous one keeps control.
    InstallFailed {
        registration_scope: String,
        error: String,
    },
    /// A new version took control of the scope.
    ControllerChange { registration_scope: String },
    /// The push subscription of a registration changed.
    PushSubscriptionChange {
        registration_scope: String,
        endpoint: Option<Url>,
    },
}

/// Service worker container.
pub struct ServiceWorkerContainer<F> {
    origin: Url,
    config: WorkerConfig,
    push_service_url: Url,
    capabilities: Capabilities,
    fetcher: Arc<F>,

    /// Registrations by scope.
    registrations: Arc<RwLock<HashMap<String, ServiceWorkerRegistration>>>,

    /// Install jobs run one at a time per scope.
    jobs: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,

    /// Running worker per scope.
    workers: Arc<RwLock<HashMap<String, Arc<CacheWorker<F>>>>>,

    /// Cache storage.
    pub caches: Arc<RwLock<CacheStorage>>,

    /// Clients.
    pub clients: Arc<RwLock<Clients>>,

    /// Notification tray.
    pub notifications: Arc<NotificationTray>,

    /// Scope of the most recently activated registration.
    ready_tx: watch::Sender<Option<Url>>,

    /// Event sender for state changes.
    event_tx: mpsc::UnboundedSender<ServiceWorkerEvent>,
}

impl<F: Fetcher + 'static> ServiceWorkerContainer<F> {
    /// Create a new container.
    pub fn new(
        config: &AnomoConfig,
        fetcher: F,
    ) -> (Self, mpsc::UnboundedReceiver<ServiceWorkerEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (ready_tx, _) = watch::channel(None);

        (
            Self {
                origin: config.origin.clone(),
                config: config.worker.clone(),
                push_service_url: config.push.push_service_url.clone(),
                capabilities: Capabilities::default(),
                fetcher: Arc::new(fetcher),
                registrations: Arc::new(RwLock::new(HashMap::new())),
                jobs: Mutex::new(HashMap::new()),
                workers: Arc::new(RwLock::new(HashMap::new())),
                caches: Arc::new(RwLock::new(CacheStorage::new())),
                clients: Arc::new(RwLock::new(Clients::new())),
                notifications: Arc::new(NotificationTray::new()),
                ready_tx,
                event_tx,
            },
            event_rx,
        )
    }

    /// Restrict what the platform supports.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Whether both service workers and push are available.
    pub fn push_supported(&self) -> bool {
        self.capabilities.service_worker && self.capabilities.push
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Register the worker script at `script_path` with the configured
    /// worker settings. Returns the registration scope.
    ///
    /// Registering the version that is already active is a no-op.
    pub async fn register(&self, script_path: &str) -> Result<Url, ServiceWorkerError> {
        self.install_version(script_path, self.config.clone()).await
    }

    /// Roll out a new worker version, typically with a bumped cache name.
    pub async fn deploy(&self, config: WorkerConfig) -> Result<Url, ServiceWorkerError> {
        let script_path = config.script_path.clone();
        self.install_version(&script_path, config).await
    }

    async fn install_version(
        &self,
        script_path: &str,
        config: WorkerConfig,
    ) -> Result<Url, ServiceWorkerError> {
        if !self.capabilities.service_worker {
            return Err(ServiceWorkerError::NotSupported(
                "service workers are unavailable".to_string(),
            ));
        }

        let script_url = self
            .origin
            .join(script_path)
            .map_err(|e| ServiceWorkerError::RegistrationFailed(e.to_string()))?;
        let scope = scope_of(&script_url);
        let scope_key = scope.to_string();

        // A concurrent register of the same version waits here, then sees it current.
        let job = self.job_lock(&scope_key);
        let _job = job.lock().await;

        let worker_id = {
            let mut registrations = self.registrations.write().await;
            let registration = registrations
                .entry(scope_key.clone())
                .or_insert_with(|| {
                    ServiceWorkerRegistration::new(scope.clone(), self.push_service_url.clone())
                });

            if registration.is_current(&script_url, &config.cache_name) {
                debug!(scope = %scope, "Worker version already active");
                return Ok(scope);
            }

            let id = registration.update(script_url, &config.cache_name);
            self.emit(ServiceWorkerEvent::UpdateFound {
                registration_scope: scope_key.clone(),
            });
            self.emit(ServiceWorkerEvent::StateChange {
                registration_scope: scope_key.clone(),
                worker_id: id,
                new_state: ServiceWorkerState::Installing,
            });
            id
        };

        let cache_name = config.cache_name.clone();
        let worker = Arc::new(CacheWorker::new(
            scope.clone(),
            config,
            Arc::clone(&self.caches),
            Arc::clone(&self.notifications),
            Arc::clone(&self.clients),
            Arc::clone(&self.fetcher),
        ));

        // The registration lock is not held across the manifest fetches.
        if let Err(e) = worker.install().await {
            warn!(scope = %scope, error = %e, "Worker install failed");
            if let Some(registration) = self.registrations.write().await.get_mut(&scope_key) {
                registration.install_failed(e.to_string());
            }
            self.emit(ServiceWorkerEvent::InstallFailed {
                registration_scope: scope_key,
                error: e.to_string(),
            });
            return Err(e);
        }

        {
            let mut registrations = self.registrations.write().await;
            let registration = registrations
                .get_mut(&scope_key)
                .ok_or_else(|| ServiceWorkerError::NotFound(scope_key.clone()))?;

            if registration.installing.as_ref().map(|w| w.id) != Some(worker_id) {
                return Err(ServiceWorkerError::StateError(
                    "superseded by a newer registration".to_string(),
                ));
            }

            registration.install_complete();
            registration.activate();
            self.workers
                .write()
                .await
                .insert(scope_key.clone(), Arc::clone(&worker));
        }

        self.emit(ServiceWorkerEvent::StateChange {
            registration_scope: scope_key.clone(),
            worker_id,
            new_state: ServiceWorkerState::Activated,
        });

        worker.activate().await;
        self.ready_tx.send_replace(Some(scope.clone()));
        self.emit(ServiceWorkerEvent::ControllerChange {
            registration_scope: scope_key,
        });

        info!(scope = %scope, cache = %cache_name, "Worker activated");
        Ok(scope)
    }

    /// Wait until some registration has an active worker; returns its scope.
    ///
    /// Never resolves if nothing ever activates. Callers bound it.
    pub async fn ready(&self) -> Result<Url, ServiceWorkerError> {
        let mut rx = self.ready_tx.subscribe();
        let scope = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|e| ServiceWorkerError::StateError(e.to_string()))?;
        scope
            .clone()
            .ok_or_else(|| ServiceWorkerError::StateError("no active worker".to_string()))
    }

    /// Scope of the registration controlling `url`.
    pub async fn get_registration(&self, url: &Url) -> Option<Url> {
        let registrations = self.registrations.read().await;
        registrations
            .values()
            .filter(|r| url.as_str().starts_with(r.scope.as_str()))
            .max_by_key(|r| r.scope.as_str().len())
            .map(|r| r.scope.clone())
    }

    /// Get all registration scopes.
    pub async fn get_registrations(&self) -> Vec<Url> {
        self.registrations
            .read()
            .await
            .values()
            .map(|r| r.scope.clone())
            .collect()
    }

    /// Active worker record of a registration.
    pub async fn active_worker(&self, scope: &Url) -> Option<ServiceWorker> {
        self.registrations
            .read()
            .await
            .get(scope.as_str())
            .and_then(|r| r.get_active().cloned())
    }

    /// Versions of a registration that became redundant, oldest first.
    pub async fn redundant_workers(&self, scope: &Url) -> Vec<ServiceWorker> {
        self.registrations
            .read()
            .await
            .get(scope.as_str())
            .map(|r| r.redundant.clone())
            .unwrap_or_default()
    }

    // ==================== Functional events ====================

    /// Route a fetch to the worker controlling the requesting client (or the
    /// request URL when the client is unknown). `None` means uncontrolled:
    /// the caller goes to the network itself.
    pub async fn dispatch_fetch(&self, event: FetchEvent) -> Option<FetchResponse> {
        let client_url = match event.client_id.as_deref() {
            Some(id) => self.clients.read().await.get(id).map(|c| c.url.clone()),
            None => None,
        };
        let url = client_url.unwrap_or_else(|| event.request.url.clone());

        let worker = self.controller_for(&url).await?;
        Some(worker.handle_fetch(event).await)
    }

    /// Deliver a push message sent to `endpoint`.
    pub async fn dispatch_push(&self, endpoint: &Url, data: &[u8]) -> Option<NotificationId> {
        let scope = {
            let registrations = self.registrations.read().await;
            registrations
                .iter()
                .find(|(_, r)| {
                    r.push_manager
                        .get_subscription()
                        .is_some_and(|s| s.endpoint() == endpoint)
                })
                .map(|(scope, _)| scope.clone())
        };

        let Some(scope) = scope else {
            warn!(%endpoint, "Push for unknown subscription");
            return None;
        };
        let worker = self.workers.read().await.get(&scope).cloned()?;
        worker.handle_push(data).await
    }

    /// Deliver a click on a shown notification.
    pub async fn dispatch_notification_click(&self, id: NotificationId) -> Option<Client> {
        let notification = self.notifications.get(id).await?;
        let worker = self.workers.read().await.get(&notification.scope).cloned();
        match worker {
            Some(worker) => worker.handle_notification_click(id).await,
            None => {
                warn!(scope = %notification.scope, "No worker for notification click");
                None
            }
        }
    }

    async fn controller_for(&self, url: &Url) -> Option<Arc<CacheWorker<F>>> {
        let workers = self.workers.read().await;
        workers
            .iter()
            .filter(|(scope, _)| url.as_str().starts_with(scope.as_str()))
            .max_by_key(|(scope, _)| scope.len())
            .map(|(_, worker)| Arc::clone(worker))
    }

    // ==================== Push manager ====================

    /// `registration.pushManager.subscribe()`.
    pub async fn subscribe(
        &self,
        scope: &Url,
        options: &PushSubscriptionOptions,
    ) -> Result<PushSubscription, ServiceWorkerError> {
        if !self.capabilities.push {
            return Err(ServiceWorkerError::NotSupported(
                "push is unavailable".to_string(),
            ));
        }

        let mut registrations = self.registrations.write().await;
        let registration = registrations
            .get_mut(scope.as_str())
            .ok_or_else(|| ServiceWorkerError::NotFound(scope.to_string()))?;
        if registration.get_active().is_none() {
            return Err(ServiceWorkerError::StateError(
                "subscribing requires an active worker".to_string(),
            ));
        }

        let before = registration.push_manager.get_subscription();
        let subscription = registration.push_manager.subscribe(options)?;
        if before.as_ref() != Some(&subscription) {
            self.emit(ServiceWorkerEvent::PushSubscriptionChange {
                registration_scope: scope.to_string(),
                endpoint: Some(subscription.endpoint().clone()),
            });
        }
        Ok(subscription)
    }

    /// `registration.pushManager.getSubscription()`.
    pub async fn get_subscription(
        &self,
        scope: &Url,
    ) -> Result<Option<PushSubscription>, ServiceWorkerError> {
        let registrations = self.registrations.read().await;
        let registration = registrations
            .get(scope.as_str())
            .ok_or_else(|| ServiceWorkerError::NotFound(scope.to_string()))?;
        Ok(registration.push_manager.get_subscription())
    }

    /// `subscription.unsubscribe()`. Returns whether a subscription existed.
    pub async fn unsubscribe(&self, scope: &Url) -> Result<bool, ServiceWorkerError> {
        let mut registrations = self.registrations.write().await;
        let registration = registrations
            .get_mut(scope.as_str())
            .ok_or_else(|| ServiceWorkerError::NotFound(scope.to_string()))?;

        let removed = registration.push_manager.unsubscribe();
        if removed {
            self.emit(ServiceWorkerEvent::PushSubscriptionChange {
                registration_scope: scope.to_string(),
                endpoint: None,
            });
        }
        Ok(removed)
    }

    /// Unregister a service worker. Its caches stay in storage.
    pub async fn unregister(&self, scope: &Url) -> bool {
        let removed = self.registrations.write().await.remove(scope.as_str());
        let Some(mut registration) = removed else {
            return false;
        };
        registration.unregister();
        self.workers.write().await.remove(scope.as_str());
        self.ready_tx.send_if_modified(|ready| {
            if ready.as_ref() == Some(scope) {
                *ready = None;
                true
            } else {
                false
            }
        });
        info!(scope = %scope, "Worker unregistered");
        true
    }

    fn job_lock(&self, scope: &str) -> Arc<AsyncMutex<()>> {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(jobs.entry(scope.to_string()).or_default())
    }

    fn emit(&self, event: ServiceWorkerEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Default scope of a script: its directory.
fn scope_of(script_url: &Url) -> Url {
    let mut scope = script_url.clone();
    let dir = match script_url.path().rfind('/') {
        Some(i) => &script_url.path()[..=i],
        None => "/",
    };
    scope.set_path(dir);
    scope.set_query(None);
    scope.set_fragment(None);
    scope
}

#[cfg(test)]
mod tests {
    use super::*;
    use anomo_net::{NetError, Request, Response};
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};
    use std::future::Future;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    const PAYLOAD: &[u8] = br#"{"title":"Alice liked your post","body":"...","type":"like","url":"/post/1"}"#;

    /// Origin server; `/icon-512.png` fails while `broken` is set.
    #[derive(Default)]
    struct Origin {
        broken: AtomicBool,
        offline: AtomicBool,
    }

    impl Fetcher for Origin {
        fn fetch(&self, request: Request) -> impl Future<Output = Result<Response, NetError>> + Send {
            let broken = self.broken.load(Ordering::SeqCst);
            let offline = self.offline.load(Ordering::SeqCst);
            async move {
                if offline {
                    return Err(NetError::Offline);
                }
                let status = if broken && request.url.path() == "/icon-512.png" {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::OK
                };
                let body = Bytes::from(format!("{} {}", request.url.path(), status.as_u16()));
                Ok(Response::new(request.url, status, HeaderMap::new(), body))
            }
        }
    }

    fn container() -> (
        ServiceWorkerContainer<Origin>,
        mpsc::UnboundedReceiver<ServiceWorkerEvent>,
    ) {
        ServiceWorkerContainer::new(&AnomoConfig::default(), Origin::default())
    }

    fn root() -> Url {
        Url::parse("https://anomo.world/").unwrap()
    }

    #[test]
    fn test_scope_of_script() {
        let script = Url::parse("https://anomo.world/sw.js").unwrap();
        assert_eq!(scope_of(&script).as_str(), "https://anomo.world/");

        let nested = Url::parse("https://anomo.world/app/sw.js?v=2").unwrap();
        assert_eq!(scope_of(&nested).as_str(), "https://anomo.world/app/");
    }

    #[tokio::test]
    async fn test_register_activates_and_resolves_ready() {
        let (container, mut events) = container();
        let scope = container.register("/sw.js").await.unwrap();
        assert_eq!(scope, root());

        assert_eq!(container.ready().await.unwrap(), root());
        let active = container.active_worker(&scope).await.unwrap();
        assert!(active.is_active());
        assert_eq!(active.cache_name, "anomo-cache-v1");

        assert!(matches!(
            events.recv().await,
            Some(ServiceWorkerEvent::UpdateFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_register_twice_is_noop() {
        let (container, _events) = container();
        container.register("/sw.js").await.unwrap();
        let first = container.active_worker(&root()).await.unwrap();

        container.register("/sw.js").await.unwrap();
        let second = container.active_worker(&root()).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(container.redundant_workers(&root()).await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_register_installs_once() {
        let (container, _events) = container();
        let (first, second) = tokio::join!(container.register("/sw.js"), container.register("/sw.js"));
        assert_eq!(first.unwrap(), root());
        assert_eq!(second.unwrap(), root());

        assert!(container.active_worker(&root()).await.unwrap().is_active());
        assert!(container.redundant_workers(&root()).await.is_empty());
    }

    #[tokio::test]
    async fn test_deploy_during_register_wins() {
        let (container, _events) = container();
        let v2 = WorkerConfig {
            cache_name: "anomo-cache-v2".to_string(),
            ..WorkerConfig::default()
        };
        let (first, second) = tokio::join!(container.register("/sw.js"), container.deploy(v2));
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(
            container.active_worker(&root()).await.unwrap().cache_name,
            "anomo-cache-v2"
        );
        assert_eq!(container.caches.read().await.keys(), vec!["anomo-cache-v2"]);
    }

    #[tokio::test]
    async fn test_register_without_service_worker_support() {
        let (container, _events) = container();
        let container = container.with_capabilities(Capabilities {
            service_worker: false,
            push: false,
        });
        assert!(!container.push_supported());
        let err = container.register("/sw.js").await.unwrap_err();
        assert!(matches!(err, ServiceWorkerError::NotSupported(_)));
    }

    #[tokio::test]
    async fn test_ready_waits_for_activation() {
        let (container, _events) = container();
        let pending = tokio::time::timeout(Duration::from_millis(20), container.ready()).await;
        assert!(pending.is_err());

        container.register("/sw.js").await.unwrap();
        let ready = tokio::time::timeout(Duration::from_millis(100), container.ready()).await;
        assert_eq!(ready.unwrap().unwrap(), root());
    }

    #[tokio::test]
    async fn test_failed_first_install() {
        let (container, _events) = container();
        container.fetcher.broken.store(true, Ordering::SeqCst);

        let err = container.register("/sw.js").await.unwrap_err();
        assert!(matches!(err, ServiceWorkerError::InstallFailed(_)));
        assert!(container.active_worker(&root()).await.is_none());
        assert!(container.caches.read().await.keys().is_empty());

        let redundant = container.redundant_workers(&root()).await;
        assert_eq!(redundant.len(), 1);
        assert!(redundant[0].is_redundant());
    }

    #[tokio::test]
    async fn test_failed_update_keeps_previous_version() {
        let (container, mut events) = container();
        container.register("/sw.js").await.unwrap();
        container.fetcher.broken.store(true, Ordering::SeqCst);

        let v2 = WorkerConfig {
            cache_name: "anomo-cache-v2".to_string(),
            ..WorkerConfig::default()
        };
        assert!(container.deploy(v2).await.is_err());

        let active = container.active_worker(&root()).await.unwrap();
        assert_eq!(active.cache_name, "anomo-cache-v1");
        assert_eq!(container.caches.read().await.keys(), vec!["anomo-cache-v1"]);

        let mut saw_failure = false;
        while let Ok(event) = events.try_recv() {
            saw_failure |= matches!(event, ServiceWorkerEvent::InstallFailed { .. });
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn test_deploy_bumps_cache() {
        let (container, _events) = container();
        container.register("/sw.js").await.unwrap();

        let v2 = WorkerConfig {
            cache_name: "anomo-cache-v2".to_string(),
            ..WorkerConfig::default()
        };
        container.deploy(v2).await.unwrap();

        assert_eq!(
            container.active_worker(&root()).await.unwrap().cache_name,
            "anomo-cache-v2"
        );
        assert_eq!(container.caches.read().await.keys(), vec!["anomo-cache-v2"]);
        assert_eq!(container.redundant_workers(&root()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_uncontrolled_fetch_returns_none() {
        let (container, _events) = container();
        let event = FetchEvent::new(Request::get(root()));
        assert!(container.dispatch_fetch(event).await.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_fetch_offline() {
        let (container, _events) = container();
        container.register("/sw.js").await.unwrap();
        container.fetcher.offline.store(true, Ordering::SeqCst);

        let event = FetchEvent::new(Request::navigate(root().join("/post/3").unwrap()));
        let response = container.dispatch_fetch(event).await.unwrap();
        assert!(response.is_from_cache());
        assert_eq!(response.body.as_ref(), b"/index.html 200");
    }

    #[tokio::test]
    async fn test_cross_origin_fetch_uses_client_controller() {
        let (container, _events) = container();
        container.register("/sw.js").await.unwrap();
        let page = container
            .clients
            .write()
            .await
            .open_window("https://anomo.world/home")
            .unwrap();

        let mut event = FetchEvent::new(Request::get(
            Url::parse("https://cdn.example.com/font.woff2").unwrap(),
        ));
        assert!(container.dispatch_fetch(event.clone()).await.is_none());

        event.client_id = Some(page.id);
        let response = container.dispatch_fetch(event).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_push_subscription_requires_active_worker() {
        let (container, _events) = container();
        let options = PushSubscriptionOptions::visible("key");
        assert!(container.subscribe(&root(), &options).await.is_err());

        container.register("/sw.js").await.unwrap();
        let first = container.subscribe(&root(), &options).await.unwrap();
        let second = container.subscribe(&root(), &options).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            container.get_subscription(&root()).await.unwrap(),
            Some(first)
        );

        assert!(container.unsubscribe(&root()).await.unwrap());
        assert!(!container.unsubscribe(&root()).await.unwrap());
    }

    #[tokio::test]
    async fn test_subscribe_without_push_support() {
        let (container, _events) = container();
        let container = container.with_capabilities(Capabilities {
            service_worker: true,
            push: false,
        });
        container.register("/sw.js").await.unwrap();
        let err = container
            .subscribe(&root(), &PushSubscriptionOptions::visible("key"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceWorkerError::NotSupported(_)));
    }

    #[tokio::test]
    async fn test_push_and_click_round_trip() {
        let (container, _events) = container();
        container.register("/sw.js").await.unwrap();
        let subscription = container
            .subscribe(&root(), &PushSubscriptionOptions::visible("key"))
            .await
            .unwrap();

        let id = container
            .dispatch_push(subscription.endpoint(), PAYLOAD)
            .await
            .unwrap();
        let client = container.dispatch_notification_click(id).await.unwrap();
        assert_eq!(client.url.as_str(), "https://anomo.world/post/1");
        assert!(container.notifications.is_empty().await);
    }

    #[tokio::test]
    async fn test_push_to_unknown_endpoint_is_dropped() {
        let (container, _events) = container();
        container.register("/sw.js").await.unwrap();
        let endpoint = Url::parse("https://push.anomo.world/wpush/v2/gone").unwrap();
        assert!(container.dispatch_push(&endpoint, PAYLOAD).await.is_none());
    }

    #[tokio::test]
    async fn test_unregister() {
        let (container, _events) = container();
        container.register("/sw.js").await.unwrap();
        let subscription = container
            .subscribe(&root(), &PushSubscriptionOptions::visible("key"))
            .await
            .unwrap();

        assert!(container.unregister(&root()).await);
        assert!(!container.unregister(&root()).await);
        assert!(container.get_registrations().await.is_empty());
        assert!(container
            .dispatch_push(subscription.endpoint(), PAYLOAD)
            .await
            .is_none());
        let pending = tokio::time::timeout(Duration::from_millis(20), container.ready()).await;
        assert!(pending.is_err());
    }
}
