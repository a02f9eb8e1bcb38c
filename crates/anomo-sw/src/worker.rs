//! The cache worker script context.
//!
//! One `CacheWorker` exists per activated version. It holds nothing that must
//! survive a suspension: cached responses live in [`CacheStorage`],
//! notifications in the [`NotificationTray`], windows in [`Clients`]. The
//! per-tag push locks are the only in-memory state, and losing them only
//! reopens the window they close.

use anomo_core::{NotificationData, PushPayload, WorkerConfig, CHAT_TAG};
use anomo_net::{Fetcher, Request, Response};
use bytes::Bytes;
use hashbrown::HashMap;
use http::{Method, StatusCode};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::cache::{CacheEntry, CacheStorage};
use crate::clients::{Client, Clients};
use crate::notifications::{NotificationId, NotificationOptions, NotificationTray};
use crate::ServiceWorkerError;

// ==================== Fetch Event ====================

/// A fetch event.
#[derive(Debug, Clone)]
pub struct FetchEvent {
    /// The intercepted request.
    pub request: Request,

    /// Client ID.
    pub client_id: Option<String>,
}

impl FetchEvent {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            client_id: None,
        }
    }
}

/// Where a fetch response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    /// Neither network nor cache could answer.
    Error,
}

/// Fetch event response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Status code (0 for a network error).
    pub status: u16,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// Response body.
    pub body: Bytes,

    /// Origin of the response.
    pub source: ResponseSource,
}

impl FetchResponse {
    /// Create a network error response.
    pub fn network_error() -> Self {
        Self {
            status: 0,
            headers: HashMap::new(),
            body: Bytes::new(),
            source: ResponseSource::Error,
        }
    }

    /// Create a response from cache entry.
    pub fn from_cache(entry: &CacheEntry) -> Self {
        Self {
            status: entry.status,
            headers: entry.headers.clone(),
            body: Bytes::from(entry.body.clone()),
            source: ResponseSource::Cache,
        }
    }

    /// Create a response from the network.
    pub fn from_network(response: Response) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        Self {
            status: response.status.as_u16(),
            headers,
            body: response.into_bytes(),
            source: ResponseSource::Network,
        }
    }

    pub fn is_from_cache(&self) -> bool {
        self.source == ResponseSource::Cache
    }

    pub fn is_network_error(&self) -> bool {
        self.source == ResponseSource::Error
    }
}

// ==================== Notification copy ====================

/// Title and body for a push, given how many same-tag messages the tray
/// still showed when it arrived.
pub fn grouped_copy(tag: &str, title: &str, body: &str, existing: usize) -> (String, String) {
    if existing == 0 {
        return (title.to_string(), body.to_string());
    }

    let count = existing + 1;
    if tag == CHAT_TAG {
        (
            format!("New messages ({count})"),
            format!("You have {count} unread messages"),
        )
    } else {
        (
            format!("{title} ({count})"),
            format!("You have {count} new notifications"),
        )
    }
}

/// Path a notification click should open.
pub fn resolve_click_target(data: Option<&NotificationData>, chat_deep_link: &str) -> String {
    match data {
        Some(data) if data.kind == CHAT_TAG => chat_deep_link.to_string(),
        Some(data) if !data.url.is_empty() => data.url.clone(),
        _ => "/".to_string(),
    }
}

// ==================== Worker ====================

pub struct CacheWorker<F> {
    scope: Url,
    config: WorkerConfig,
    caches: Arc<RwLock<CacheStorage>>,
    tray: Arc<NotificationTray>,
    clients: Arc<RwLock<Clients>>,
    fetcher: Arc<F>,
    tag_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl<F: Fetcher> CacheWorker<F> {
    pub fn new(
        scope: Url,
        config: WorkerConfig,
        caches: Arc<RwLock<CacheStorage>>,
        tray: Arc<NotificationTray>,
        clients: Arc<RwLock<Clients>>,
        fetcher: Arc<F>,
    ) -> Self {
        Self {
            scope,
            config,
            caches,
            tray,
            clients,
            fetcher,
            tag_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    /// Install event: fetch the whole manifest, then store it in one batch.
    ///
    /// Any failed or non-2xx fetch aborts the install and leaves the cache
    /// untouched.
    pub async fn install(&self) -> Result<usize, ServiceWorkerError> {
        let mut entries = Vec::with_capacity(self.config.manifest.len());

        for path in &self.config.manifest {
            let url = self
                .scope
                .join(path)
                .map_err(|e| ServiceWorkerError::InstallFailed(format!("{path}: {e}")))?;

            let response = self
                .fetcher
                .fetch(Request::get(url.clone()))
                .await
                .map_err(|e| ServiceWorkerError::InstallFailed(format!("{url}: {e}")))?;

            if !response.ok() {
                return Err(ServiceWorkerError::InstallFailed(format!(
                    "{url} returned {}",
                    response.status
                )));
            }

            entries.push(CacheEntry::from_response(&cache_key(&url), &response));
        }

        let count = entries.len();
        self.caches
            .write()
            .await
            .open(&self.config.cache_name)
            .put_all(entries);

        info!(cache = %self.config.cache_name, entries = count, "Install complete");
        Ok(count)
    }

    /// Activate event: drop caches left behind by previous versions.
    pub async fn activate(&self) -> Vec<String> {
        let deleted = self
            .caches
            .write()
            .await
            .retain_only(&self.config.cache_name);
        if !deleted.is_empty() {
            info!(?deleted, "Deleted stale caches");
        }
        deleted
    }

    /// Fetch event.
    ///
    /// Cache hits are served as-is. Navigations that miss go to the network
    /// and fall back to the cached shell; other misses go to the network and
    /// successful same-origin responses are written through.
    pub async fn handle_fetch(&self, event: FetchEvent) -> FetchResponse {
        let request = event.request;
        let key = cache_key(&request.url);
        let cacheable = request.method == Method::GET;

        if cacheable {
            if let Some(entry) = self.caches.read().await.match_request(&key) {
                trace!(url = %key, "Cache hit");
                return FetchResponse::from_cache(entry);
            }
        }

        if request.is_navigation() {
            return self.navigate(request).await;
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if cacheable && self.should_store(&response) {
                    let entry = CacheEntry::from_response(&key, &response);
                    self.caches
                        .write()
                        .await
                        .open(&self.config.cache_name)
                        .put(&key, entry);
                    debug!(url = %key, "Stored network response");
                }
                FetchResponse::from_network(response)
            }
            Err(e) => {
                warn!(url = %key, error = %e, "Network fetch failed");
                FetchResponse::network_error()
            }
        }
    }

    async fn navigate(&self, request: Request) -> FetchResponse {
        let url = request.url.clone();
        match self.fetcher.fetch(request).await {
            Ok(response) => FetchResponse::from_network(response),
            Err(e) => {
                debug!(url = %url, error = %e, "Navigation offline, serving shell");
                let shell = match self.scope.join(&self.config.shell_path) {
                    Ok(shell) => cache_key(&shell),
                    Err(_) => return FetchResponse::network_error(),
                };
                match self.caches.read().await.match_request(&shell) {
                    Some(entry) => FetchResponse::from_cache(entry),
                    None => {
                        warn!(url = %url, "No cached shell for offline navigation");
                        FetchResponse::network_error()
                    }
                }
            }
        }
    }

    fn should_store(&self, response: &Response) -> bool {
        response.status == StatusCode::OK
            && response.url.origin() == self.scope.origin()
    }

    /// Push event. Malformed payloads are logged and dropped.
    pub async fn handle_push(&self, data: &[u8]) -> Option<NotificationId> {
        let payload = match PushPayload::parse(data) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Dropping push message");
                return None;
            }
        };

        match self.show_grouped(&payload).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!(error = %e, tag = payload.tag(), "Failed to show push notification");
                None
            }
        }
    }

    async fn show_grouped(&self, payload: &PushPayload) -> Result<NotificationId, ServiceWorkerError> {
        let tag = payload.tag().to_string();
        let lock = self.tag_lock(&tag);
        let _guard = lock.lock().await;

        let scope = self.scope.as_str();
        let existing = self.tray.get_notifications(scope, Some(&tag)).await;
        for notification in &existing {
            self.tray.close(notification.id).await;
        }

        let unread: usize = existing
            .iter()
            .map(|n| n.options.data.as_ref().map_or(1, NotificationData::messages))
            .sum();

        let (title, body) = grouped_copy(&tag, &payload.title, &payload.body, unread);
        let mut data = NotificationData::new(payload.target_url(), tag.clone());
        if unread > 0 {
            data.count = Some(unread + 1);
        }
        let options = NotificationOptions {
            body,
            icon: Some(self.config.notification_icon.clone()),
            badge: Some(self.config.notification_icon.clone()),
            tag: Some(tag.clone()),
            renotify: true,
            data: Some(data),
        };

        let id = self.tray.show(scope, title, options).await?;
        debug!(%tag, unread, "Push notification shown");
        Ok(id)
    }

    fn tag_lock(&self, tag: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .tag_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(tag.to_string()).or_default())
    }

    /// Notification click event: close it and open or focus the target window.
    pub async fn handle_notification_click(&self, id: NotificationId) -> Option<Client> {
        let Some(notification) = self.tray.get(id).await else {
            warn!(?id, "Click on unknown notification");
            return None;
        };
        self.tray.close(id).await;

        let target = resolve_click_target(
            notification.options.data.as_ref(),
            &self.config.chat_deep_link,
        );
        let url = match self.scope.join(&target) {
            Ok(url) => url,
            Err(e) => {
                warn!(%target, error = %e, "Bad notification target");
                return None;
            }
        };

        match self.clients.write().await.open_or_focus(url) {
            Ok(client) => Some(client),
            Err(e) => {
                error!(error = %e, "Failed to open window");
                None
            }
        }
    }
}

/// Cache key for a URL: fragments never take part in matching.
fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}
