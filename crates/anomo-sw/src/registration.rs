//! Service worker records and their registration.

use std::time::Instant;
use tracing::debug;
use url::Url;

use crate::push::PushManager;
use crate::{ServiceWorkerId, ServiceWorkerState};

/// A service worker version.
#[derive(Debug, Clone)]
pub struct ServiceWorker {
    /// Unique ID.
    pub id: ServiceWorkerId,

    /// Script URL.
    pub script_url: Url,

    /// Cache this version installs into.
    pub cache_name: String,

    /// Current state.
    pub state: ServiceWorkerState,

    /// Error message if install failed.
    pub error: Option<String>,

    /// Time of last state change.
    pub state_changed_at: Instant,
}

impl ServiceWorker {
    /// Create a new service worker.
    pub fn new(script_url: Url, cache_name: impl Into<String>) -> Self {
        Self {
            id: ServiceWorkerId::new(),
            script_url,
            cache_name: cache_name.into(),
            state: ServiceWorkerState::Parsed,
            error: None,
            state_changed_at: Instant::now(),
        }
    }

    /// Set state.
    pub fn set_state(&mut self, state: ServiceWorkerState) {
        debug!(worker = ?self.id, from = ?self.state, to = ?state, "Worker state change");
        self.state = state;
        self.state_changed_at = Instant::now();
    }

    /// Check if active.
    pub fn is_active(&self) -> bool {
        self.state == ServiceWorkerState::Activated
    }

    /// Check if redundant.
    pub fn is_redundant(&self) -> bool {
        self.state == ServiceWorkerState::Redundant
    }
}

/// A service worker registration.
#[derive(Debug)]
pub struct ServiceWorkerRegistration {
    /// Scope URL.
    pub scope: Url,

    /// Installing worker.
    pub installing: Option<ServiceWorker>,

    /// Waiting worker (installed but not active).
    pub waiting: Option<ServiceWorker>,

    /// Active worker.
    pub active: Option<ServiceWorker>,

    /// Versions that failed to install or were replaced, newest last.
    pub redundant: Vec<ServiceWorker>,

    /// Push manager bound to this registration.
    pub push_manager: PushManager,

    /// Last update check time.
    pub last_update_check: Option<Instant>,
}

impl ServiceWorkerRegistration {
    /// Create a new registration.
    pub fn new(scope: Url, push_service_url: Url) -> Self {
        Self {
            scope,
            installing: None,
            waiting: None,
            active: None,
            redundant: Vec::new(),
            push_manager: PushManager::new(push_service_url),
            last_update_check: None,
        }
    }

    /// Get the active worker.
    pub fn get_active(&self) -> Option<&ServiceWorker> {
        self.active.as_ref()
    }

    /// Whether the active version already runs this script with this cache.
    pub fn is_current(&self, script_url: &Url, cache_name: &str) -> bool {
        self.active
            .as_ref()
            .map_or(false, |w| &w.script_url == script_url && w.cache_name == cache_name)
    }

    /// Start installing a new version.
    pub fn update(&mut self, script_url: Url, cache_name: &str) -> ServiceWorkerId {
        if let Some(mut stale) = self.installing.take() {
            stale.set_state(ServiceWorkerState::Redundant);
            self.redundant.push(stale);
        }
        let mut worker = ServiceWorker::new(script_url, cache_name);
        worker.set_state(ServiceWorkerState::Installing);
        let id = worker.id;
        self.installing = Some(worker);
        self.last_update_check = Some(Instant::now());
        id
    }

    /// Transition installing to waiting.
    pub fn install_complete(&mut self) {
        if let Some(mut worker) = self.installing.take() {
            worker.set_state(ServiceWorkerState::Installed);
            self.waiting = Some(worker);
        }
    }

    /// Installing version failed; it becomes redundant and the active one stays.
    pub fn install_failed(&mut self, error: impl Into<String>) {
        if let Some(mut worker) = self.installing.take() {
            worker.error = Some(error.into());
            worker.set_state(ServiceWorkerState::Redundant);
            self.redundant.push(worker);
        }
    }

    /// Activate waiting worker.
    pub fn activate(&mut self) {
        if let Some(mut worker) = self.waiting.take() {
            worker.set_state(ServiceWorkerState::Activating);

            if let Some(mut old) = self.active.take() {
                old.set_state(ServiceWorkerState::Redundant);
                self.redundant.push(old);
            }

            worker.set_state(ServiceWorkerState::Activated);
            self.active = Some(worker);
        }
    }

    /// Unregister (mark every version redundant).
    pub fn unregister(&mut self) {
        for slot in [&mut self.active, &mut self.waiting, &mut self.installing] {
            if let Some(mut worker) = slot.take() {
                worker.set_state(ServiceWorkerState::Redundant);
                self.redundant.push(worker);
            }
        }
        self.push_manager.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> ServiceWorkerRegistration {
        ServiceWorkerRegistration::new(
            Url::parse("https://anomo.world/").unwrap(),
            Url::parse("https://push.anomo.world/wpush/v2/").unwrap(),
        )
    }

    fn script() -> Url {
        Url::parse("https://anomo.world/sw.js").unwrap()
    }

    #[test]
    fn test_service_worker_creation() {
        let worker = ServiceWorker::new(script(), "anomo-cache-v1");
        assert_eq!(worker.script_url, script());
        assert_eq!(worker.state, ServiceWorkerState::Parsed);
        assert!(!worker.is_active());
    }

    #[test]
    fn test_registration_lifecycle() {
        let mut registration = registration();
        registration.update(script(), "anomo-cache-v1");
        assert_eq!(
            registration.installing.as_ref().unwrap().state,
            ServiceWorkerState::Installing
        );

        // Installing -> Installed
        registration.install_complete();
        assert!(registration.waiting.is_some());
        assert!(registration.installing.is_none());

        // Installed -> Active
        registration.activate();
        assert!(registration.get_active().unwrap().is_active());
        assert!(registration.waiting.is_none());
        assert!(registration.is_current(&script(), "anomo-cache-v1"));
        assert!(!registration.is_current(&script(), "anomo-cache-v2"));
    }

    #[test]
    fn test_failed_install_keeps_previous_active() {
        let mut registration = registration();
        registration.update(script(), "anomo-cache-v1");
        registration.install_complete();
        registration.activate();

        registration.update(script(), "anomo-cache-v2");
        registration.install_failed("manifest fetch failed");

        assert!(registration.installing.is_none());
        assert_eq!(registration.get_active().unwrap().cache_name, "anomo-cache-v1");
        let failed = registration.redundant.last().unwrap();
        assert!(failed.is_redundant());
        assert_eq!(failed.error.as_deref(), Some("manifest fetch failed"));
    }

    #[test]
    fn test_activation_replaces_old_version() {
        let mut registration = registration();
        registration.update(script(), "anomo-cache-v1");
        registration.install_complete();
        registration.activate();

        registration.update(script(), "anomo-cache-v2");
        registration.install_complete();
        registration.activate();

        assert_eq!(registration.get_active().unwrap().cache_name, "anomo-cache-v2");
        assert_eq!(registration.redundant.len(), 1);
        assert!(registration.redundant[0].is_redundant());
    }

    #[test]
    fn test_unregister_drops_everything() {
        let mut registration = registration();
        registration.update(script(), "anomo-cache-v1");
        registration.install_complete();
        registration.activate();
        registration
            .push_manager
            .subscribe(&crate::PushSubscriptionOptions::visible("key"))
            .unwrap();

        registration.unregister();
        assert!(registration.get_active().is_none());
        assert!(registration.push_manager.get_subscription().is_none());
    }
}
