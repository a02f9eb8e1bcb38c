//! Clients API: the app windows a worker can focus or open.

use hashbrown::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use url::Url;

use crate::{now_millis, ServiceWorkerError};

/// A window client (controlled page).
#[derive(Debug, Clone)]
pub struct Client {
    /// Client ID.
    pub id: String,

    /// Client URL.
    pub url: Url,

    /// Whether focused.
    pub focused: bool,
}

/// Clients API.
#[derive(Debug, Default)]
pub struct Clients {
    clients: HashMap<String, Client>,
}

impl Clients {
    /// Create new clients manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a client by ID.
    pub fn get(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    /// The currently focused window, if any.
    pub fn focused(&self) -> Option<&Client> {
        self.clients.values().find(|c| c.focused)
    }

    /// Open a window.
    pub fn open_window(&mut self, url: &str) -> Result<Client, ServiceWorkerError> {
        let url = Url::parse(url).map_err(|e| ServiceWorkerError::NetworkError(e.to_string()))?;
        Ok(self.insert_window(url))
    }

    /// Focus a window already showing `url`, or open a new one there.
    pub fn open_or_focus(&mut self, url: Url) -> Result<Client, ServiceWorkerError> {
        let existing = self
            .clients
            .values()
            .find(|c| c.url == url)
            .map(|c| c.id.clone());

        match existing {
            Some(id) => {
                self.blur_all();
                let client = self
                    .clients
                    .get_mut(&id)
                    .ok_or_else(|| ServiceWorkerError::NotFound(id.clone()))?;
                client.focused = true;
                debug!(client = %client.id, url = %client.url, "Focused existing window");
                Ok(client.clone())
            }
            None => {
                let client = self.insert_window(url);
                debug!(client = %client.id, url = %client.url, "Opened window");
                Ok(client)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn insert_window(&mut self, url: Url) -> Client {
        self.blur_all();
        let client = Client {
            id: format!("client-{}", client_id_suffix()),
            url,
            focused: true,
        };
        self.clients.insert(client.id.clone(), client.clone());
        client
    }

    fn blur_all(&mut self) {
        for client in self.clients.values_mut() {
            client.focused = false;
        }
    }
}

fn client_id_suffix() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!(
        "{:016x}-{:04x}",
        now_millis(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_window() {
        let mut clients = Clients::new();

        let client = clients.open_window("https://anomo.world/").unwrap();
        assert!(client.focused);
        assert!(clients.get(&client.id).is_some());
        assert_eq!(clients.focused().unwrap().id, client.id);
    }

    #[test]
    fn test_open_window_rejects_bad_url() {
        let mut clients = Clients::new();
        assert!(clients.open_window("not a url").is_err());
        assert!(clients.is_empty());
    }

    #[test]
    fn test_open_or_focus_reuses_matching_window() {
        let mut clients = Clients::new();
        let chat = Url::parse("https://anomo.world/?chat=open").unwrap();

        let first = clients.open_or_focus(chat.clone()).unwrap();
        clients.open_window("https://anomo.world/profile").unwrap();
        assert_ne!(clients.focused().unwrap().id, first.id);

        let again = clients.open_or_focus(chat).unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(clients.len(), 2);
        assert_eq!(clients.focused().unwrap().id, first.id);
    }

    #[test]
    fn test_single_focused_window() {
        let mut clients = Clients::new();
        clients.open_window("https://anomo.world/home").unwrap();
        clients.open_window("https://anomo.world/profile").unwrap();
        clients.open_or_focus(Url::parse("https://anomo.world/home").unwrap()).unwrap();

        assert_eq!(clients.clients.values().filter(|c| c.focused).count(), 1);
        assert_eq!(clients.focused().unwrap().url.path(), "/home");
    }
}
