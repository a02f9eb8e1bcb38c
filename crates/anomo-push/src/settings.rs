//! Per-user settings rows in the hosted data store.

use anomo_core::{BackendConfig, SettingsRecord, StoredSubscription};
use anomo_net::{Fetcher, Request, Response};
use http::Method;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::backend::BackendClient;
use crate::error::{PushError, PushResult};

/// Remote store of [`SettingsRecord`]s, one per user.
pub trait SettingsStore: Send + Sync {
    fn fetch_settings(
        &self,
        user_id: &str,
    ) -> impl Future<Output = PushResult<Option<SettingsRecord>>> + Send;

    fn create_settings(
        &self,
        record: &SettingsRecord,
    ) -> impl Future<Output = PushResult<SettingsRecord>> + Send;

    /// Overwrite `push_subscription` of the user's row; `None` clears it.
    fn set_push_subscription(
        &self,
        user_id: &str,
        subscription: Option<&StoredSubscription>,
    ) -> impl Future<Output = PushResult<()>> + Send;

    /// Fetch the user's row, creating one with table defaults if missing.
    fn ensure_settings(
        &self,
        user_id: &str,
    ) -> impl Future<Output = PushResult<SettingsRecord>> + Send {
        async move {
            if let Some(existing) = self.fetch_settings(user_id).await? {
                return Ok(existing);
            }
            debug!(user_id, "Creating default settings row");
            self.create_settings(&SettingsRecord::new(user_id)).await
        }
    }
}

impl<S: SettingsStore> SettingsStore for Arc<S> {
    fn fetch_settings(
        &self,
        user_id: &str,
    ) -> impl Future<Output = PushResult<Option<SettingsRecord>>> + Send {
        (**self).fetch_settings(user_id)
    }

    fn create_settings(
        &self,
        record: &SettingsRecord,
    ) -> impl Future<Output = PushResult<SettingsRecord>> + Send {
        (**self).create_settings(record)
    }

    fn set_push_subscription(
        &self,
        user_id: &str,
        subscription: Option<&StoredSubscription>,
    ) -> impl Future<Output = PushResult<()>> + Send {
        (**self).set_push_subscription(user_id, subscription)
    }
}

/// [`SettingsStore`] over the backend's REST interface.
pub struct RestSettingsStore<F> {
    backend: BackendClient<F>,
    table: String,
}

impl<F: Fetcher> RestSettingsStore<F> {
    pub fn new(backend: BackendClient<F>, config: &BackendConfig) -> Self {
        Self {
            backend,
            table: config.settings_table.clone(),
        }
    }

    /// `rest/v1/<table>?user_id=eq.<id>`
    fn row_url(&self, user_id: &str) -> PushResult<Url> {
        let mut url = self.table_url()?;
        url.query_pairs_mut()
            .append_pair("user_id", &format!("eq.{user_id}"));
        Ok(url)
    }

    fn table_url(&self) -> PushResult<Url> {
        self.backend.endpoint(&format!("rest/v1/{}", self.table))
    }
}

fn ensure_success(response: &Response, action: &str) -> PushResult<()> {
    if response.ok() {
        return Ok(());
    }
    Err(PushError::Settings(format!(
        "{action} returned {}: {}",
        response.status,
        response.text().unwrap_or_default()
    )))
}

impl<F: Fetcher> SettingsStore for RestSettingsStore<F> {
    async fn fetch_settings(&self, user_id: &str) -> PushResult<Option<SettingsRecord>> {
        let mut url = self.row_url(user_id)?;
        url.query_pairs_mut().append_pair("select", "*");

        let response = self.backend.send(Request::get(url)).await?;
        ensure_success(&response, "select")?;

        let rows: Vec<SettingsRecord> = response.json()?;
        Ok(rows.into_iter().next())
    }

    async fn create_settings(&self, record: &SettingsRecord) -> PushResult<SettingsRecord> {
        let request = Request::json(self.table_url()?, Method::POST, &[record])?
            .try_header("prefer", "return=representation")?;

        let response = self.backend.send(request).await?;
        ensure_success(&response, "insert")?;

        let rows: Vec<SettingsRecord> = response.json()?;
        info!(user_id = %record.user_id, "Settings row created");
        Ok(rows.into_iter().next().unwrap_or_else(|| record.clone()))
    }

    async fn set_push_subscription(
        &self,
        user_id: &str,
        subscription: Option<&StoredSubscription>,
    ) -> PushResult<()> {
        let body = json!({ "push_subscription": subscription });
        let request = Request::json(self.row_url(user_id)?, Method::PATCH, &body)?;

        let response = self.backend.send(request).await?;
        ensure_success(&response, "update")?;

        debug!(user_id, stored = subscription.is_some(), "push_subscription written");
        Ok(())
    }
}
