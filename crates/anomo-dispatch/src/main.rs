//! anomo-dispatch - send one push through the hosted dispatch function
//!
//! The target is either a subscription JSON file (`{ endpoint, keys }`) or
//! the stored subscription of a user's settings row.
//!
//! ```text
//! anomo-dispatch --subscription sub.json --title "Hello" --body "World"
//! anomo-dispatch --user <uuid> --token <jwt> --title "Message from bob" --body "hey" --type chat
//! ```

use anomo_common::{init_logging, LogConfig, LogFormat};
use anomo_core::{AnomoConfig, PushDispatchRequest, StoredSubscription};
use anomo_net::{LoaderConfig, ResourceLoader};
use anomo_push::{BackendClient, PushDispatcher, RestSettingsStore, SettingsStore};
use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "anomo-dispatch")]
#[command(about = "Send one push notification through the hosted dispatch function")]
#[command(group(ArgGroup::new("target").required(true).args(["subscription", "user"])))]
struct Args {
    /// JSON configuration file (ANOMO_* variables still apply)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Subscription JSON file
    #[arg(long)]
    subscription: Option<PathBuf>,

    /// User whose stored subscription receives the push
    #[arg(long)]
    user: Option<String>,

    /// Access token used for backend requests
    #[arg(long)]
    token: Option<String>,

    /// Notification title
    #[arg(long)]
    title: String,

    /// Notification body
    #[arg(long)]
    body: String,

    /// Grouping tag (`chat`, `like`, ...)
    #[arg(long = "type")]
    kind: Option<String>,

    /// Path opened when the notification is clicked
    #[arg(long)]
    url: Option<String>,

    /// Log as JSON
    #[arg(long)]
    json_logs: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut log_config = if args.verbose {
        LogConfig::debug()
    } else {
        LogConfig::from_env()
    };
    if args.json_logs {
        log_config.format = LogFormat::Json;
    }
    init_logging(log_config);

    let config = match &args.config {
        Some(path) => AnomoConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AnomoConfig::from_env()?,
    };

    let loader = ResourceLoader::new(LoaderConfig::default())?;
    let backend = BackendClient::new(&config.backend, loader);
    if let Some(token) = &args.token {
        backend.sign_in(token.clone());
    }

    let subscription = resolve_subscription(&args, &config, &backend).await?;
    let mut request = PushDispatchRequest::new(subscription, args.title, args.body);
    if let Some(kind) = args.kind {
        request = request.kind(kind);
    }
    if let Some(url) = args.url {
        request = request.url(url);
    }

    let dispatcher = PushDispatcher::new(backend, &config.push);
    let reply = dispatcher.dispatch(&request).await?;

    info!(endpoint = %request.subscription.endpoint, "Push dispatched");
    println!("{}", reply.message.as_deref().unwrap_or("sent"));
    Ok(())
}

async fn resolve_subscription(
    args: &Args,
    config: &AnomoConfig,
    backend: &BackendClient<ResourceLoader>,
) -> Result<StoredSubscription> {
    if let Some(path) = &args.subscription {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        return serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()));
    }

    // The argument group guarantees one of the two targets.
    let user_id = args.user.as_deref().context("--user is required")?;

    let store = RestSettingsStore::new(backend.clone(), &config.backend);
    let row = store
        .fetch_settings(user_id)
        .await?
        .with_context(|| format!("no settings row for {user_id}"))?;
    row.push_subscription
        .with_context(|| format!("{user_id} has no push subscription"))
}
