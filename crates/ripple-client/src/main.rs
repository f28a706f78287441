//! # Ripple
//!
//! Tails a Ripple event stream and publishes lines read from stdin.
//!
//! ## Usage
//!
//! ```bash
//! # Run with ./ripple.toml or ~/.config/ripple/ripple.toml
//! ripple
//!
//! # Override settings with environment variables
//! RIPPLE__TRANSPORT=poll RIPPLE__ENDPOINTS__POLL_URL=http://localhost:8080/poll ripple
//! ```
//!
//! A line starting with `@id ` is sent as a direct message to `id`.

use anyhow::{Context, Result};
use ripple_client::{metrics, Config, Status, Subscription, SubscriptionOptions};
use ripple_core::{LogNotifier, NotificationSink, PublishError, Publisher};
use ripple_protocol::Event;
use ripple_transport::{build_driver, HttpPublishBoundary};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ripple=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = Config::load()?;

    info!(
        transport = %config.transport,
        channel = %config.channel,
        viewer = %config.viewer.id,
        "Starting Ripple client"
    );

    if config.metrics.enabled {
        metrics::init_metrics();
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            warn!(error = %e, "Failed to start metrics server");
        }
    }

    let driver = build_driver(config.transport, &config.driver_settings())
        .context("Failed to build transport driver")?;

    let notifications = if config.notifications {
        NotificationSink::new(Arc::new(LogNotifier))
    } else {
        NotificationSink::disabled()
    };
    let options = SubscriptionOptions {
        backoff: config.backoff(),
        notifications,
        ..SubscriptionOptions::default()
    }
    .on_status(|status| {
        if let Status::Failed { error } = status {
            error!(error = %error, "Subscription rejected; restart with fresh credentials");
        }
    });

    let mut subscription = Subscription::new(driver, config.viewer(), options);
    let _printer = subscription.on_event(|event| println!("{}", render(event)));
    subscription.connect();

    let publisher = config.endpoints.publish_url.as_ref().map(|url| {
        let boundary = HttpPublishBoundary::new(url).with_token(config.viewer.token.clone());
        Publisher::new(Arc::new(boundary), config.publisher_config())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => send_line(publisher.as_ref(), &line).await,
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    stdin_open = false;
                }
            },
        }
    }

    subscription.unsubscribe().await;
    Ok(())
}

async fn send_line(publisher: Option<&Publisher>, line: &str) {
    let Some(publisher) = publisher else {
        warn!("No publish endpoint configured, dropping input");
        return;
    };

    let (recipient, content) = parse_line(line);
    match publisher.publish(content, recipient).await {
        Ok(id) => {
            metrics::record_publish("ok");
            info!(event = %id, "Sent");
        }
        Err(PublishError::Validation(e)) => {
            metrics::record_publish("invalid");
            warn!(error = %e, "Not sent");
        }
        Err(e) => {
            metrics::record_publish("failed");
            error!(error = %e, "Send failed");
        }
    }
}

/// Split an optional `@recipient` prefix from a line.
fn parse_line(line: &str) -> (Option<&str>, &str) {
    if let Some(rest) = line.strip_prefix('@') {
        if let Some((recipient, content)) = rest.split_once(char::is_whitespace) {
            return (Some(recipient), content);
        }
    }
    (None, line)
}

fn render(event: &Event) -> String {
    let body = event.content().unwrap_or_default();
    match &event.recipient_id {
        Some(recipient) => format!("{} -> {}: {}", event.origin_id, recipient, body),
        None => format!("{}: {}", event.origin_id, body),
    }
}
