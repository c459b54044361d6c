//! Post-commit notifications.
//!
//! Handlers publish two kinds of notification once their changes are
//! durable: the aggregate's domain events and requests to invalidate cache
//! entries. Listeners are best-effort: a failing listener is logged and never
//! fails the command that triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{DomainEvent, ProductEvent};

use crate::error::Result;
use crate::pipeline::Cache;
use crate::products::cache_keys;

/// Something a handler announces after a successful save.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Domain(ProductEvent),
    CacheInvalidation { key: String },
}

impl Notification {
    pub fn invalidate(key: impl Into<String>) -> Self {
        Notification::CacheInvalidation { key: key.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Domain(event) => event.event_type(),
            Notification::CacheInvalidation { .. } => "CacheInvalidation",
        }
    }
}

/// Sink for notifications.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Delivers a notification to every interested listener. Never fails.
    async fn publish(&self, notification: Notification);
}

/// A subscriber to notifications.
#[async_trait]
pub trait NotificationListener: Send + Sync {
    /// Returns the name of this listener.
    fn name(&self) -> &'static str;

    async fn on_notification(&self, notification: &Notification) -> Result<()>;
}

/// Delivers notifications to registered listeners in registration order.
#[derive(Default)]
pub struct InMemoryEventBus {
    listeners: Vec<Arc<dyn NotificationListener>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener with this bus.
    pub fn register(&mut self, listener: Arc<dyn NotificationListener>) {
        self.listeners.push(listener);
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    #[tracing::instrument(skip(self, notification), fields(kind = notification.kind()))]
    async fn publish(&self, notification: Notification) {
        for listener in &self.listeners {
            if let Err(err) = listener.on_notification(&notification).await {
                tracing::warn!(
                    listener = listener.name(),
                    error = %err,
                    "Notification listener failed"
                );
            }
        }
        metrics::counter!("catalog_notifications_published_total", "kind" => notification.kind())
            .increment(1);
    }
}

/// Evicts cache entries named by invalidation notifications.
///
/// The listing collection key evicts every cached listing page.
pub struct CacheInvalidationListener {
    cache: Arc<dyn Cache>,
}

impl CacheInvalidationListener {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl NotificationListener for CacheInvalidationListener {
    fn name(&self) -> &'static str {
        "CacheInvalidationListener"
    }

    async fn on_notification(&self, notification: &Notification) -> Result<()> {
        if let Notification::CacheInvalidation { key } = notification {
            if key.starts_with(cache_keys::LIST_PREFIX) {
                self.cache.remove_prefix(cache_keys::LIST_PREFIX).await;
            } else {
                self.cache.remove(key).await;
            }
            tracing::debug!(key, "Cache entry invalidated");
        }
        Ok(())
    }
}

/// Logs domain events.
pub struct DomainEventLogger;

#[async_trait]
impl NotificationListener for DomainEventLogger {
    fn name(&self) -> &'static str {
        "DomainEventLogger"
    }

    async fn on_notification(&self, notification: &Notification) -> Result<()> {
        if let Notification::Domain(event) = notification {
            tracing::info!(
                event_type = event.event_type(),
                product_id = %event.product_id(),
                occurred_at = %event.occurred_at(),
                "Domain event"
            );
        }
        Ok(())
    }
}
