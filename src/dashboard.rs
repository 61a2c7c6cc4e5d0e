use crate::gateway::Gateway;
use crate::models::{AnalyticsSummary, OrderQuery};
use crate::stats::{OrderSeries, ServiceWidgets, build_series, service_widgets};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub summary: AnalyticsSummary,
    pub widgets: ServiceWidgets,
    pub series: OrderSeries,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    #[serde(skip)]
    generation: u64,
}

impl DashboardSnapshot {
    fn empty() -> Self {
        Self {
            summary: AnalyticsSummary::default(),
            widgets: ServiceWidgets::default(),
            series: build_series(&[]),
            refreshed_at: None,
            error: None,
            generation: 0,
        }
    }
}

pub struct DashboardAggregator {
    gateway: Gateway,
    generation: AtomicU64,
    tx: watch::Sender<DashboardSnapshot>,
}

impl DashboardAggregator {
    pub fn new(gateway: Gateway) -> Self {
        let (tx, _rx) = watch::channel(DashboardSnapshot::empty());
        Self {
            gateway,
            generation: AtomicU64::new(0),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> DashboardSnapshot {
        self.tx.borrow().clone()
    }

    /// Pulls the analytics summary and the order list together. A failed
    /// summary publishes zeros; a failed order list leaves the cache as is.
    /// Returns `false` if a refresh started later has already published.
    pub async fn refresh(&self) -> bool {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = OrderQuery::default();
        let (summary, orders) = tokio::join!(
            self.gateway.analytics_summary(),
            self.gateway.list_orders(&query)
        );
        if let Err(err) = &orders {
            debug!(error = %err, "order list refresh failed; using cached orders");
        }

        let (summary, error) = match summary {
            Ok(summary) => (summary, None),
            Err(err) => {
                warn!(error = %err, "analytics refresh failed; publishing empty metrics");
                (AnalyticsSummary::default(), Some(err.to_string()))
            }
        };
        let orders = self.gateway.cached_orders().await;
        let snapshot = DashboardSnapshot {
            widgets: service_widgets(&summary.service_breakdown),
            series: build_series(&orders),
            summary,
            refreshed_at: Some(Utc::now()),
            error,
            generation,
        };

        self.tx.send_if_modified(|current| {
            if current.generation > snapshot.generation {
                return false;
            }
            *current = snapshot;
            true
        })
    }
}

pub struct RefreshTask {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshTask {
    pub fn start(aggregator: Arc<DashboardAggregator>, period: Duration) -> Self {
        let (shutdown, mut stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_secs = period.as_secs(), "dashboard refresh started");
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        aggregator.refresh().await;
                    }
                }
            }
            info!("dashboard refresh stopped");
        });
        Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!("dashboard refresh task ended abnormally: {err}");
            }
        }
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
