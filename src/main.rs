use service_tracker::{ClientConfig, TrackingSystem};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = ClientConfig::from_env()?;
    info!(
        api = %config.api_base_url,
        cache = %config.cache_dir.display(),
        "starting service tracker"
    );

    let mut system = TrackingSystem::new(config)?;
    let synced = system.sync().await;
    info!(
        success = synced.success,
        customers = system.customers().all().len(),
        "initial sync finished"
    );

    let mut updates = system.dashboard().subscribe();
    system.start_dashboard();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                let summary = &snapshot.summary;
                info!(
                    customers = summary.total_customers,
                    active = summary.active_orders,
                    completed_today = summary.completed_today,
                    arrivals_today = summary.arrivals_today,
                    avg_wait_minutes = summary.avg_wait_minutes,
                    in_progress = snapshot.series.counters.in_progress,
                    error = snapshot.error.as_deref().unwrap_or(""),
                    "dashboard refreshed"
                );
            }
        }
    }

    info!("shutting down");
    system.stop_dashboard().await;
    Ok(())
}
