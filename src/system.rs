use crate::config::{ClientConfig, ConfigError};
use crate::dashboard::{DashboardAggregator, RefreshTask};
use crate::errors::{CacheError, Outcome};
use crate::gateway::Gateway;
use crate::models::{
    Customer, CustomerUpdate, NewCustomer, NewOrder, Order, OrderQuery, OrderStatus, Vehicle,
};
use crate::notify::{Level, LogNotifier, Notifier};
use crate::reconciler::{CustomerFilters, CustomerView};
use crate::state::AppState;
use crate::storage::{CacheStore, FileStore};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub struct TrackingSystem {
    config: ClientConfig,
    gateway: Gateway,
    view: CustomerView,
    dashboard: Arc<DashboardAggregator>,
    refresher: Option<RefreshTask>,
    notifier: Arc<dyn Notifier>,
}

impl TrackingSystem {
    pub fn new(config: ClientConfig) -> Result<Self, StartupError> {
        let store = CacheStore::new(FileStore::open(&config.cache_dir)?);
        Self::with_parts(config, store, Arc::new(LogNotifier)).map_err(StartupError::from)
    }

    pub fn with_parts(
        config: ClientConfig,
        store: CacheStore,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let gateway = Gateway::from_config(&config, AppState::new(store))?;
        let dashboard = Arc::new(DashboardAggregator::new(gateway.clone()));
        Ok(Self {
            config,
            gateway,
            view: CustomerView::default(),
            dashboard,
            refresher: None,
            notifier,
        })
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn customers(&self) -> &CustomerView {
        &self.view
    }

    pub fn dashboard(&self) -> Arc<DashboardAggregator> {
        Arc::clone(&self.dashboard)
    }

    fn report<T>(&self, outcome: Outcome<T>) -> Outcome<T> {
        if let Some(message) = &outcome.error {
            self.notifier.notify(Level::Error, message);
        }
        outcome
    }

    pub async fn reload_customers(&mut self) {
        let records = self.gateway.cached_customers().await;
        self.view.load(records);
    }

    pub fn set_filters(&mut self, filters: CustomerFilters) {
        self.view.set_filters(filters);
    }

    pub fn reset_filters(&mut self) {
        self.view.reset_filters();
    }

    pub async fn search_customers(&mut self, query: &str) -> Outcome<usize> {
        let result = self.gateway.search_customers(query).await.map(|found| found.len());
        self.reload_customers().await;
        self.report(result.into())
    }

    pub async fn create_customer(&mut self, customer: NewCustomer) -> Outcome<Customer> {
        let result = self.gateway.create_customer(&customer).await;
        self.reload_customers().await;
        self.report(result.into())
    }

    pub async fn save_customer(&mut self, id: &str, update: CustomerUpdate) -> Outcome<Customer> {
        let result = self.gateway.update_customer(id, &update).await;
        self.reload_customers().await;
        if result.is_ok() {
            self.view.select(id);
        }
        self.report(result.into())
    }

    pub async fn add_vehicle(&mut self, customer_id: &str, vehicle: Vehicle) -> Outcome<Customer> {
        if vehicle.plate_number.trim().is_empty() {
            return self.report(Outcome::failed("Plate number is required"));
        }
        let current = match self.gateway.get_customer(customer_id).await {
            Ok(customer) => customer,
            Err(err) => return self.report(Outcome::failed(err.to_string())),
        };
        let mut vehicles = current.vehicles;
        vehicles.push(vehicle);
        let update = CustomerUpdate {
            vehicles: Some(vehicles),
            ..CustomerUpdate::default()
        };
        self.save_customer(customer_id, update).await
    }

    pub async fn create_order(&mut self, order: NewOrder) -> Outcome<Order> {
        let result = self.gateway.create_order(&order).await;
        self.report(result.into())
    }

    pub async fn update_order_status(
        &mut self,
        order_id: &str,
        status: OrderStatus,
    ) -> Outcome<Order> {
        let result = self.gateway.update_order_status(order_id, status).await;
        self.report(result.into())
    }

    pub async fn orders_for_customer(&self, customer_id: &str) -> Vec<Order> {
        self.gateway.cached_orders_for_customer(customer_id).await
    }

    pub async fn sync(&mut self) -> Outcome<()> {
        let query = OrderQuery::default();
        let (orders, customers) = tokio::join!(
            self.gateway.list_orders(&query),
            self.gateway.search_customers("")
        );
        self.reload_customers().await;
        let result = orders.and(customers).map(|_| ());
        self.report(result.into())
    }

    pub fn start_dashboard(&mut self) {
        if self.refresher.as_ref().is_some_and(RefreshTask::is_running) {
            return;
        }
        self.refresher = Some(RefreshTask::start(
            Arc::clone(&self.dashboard),
            self.config.refresh_interval,
        ));
    }

    pub async fn stop_dashboard(&mut self) {
        if let Some(task) = self.refresher.take() {
            task.stop().await;
        }
    }

    pub fn dashboard_running(&self) -> bool {
        self.refresher.as_ref().is_some_and(RefreshTask::is_running)
    }
}
