use crate::config::{ClientConfig, ConfigError};
use crate::errors::GatewayError;
use crate::models::{
    AnalyticsSummary, Customer, CustomerUpdate, NewCustomer, NewOrder, Order, OrderQuery,
    OrderStatus,
};
use crate::state::AppState;
use crate::storage::{CACHE_LIMIT, Collection, prepend_new, upsert};
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, instrument, warn};

const CSRF_COOKIE: &str = "csrftoken";
const CSRF_HEADER: &str = "X-CSRFToken";

pub fn csrf_token(cookie_header: Option<&str>, fallback: Option<&str>) -> String {
    cookie_header
        .into_iter()
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CSRF_COOKIE)
        .map(|(_, value)| value.to_string())
        .or_else(|| fallback.map(str::to_string))
        .unwrap_or_default()
}

#[derive(Deserialize)]
struct CustomerEnvelope {
    customer: Customer,
}

#[derive(Deserialize)]
struct OrderEnvelope {
    order: Order,
}

#[derive(Deserialize)]
struct ResultsEnvelope<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize)]
struct AnalyticsEnvelope {
    data: AnalyticsSummary,
}

#[derive(Serialize)]
struct StatusBody {
    status: OrderStatus,
}

fn error_message(body: &Value) -> Option<String> {
    ["error", "detail"]
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}

#[derive(Clone)]
pub struct Gateway {
    client: Client,
    base_url: Url,
    csrf_token: String,
    state: AppState,
}

impl Gateway {
    pub fn new(
        client: Client,
        base_url: &str,
        csrf_token: String,
        state: AppState,
    ) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| ConfigError::Invalid("base url", err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid("base url", base_url.to_string()));
        }
        Ok(Self {
            client,
            base_url,
            csrf_token,
            state,
        })
    }

    pub fn from_config(config: &ClientConfig, state: AppState) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ConfigError::Invalid("http client", err.to_string()))?;
        let token = csrf_token(config.csrf_cookie.as_deref(), config.csrf_token.as_deref());
        Self::new(client, &config.api_base_url, token, state)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments).push("");
        }
        url
    }

    fn mutating(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(CSRF_HEADER, &self.csrf_token)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let result = self.send_inner(request).await;
        if let Err(err) = &result {
            warn!(error = %err, "gateway request failed");
        }
        result
    }

    async fn send_inner<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = request.send().await.map_err(GatewayError::Network)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(GatewayError::Network)?;
        let fallback = || format!("Request failed ({})", status.as_u16());

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(fallback);
            return Err(GatewayError::server(status.as_u16(), message));
        }

        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|err| GatewayError::Protocol(err.to_string()))?;
        if body.get("success").and_then(Value::as_bool) != Some(true) {
            let message = error_message(&body).unwrap_or_else(fallback);
            return Err(GatewayError::server(status.as_u16(), message));
        }
        serde_json::from_value(body).map_err(|err| GatewayError::Protocol(err.to_string()))
    }

    #[instrument(skip(self, customer), fields(phone = %customer.phone))]
    pub async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, GatewayError> {
        if customer.name.trim().is_empty() || customer.phone.trim().is_empty() {
            return Err(GatewayError::validation("Name and phone are required"));
        }

        let ticket = self.state.issue_ticket().await;
        let request = self.mutating(self.client.post(self.endpoint(&["api", "customers"])));
        let CustomerEnvelope { customer } = self
            .send::<CustomerEnvelope>(request.json(customer))
            .await?;

        let mut cache = self.state.cache.lock().await;
        let mut all = cache.store.customers();
        if prepend_new(&mut all, customer.clone(), |c| c.id.as_str()) {
            if let Err(err) = cache.store.write(Collection::Customers, &all) {
                warn!("failed to cache new customer: {err}");
            }
        }
        cache.sequencer.commit_merge(Collection::Customers, ticket);
        debug!(id = %customer.id, "customer created");
        Ok(customer)
    }

    #[instrument(skip(self))]
    pub async fn search_customers(&self, query: &str) -> Result<Vec<Customer>, GatewayError> {
        let ticket = self.state.issue_ticket().await;
        let request = self
            .client
            .get(self.endpoint(&["api", "customers", "search"]))
            .query(&[("q", query)]);
        let ResultsEnvelope { results } = self.send::<ResultsEnvelope<Customer>>(request).await?;

        let mut cache = self.state.cache.lock().await;
        if cache.sequencer.try_commit_replace(Collection::Customers, ticket) {
            let bounded = &results[..results.len().min(CACHE_LIMIT)];
            if let Err(err) = cache.store.write(Collection::Customers, bounded) {
                warn!("failed to cache customer search: {err}");
            }
        } else {
            debug!(ticket, "discarding stale customer snapshot");
        }
        Ok(results)
    }

    #[instrument(skip(self))]
    pub async fn get_customer(&self, id: &str) -> Result<Customer, GatewayError> {
        let request = self.client.get(self.endpoint(&["api", "customers", id]));
        match self.send::<CustomerEnvelope>(request).await {
            Ok(CustomerEnvelope { customer }) => Ok(customer),
            Err(err) if err.is_network() => {
                let cached = self.state.cache.lock().await.store.customer(id);
                cached.ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, update))]
    pub async fn update_customer(
        &self,
        id: &str,
        update: &CustomerUpdate,
    ) -> Result<Customer, GatewayError> {
        let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());
        if blank(&update.name) || blank(&update.phone) {
            return Err(GatewayError::validation("Name and phone are required"));
        }
        if update
            .vehicles
            .iter()
            .flatten()
            .any(|vehicle| vehicle.plate_number.trim().is_empty())
        {
            return Err(GatewayError::validation("Plate number is required"));
        }

        let ticket = self.state.issue_ticket().await;
        let request = self.mutating(self.client.put(self.endpoint(&["api", "customers", id])));
        let CustomerEnvelope { customer } = self
            .send::<CustomerEnvelope>(request.json(update))
            .await?;

        let mut cache = self.state.cache.lock().await;
        let mut all = cache.store.customers();
        upsert(&mut all, customer.clone(), |c| c.id.as_str());
        if let Err(err) = cache.store.write(Collection::Customers, &all) {
            warn!("failed to cache updated customer: {err}");
        }
        cache.sequencer.commit_merge(Collection::Customers, ticket);
        Ok(customer)
    }

    #[instrument(skip(self, order), fields(customer = %order.customer_id))]
    pub async fn create_order(&self, order: &NewOrder) -> Result<Order, GatewayError> {
        if order.customer_id.trim().is_empty() || order.service_type.trim().is_empty() {
            return Err(GatewayError::validation("customerId and serviceType are required"));
        }

        let ticket = self.state.issue_ticket().await;
        let request = self.mutating(self.client.post(self.endpoint(&["api", "orders"])));
        let OrderEnvelope { order } = self.send::<OrderEnvelope>(request.json(order)).await?;
        let order = order.normalized(Utc::now());

        self.merge_order(order.clone(), ticket).await;
        debug!(id = %order.id, number = %order.order_number, "order created");
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, GatewayError> {
        let ticket = self.state.issue_ticket().await;
        let mut request = self.client.get(self.endpoint(&["api", "orders", "list"]));
        if let Some(status) = query.status {
            request = request.query(&[("status", status.as_str())]);
        }
        if let Some(customer_id) = &query.customer_id {
            request = request.query(&[("customerId", customer_id.as_str())]);
        }
        let ResultsEnvelope { results } = self.send::<ResultsEnvelope<Order>>(request).await?;
        let now = Utc::now();
        let results: Vec<Order> = results.into_iter().map(|o| o.normalized(now)).collect();

        let mut cache = self.state.cache.lock().await;
        if query.status.is_some() || query.customer_id.is_some() {
            let mut all = cache.store.orders();
            for order in results.iter().rev() {
                upsert(&mut all, order.clone(), |o| o.id.as_str());
            }
            if let Err(err) = cache.store.write(Collection::Orders, &all) {
                warn!("failed to cache filtered orders: {err}");
            }
            cache.sequencer.commit_merge(Collection::Orders, ticket);
        } else if cache.sequencer.try_commit_replace(Collection::Orders, ticket) {
            let bounded = &results[..results.len().min(CACHE_LIMIT)];
            if let Err(err) = cache.store.write(Collection::Orders, bounded) {
                warn!("failed to cache order list: {err}");
            }
        } else {
            debug!(ticket, "discarding stale order snapshot");
        }
        Ok(results)
    }

    /// Submits the target status. Orders already completed or cancelled are
    /// refused locally without a request; otherwise the server decides and
    /// its returned order replaces the cached one.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        id: &str,
        status: OrderStatus,
    ) -> Result<Order, GatewayError> {
        let current = self.state.cache.lock().await.store.order(id);
        if let Some(current) = current.filter(|order| order.status.is_terminal()) {
            return Err(GatewayError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        let ticket = self.state.issue_ticket().await;
        let endpoint = self.endpoint(&["api", "orders", id, "status"]);
        let request = self.mutating(self.client.post(endpoint));
        let OrderEnvelope { order } = self
            .send::<OrderEnvelope>(request.json(&StatusBody { status }))
            .await?;
        let order = order.normalized(Utc::now());

        self.merge_order(order.clone(), ticket).await;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn analytics_summary(&self) -> Result<AnalyticsSummary, GatewayError> {
        let request = self.client.get(self.endpoint(&["api", "analytics", "summary"]));
        let AnalyticsEnvelope { data } = self.send::<AnalyticsEnvelope>(request).await?;
        Ok(data)
    }

    async fn merge_order(&self, order: Order, ticket: u64) {
        let mut cache = self.state.cache.lock().await;
        let mut all = cache.store.orders();
        upsert(&mut all, order, |o| o.id.as_str());
        if let Err(err) = cache.store.write(Collection::Orders, &all) {
            warn!("failed to cache order: {err}");
        }
        cache.sequencer.commit_merge(Collection::Orders, ticket);
    }

    pub async fn sync_orders(&self) -> Vec<Order> {
        match self.list_orders(&OrderQuery::default()).await {
            Ok(_) => self.cached_orders().await,
            Err(_) => Vec::new(),
        }
    }

    pub async fn sync_customers(&self, query: &str) -> Vec<Customer> {
        match self.search_customers(query).await {
            Ok(_) => self.cached_customers().await,
            Err(_) => Vec::new(),
        }
    }

    pub async fn cached_customers(&self) -> Vec<Customer> {
        self.state.cache.lock().await.store.customers()
    }

    pub async fn cached_customer(&self, id: &str) -> Option<Customer> {
        self.state.cache.lock().await.store.customer(id)
    }

    pub async fn cached_orders(&self) -> Vec<Order> {
        self.state.cache.lock().await.store.orders()
    }

    pub async fn cached_order(&self, id: &str) -> Option<Order> {
        self.state.cache.lock().await.store.order(id)
    }

    pub async fn cached_orders_for_customer(&self, customer_id: &str) -> Vec<Order> {
        self.state
            .cache
            .lock()
            .await
            .store
            .orders_for_customer(customer_id)
    }
}
