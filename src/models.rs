use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub fn normalize_type(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    match lowered.as_str() {
        "business" => "company".to_string(),
        "boda" | "boda_boda" | "boda-boda" => "bodaboda".to_string(),
        _ => lowered,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CustomerType {
    #[default]
    Unspecified,
    Personal,
    Company,
    Bodaboda,
    Other(String),
}

impl CustomerType {
    pub fn parse(raw: &str) -> Self {
        match normalize_type(raw).as_str() {
            "" => Self::Unspecified,
            "personal" => Self::Personal,
            "company" => Self::Company,
            "bodaboda" => Self::Bodaboda,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Unspecified => "",
            Self::Personal => "personal",
            Self::Company => "company",
            Self::Bodaboda => "bodaboda",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for CustomerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CustomerType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CustomerType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|value| Self::parse(&value)).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    #[default]
    Active,
    Vip,
    Inactive,
    Blacklisted,
}

impl CustomerStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "vip" => Self::Vip,
            "inactive" => Self::Inactive,
            "blacklisted" => Self::Blacklisted,
            _ => Self::Active,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Vip => "vip",
            Self::Inactive => "inactive",
            Self::Blacklisted => "blacklisted",
        }
    }
}

impl<'de> Deserialize<'de> for CustomerStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|value| Self::parse(&value)).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    #[default]
    Created,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        Self::Created,
        Self::Assigned,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Assigned => "assigned",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(alias = "plate_number")]
    pub plate_number: String,
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default, alias = "type")]
    pub vehicle_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub customer_type: CustomerType,
    #[serde(default)]
    pub status: CustomerStatus,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(default, alias = "totalVisits")]
    pub total_orders: u64,
    #[serde(default, with = "timestamp")]
    pub last_visit: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    #[serde(default, with = "timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub order_number: String,
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub order_type: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default, with = "timestamp")]
    pub arrival_time: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp")]
    pub departure_time: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "description")]
    pub notes: String,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
}

fn default_priority() -> String {
    "normal".to_string()
}

impl Order {
    /// Brings a server order into cache shape: blank priority becomes
    /// `normal`, and `departure_time` is present iff the order is completed.
    pub fn normalized(mut self, now: DateTime<Utc>) -> Self {
        if self.priority.trim().is_empty() {
            self.priority = default_priority();
        }
        if self.status == OrderStatus::Completed {
            self.departure_time.get_or_insert(now);
        } else {
            self.departure_time = None;
        }
        self
    }

    pub fn arrived_at(&self) -> Option<DateTime<Utc>> {
        self.arrival_time.or(self.created_at)
    }

    pub fn history_text(&self) -> String {
        self.status_history
            .iter()
            .map(|entry| {
                let stamp = entry
                    .timestamp
                    .map(|ts| ts.to_rfc3339())
                    .unwrap_or_default();
                if entry.notes.is_empty() {
                    format!("{stamp}: {}", entry.status)
                } else {
                    format!("{stamp}: {} - {}", entry.status, entry.notes)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_type: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vehicles: Vec<Vehicle>,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CustomerStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicles: Option<Vec<Vehicle>>,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer_id: String,
    pub service_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl NewOrder {
    pub fn new(customer_id: impl Into<String>, service_type: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            service_type: service_type.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCount {
    pub service_type: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    #[serde(default)]
    pub total_customers: u64,
    #[serde(default)]
    pub active_orders: u64,
    #[serde(default)]
    pub completed_today: u64,
    #[serde(default)]
    pub arrivals_today: u64,
    #[serde(default)]
    pub avg_wait_minutes: u64,
    #[serde(default)]
    pub service_breakdown: Vec<ServiceCount>,
}

/// Lenient timestamp codec: RFC 3339, or naive ISO read as UTC. Anything
/// else is treated as absent rather than failing the whole payload.
pub(crate) mod timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalize_type_folds_aliases() {
        assert_eq!(normalize_type("Business"), "company");
        assert_eq!(normalize_type("boda_boda"), "bodaboda");
        assert_eq!(normalize_type("BODA"), "bodaboda");
        assert_eq!(normalize_type("Personal"), "personal");
        assert_eq!(normalize_type(""), "");
    }

    #[test]
    fn customer_defaults_status_and_normalizes_type() {
        let customer: Customer = serde_json::from_value(serde_json::json!({
            "id": "C1",
            "name": "Amina",
            "customerType": "Business",
            "status": null,
        }))
        .unwrap();
        assert_eq!(customer.customer_type, CustomerType::Company);
        assert_eq!(customer.status, CustomerStatus::Active);

        let encoded = serde_json::to_value(&customer).unwrap();
        assert_eq!(encoded["customerType"], "company");
        assert_eq!(encoded["status"], "active");
    }

    #[test]
    fn order_reads_server_shape() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "O1",
            "orderNumber": "ORD-1",
            "customerId": "C1",
            "serviceType": "tire_sales",
            "status": "in-progress",
            "priority": "",
            "description": "front left",
            "arrivalTime": "2026-01-05T08:30:00.123456",
            "departureTime": "2026-01-05T10:00:00+00:00",
            "createdAt": "not a date",
        }))
        .unwrap();
        assert_eq!(order.status, OrderStatus::InProgress);
        assert_eq!(order.notes, "front left");
        assert!(order.created_at.is_none());
        assert_eq!(
            order.arrival_time.map(|ts| ts.timestamp()),
            Some(Utc.with_ymd_and_hms(2026, 1, 5, 8, 30, 0).unwrap().timestamp())
        );

        let now = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        let normalized = order.normalized(now);
        assert_eq!(normalized.priority, "normal");
        assert!(normalized.departure_time.is_none());
    }

    #[test]
    fn completed_order_always_has_departure() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        let order = Order {
            id: "O1".into(),
            status: OrderStatus::Completed,
            ..Order::default()
        }
        .normalized(now);
        assert_eq!(order.departure_time, Some(now));
    }

    #[test]
    fn history_text_lists_each_change() {
        let order = Order {
            id: "O1".into(),
            status_history: vec![
                StatusChange {
                    timestamp: Some(Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap()),
                    status: OrderStatus::Created,
                    notes: String::new(),
                },
                StatusChange {
                    timestamp: Some(Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()),
                    status: OrderStatus::Assigned,
                    notes: "bay 2".into(),
                },
            ],
            ..Order::default()
        };
        assert_eq!(
            order.history_text(),
            "2026-01-05T08:00:00+00:00: created\n2026-01-05T09:00:00+00:00: assigned - bay 2"
        );
    }
}
