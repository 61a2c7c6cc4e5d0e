use crate::models::{Order, OrderStatus, ServiceCount};
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: String,
    pub orders: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDuration {
    pub service_type: String,
    pub average_hours: f64,
    pub orders: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct ServiceWidgets {
    pub car_service: u64,
    pub tire_sales: u64,
    pub consultation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct OrderCounters {
    pub total_orders: u64,
    pub in_progress: u64,
    pub completed_today: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSeries {
    pub last_7_days: Vec<DailyPoint>,
    pub average_duration: Vec<ServiceDuration>,
    pub status_distribution: Vec<StatusCount>,
    pub counters: OrderCounters,
}

pub fn build_series(orders: &[Order]) -> OrderSeries {
    build_series_at(Local::now().date_naive(), &Local, orders)
}

pub fn build_series_at<Tz: TimeZone>(today: NaiveDate, tz: &Tz, orders: &[Order]) -> OrderSeries {
    OrderSeries {
        last_7_days: last_7_days_at(today, tz, orders),
        average_duration: average_duration_by_service(orders),
        status_distribution: status_distribution(orders),
        counters: order_counters_at(today, tz, orders),
    }
}

fn local_day<Tz: TimeZone>(ts: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

pub fn last_7_days_at<Tz: TimeZone>(
    today: NaiveDate,
    tz: &Tz,
    orders: &[Order],
) -> Vec<DailyPoint> {
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for ts in orders.iter().filter_map(Order::arrived_at) {
        *per_day.entry(local_day(ts, tz)).or_default() += 1;
    }

    (0..7)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            DailyPoint {
                date: date.to_string(),
                orders: per_day.get(&date).copied().unwrap_or_default(),
            }
        })
        .collect()
}

/// Mean arrival-to-departure time per service type, in hours rounded to one
/// decimal. Orders missing either timestamp are skipped.
pub fn average_duration_by_service(orders: &[Order]) -> Vec<ServiceDuration> {
    let mut totals: BTreeMap<&str, (f64, u64)> = BTreeMap::new();
    for order in orders {
        let (Some(arrival), Some(departure)) = (order.arrival_time, order.departure_time) else {
            continue;
        };
        let hours = (departure - arrival).num_seconds() as f64 / 3600.0;
        let entry = totals.entry(order.service_type.as_str()).or_default();
        entry.0 += hours;
        entry.1 += 1;
    }

    totals
        .into_iter()
        .map(|(service, (hours, count))| ServiceDuration {
            service_type: service.to_string(),
            average_hours: (hours / count as f64 * 10.0).round() / 10.0,
            orders: count,
        })
        .collect()
}

pub fn status_distribution(orders: &[Order]) -> Vec<StatusCount> {
    OrderStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: orders.iter().filter(|o| o.status == status).count() as u64,
        })
        .collect()
}

pub fn order_counters_at<Tz: TimeZone>(
    today: NaiveDate,
    tz: &Tz,
    orders: &[Order],
) -> OrderCounters {
    let completed_today = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Completed)
        .filter_map(|o| o.departure_time)
        .filter(|ts| local_day(*ts, tz) == today)
        .count();
    OrderCounters {
        total_orders: orders.len() as u64,
        in_progress: orders
            .iter()
            .filter(|o| o.status == OrderStatus::InProgress)
            .count() as u64,
        completed_today: completed_today as u64,
    }
}

pub fn service_widgets(breakdown: &[ServiceCount]) -> ServiceWidgets {
    let mut widgets = ServiceWidgets::default();
    for item in breakdown {
        let kind = item.service_type.to_lowercase();
        let slot = if kind.contains("car") || kind.contains("service") {
            &mut widgets.car_service
        } else if kind.contains("tire") {
            &mut widgets.tire_sales
        } else if kind.contains("consultation") {
            &mut widgets.consultation
        } else {
            continue;
        };
        *slot = slot.saturating_add(item.count);
    }
    widgets
}

pub fn format_duration(minutes: u64) -> String {
    let (hours, mins) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

pub fn time_ago(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    match seconds {
        0..60 => "Just now".to_string(),
        60..3600 => format!("{} minutes ago", seconds / 60),
        3600..86400 => format!("{} hours ago", seconds / 3600),
        _ => format!("{} days ago", seconds / 86400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, hour, 0, 0).unwrap()
    }

    fn order(id: &str, service: &str, status: OrderStatus) -> Order {
        Order {
            id: id.to_string(),
            service_type: service.to_string(),
            status,
            ..Order::default()
        }
    }

    #[test]
    fn last_7_days_buckets_by_arrival_then_creation() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let mut a = order("O1", "car_service", OrderStatus::Created);
        a.arrival_time = Some(at(3, 9));
        let mut b = order("O2", "car_service", OrderStatus::Created);
        b.created_at = Some(at(3, 17));
        let mut c = order("O3", "tire_sales", OrderStatus::Created);
        c.arrival_time = Some(at(5, 8));
        let mut old = order("O4", "tire_sales", OrderStatus::Created);
        let december = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        old.arrival_time = Some(december.and_hms_opt(8, 0, 0).unwrap().and_utc());

        let series = last_7_days_at(today, &Utc, &[a, b, c, old]);
        assert_eq!(series.len(), 7);
        assert_eq!(series[0].date, "2025-12-30");
        assert_eq!(series[6].date, "2026-01-05");
        assert_eq!(series[4].orders, 2);
        assert_eq!(series[6].orders, 1);
        assert_eq!(series.iter().map(|p| p.orders).sum::<u64>(), 3);
    }

    #[test]
    fn average_duration_skips_orders_without_both_timestamps() {
        let mut a = order("O1", "car_service", OrderStatus::Completed);
        a.arrival_time = Some(at(5, 8));
        a.departure_time = Some(at(5, 10));
        let mut b = order("O2", "car_service", OrderStatus::Completed);
        b.arrival_time = Some(at(5, 9));
        b.departure_time = Some(at(5, 10));
        let mut open = order("O3", "car_service", OrderStatus::InProgress);
        open.arrival_time = Some(at(5, 9));

        let averages = average_duration_by_service(&[a, b, open]);
        assert_eq!(
            averages,
            vec![ServiceDuration {
                service_type: "car_service".into(),
                average_hours: 1.5,
                orders: 2,
            }]
        );
    }

    #[test]
    fn counters_and_distribution() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let mut done = order("O1", "car_service", OrderStatus::Completed);
        done.departure_time = Some(at(5, 11));
        let mut done_earlier = order("O2", "car_service", OrderStatus::Completed);
        done_earlier.departure_time = Some(at(4, 11));
        let busy = order("O3", "tire_sales", OrderStatus::InProgress);

        let orders = [done, done_earlier, busy];
        let counters = order_counters_at(today, &Utc, &orders);
        assert_eq!(
            counters,
            OrderCounters {
                total_orders: 3,
                in_progress: 1,
                completed_today: 1,
            }
        );

        let distribution = status_distribution(&orders);
        assert_eq!(distribution.len(), 5);
        assert_eq!(distribution[2].count, 1);
        assert_eq!(distribution[3].count, 2);
        assert_eq!(distribution[4].count, 0);
    }

    #[test]
    fn widgets_fold_breakdown() {
        let count = |service_type: &str, count: u64| ServiceCount {
            service_type: service_type.into(),
            count,
        };
        let breakdown = vec![
            count("Car Service", 4),
            count("tire_sales", 2),
            count("consultation", 1),
            count("wash", 9),
        ];
        assert_eq!(
            service_widgets(&breakdown),
            ServiceWidgets {
                car_service: 4,
                tire_sales: 2,
                consultation: 1,
            }
        );
    }

    #[test]
    fn formatting_helpers() {
        assert_eq!(format_duration(45), "45m");
        assert_eq!(format_duration(125), "2h 5m");
        assert_eq!(time_ago(at(5, 10), at(5, 10)), "Just now");
        assert_eq!(time_ago(at(5, 10), at(5, 8)), "2 hours ago");
        assert_eq!(time_ago(at(5, 10), at(2, 10)), "3 days ago");
    }
}
