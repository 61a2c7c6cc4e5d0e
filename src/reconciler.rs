use crate::models::{Customer, CustomerStatus, CustomerType};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFilters {
    pub query: String,
    pub customer_type: Option<CustomerType>,
    pub status: Option<CustomerStatus>,
}

impl CustomerFilters {
    pub fn from_inputs(query: &str, customer_type: &str, status: &str) -> Self {
        let customer_type = match CustomerType::parse(customer_type) {
            CustomerType::Unspecified => None,
            parsed => Some(parsed),
        };
        let status = (!status.trim().is_empty()).then(|| CustomerStatus::parse(status));
        Self {
            query: query.trim().to_lowercase(),
            customer_type,
            status,
        }
    }

    pub fn matches(&self, customer: &Customer) -> bool {
        let query = self.query.trim().to_lowercase();
        let matches_query = query.is_empty()
            || [&customer.name, &customer.phone, &customer.email, &customer.id]
                .iter()
                .any(|field| field.to_lowercase().contains(&query));
        let matches_type = self
            .customer_type
            .as_ref()
            .is_none_or(|wanted| *wanted == customer.customer_type);
        let matches_status = self.status.is_none_or(|wanted| wanted == customer.status);
        matches_query && matches_type && matches_status
    }
}

pub fn filter_customers(records: &[Customer], filters: &CustomerFilters) -> Vec<Customer> {
    records
        .iter()
        .filter(|customer| filters.matches(customer))
        .cloned()
        .collect()
}

fn normalize(mut customer: Customer) -> Customer {
    customer.customer_type = CustomerType::parse(customer.customer_type.as_str());
    customer
}

/// Full record set plus the filtered subset derived from it. The filtered
/// view is only ever rebuilt from scratch by [`CustomerView::apply_filters`].
#[derive(Debug, Default)]
pub struct CustomerView {
    all: Vec<Customer>,
    filtered: Vec<Customer>,
    filters: CustomerFilters,
    selected: Option<String>,
}

impl CustomerView {
    pub fn load(&mut self, records: Vec<Customer>) {
        self.all = records.into_iter().map(normalize).collect();
        let still_loaded = self
            .selected
            .as_ref()
            .is_some_and(|id| self.all.iter().any(|customer| &customer.id == id));
        if !still_loaded {
            self.selected = None;
        }
        self.apply_filters();
    }

    pub fn apply_filters(&mut self) {
        self.filtered = filter_customers(&self.all, &self.filters);
    }

    pub fn set_filters(&mut self, filters: CustomerFilters) {
        self.filters = filters;
        self.apply_filters();
    }

    pub fn reset_filters(&mut self) {
        self.set_filters(CustomerFilters::default());
    }

    pub fn filters(&self) -> &CustomerFilters {
        &self.filters
    }

    pub fn all(&self) -> &[Customer] {
        &self.all
    }

    pub fn filtered(&self) -> &[Customer] {
        &self.filtered
    }

    pub fn select(&mut self, id: &str) -> Option<&Customer> {
        let found = self.all.iter().find(|customer| customer.id == id)?;
        self.selected = Some(found.id.clone());
        Some(found)
    }

    pub fn selected(&self) -> Option<&Customer> {
        let id = self.selected.as_ref()?;
        self.all.iter().find(|customer| &customer.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: &str, name: &str, kind: &str, status: CustomerStatus) -> Customer {
        Customer {
            id: id.to_string(),
            name: name.to_string(),
            phone: format!("+2547{id}"),
            customer_type: CustomerType::parse(kind),
            status,
            ..Customer::default()
        }
    }

    fn sample() -> Vec<Customer> {
        vec![
            customer("C1", "Amina Otieno", "personal", CustomerStatus::Active),
            customer("C2", "Kazi Logistics", "business", CustomerStatus::Vip),
            customer("C3", "Juma Boda", "boda_boda", CustomerStatus::Active),
            customer("C4", "Kamau Motors", "company", CustomerStatus::Blacklisted),
        ]
    }

    fn ids(records: &[Customer]) -> Vec<&str> {
        records.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn apply_filters_is_idempotent() {
        let mut view = CustomerView::default();
        view.load(sample());
        view.set_filters(CustomerFilters::from_inputs("k", "", ""));
        let first = view.filtered().to_vec();
        view.apply_filters();
        assert_eq!(view.filtered(), first.as_slice());
        assert_eq!(ids(&first), vec!["C2", "C4"]);
    }

    #[test]
    fn type_filter_uses_normalized_values() {
        let mut view = CustomerView::default();
        view.load(sample());
        view.set_filters(CustomerFilters::from_inputs("", "Business", ""));
        assert_eq!(ids(view.filtered()), vec!["C2", "C4"]);

        view.set_filters(CustomerFilters::from_inputs("", "boda", ""));
        assert_eq!(ids(view.filtered()), vec!["C3"]);
    }

    #[test]
    fn combined_predicates_and_reset() {
        let mut view = CustomerView::default();
        view.load(sample());
        view.set_filters(CustomerFilters::from_inputs("", "company", "blacklisted"));
        assert_eq!(ids(view.filtered()), vec!["C4"]);

        view.set_filters(CustomerFilters::from_inputs("+2547c1", "", ""));
        assert_eq!(ids(view.filtered()), vec!["C1"]);

        view.reset_filters();
        assert_eq!(view.filtered().len(), view.all().len());
    }

    #[test]
    fn reload_recomputes_under_current_filters() {
        let mut view = CustomerView::default();
        view.load(sample());
        view.set_filters(CustomerFilters::from_inputs("", "", "vip"));
        view.select("C2");

        let mut updated = sample();
        updated[1].status = CustomerStatus::Inactive;
        updated.push(customer("C5", "Wanjiru", "personal", CustomerStatus::Vip));
        view.load(updated);

        assert_eq!(ids(view.filtered()), vec!["C5"]);
        assert_eq!(view.selected().map(|c| c.status), Some(CustomerStatus::Inactive));
    }

    #[test]
    fn filtered_is_subset_of_all() {
        let mut view = CustomerView::default();
        view.load(sample());
        view.set_filters(CustomerFilters::from_inputs("o", "", "active"));
        assert!(view.filtered().iter().all(|c| view.all().contains(c)));
    }
}
