//! In-process store used by tests and local demos.

use crate::models::{
    total_pages, Customer, CustomerSummary, Invoice, InvoiceChanges, InvoiceRow, InvoiceStatus,
    InvoiceSummary, ListInvoicesFilter, NewInvoice, User,
};
use crate::services::database::{InvoiceStore, UserStore};
use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    customers: Vec<Customer>,
    invoices: Vec<Invoice>,
    users: Vec<User>,
}

pub struct MockStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// While set, every call fails with a database error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn add_customer(&self, name: &str, email: &str) -> Result<String, AppError> {
        let id = Uuid::new_v4().to_string();
        self.tables()?.customers.push(Customer {
            id: id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            image_url: format!("/static/customers/{}.png", name.to_lowercase().replace(' ', "-")),
        });
        Ok(id)
    }

    pub fn add_user(&self, name: &str, email: &str, password_hash: &str) -> Result<String, AppError> {
        let id = Uuid::new_v4().to_string();
        self.tables()?.users.push(User {
            id: id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            password: password_hash.to_string(),
        });
        Ok(id)
    }

    /// Snapshot of all stored invoices.
    pub fn invoices(&self) -> Result<Vec<Invoice>, AppError> {
        Ok(self.tables()?.invoices.clone())
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Mock store mutex poisoned: {}", e)))
    }

    fn available(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "connection refused"
            )));
        }
        self.tables()
    }
}

fn rows(tables: &Tables, query: &str) -> Vec<InvoiceRow> {
    let needle = query.to_lowercase();
    let mut rows: Vec<InvoiceRow> = tables
        .invoices
        .iter()
        .filter_map(|invoice| {
            let customer = tables.customers.iter().find(|c| c.id == invoice.customer_id)?;
            Some(InvoiceRow {
                id: invoice.id.clone(),
                customer_id: invoice.customer_id.clone(),
                name: customer.name.clone(),
                email: customer.email.clone(),
                image_url: customer.image_url.clone(),
                amount: invoice.amount,
                status: invoice.status.clone(),
                date: invoice.date,
            })
        })
        .filter(|row| {
            needle.is_empty()
                || row.name.to_lowercase().contains(&needle)
                || row.email.to_lowercase().contains(&needle)
                || row.amount.to_string().contains(&needle)
                || row.date.to_string().contains(&needle)
                || row.status.contains(&needle)
        })
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
    rows
}

/// Total of the given invoices, failing like Postgres' `SUM(..)::bigint`
/// when the result leaves the `BIGINT` range.
fn sum_cents<'a>(mut invoices: impl Iterator<Item = &'a Invoice>) -> Result<i64, AppError> {
    invoices
        .try_fold(0i64, |total, invoice| total.checked_add(invoice.amount))
        .ok_or_else(|| AppError::DatabaseError(anyhow::anyhow!("bigint out of range")))
}

#[async_trait]
impl InvoiceStore for MockStore {
    async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<String, AppError> {
        let mut tables = self.available()?;
        if !tables.customers.iter().any(|c| c.id == invoice.customer_id) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "insert or update on table \"invoices\" violates foreign key constraint"
            )));
        }

        let id = Uuid::new_v4().to_string();
        tables.invoices.push(Invoice {
            id: id.clone(),
            customer_id: invoice.customer_id.clone(),
            amount: invoice.amount_in_cents,
            status: invoice.status.as_str().to_string(),
            date: invoice.date,
        });
        Ok(id)
    }

    async fn update_invoice(&self, id: &str, changes: &InvoiceChanges) -> Result<u64, AppError> {
        let mut tables = self.available()?;
        if !tables.customers.iter().any(|c| c.id == changes.customer_id) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "insert or update on table \"invoices\" violates foreign key constraint"
            )));
        }

        let Some(invoice) = tables.invoices.iter_mut().find(|i| i.id == id) else {
            return Ok(0);
        };
        invoice.customer_id = changes.customer_id.clone();
        invoice.amount = changes.amount_in_cents;
        invoice.status = changes.status.as_str().to_string();
        Ok(1)
    }

    async fn delete_invoice(&self, id: &str) -> Result<u64, AppError> {
        let mut tables = self.available()?;
        let before = tables.invoices.len();
        tables.invoices.retain(|i| i.id != id);
        Ok((before - tables.invoices.len()) as u64)
    }

    async fn find_invoice(&self, id: &str) -> Result<Option<Invoice>, AppError> {
        let tables = self.available()?;
        Ok(tables.invoices.iter().find(|i| i.id == id).cloned())
    }

    async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<InvoiceRow>, AppError> {
        let tables = self.available()?;
        Ok(rows(&tables, &filter.query)
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .collect())
    }

    async fn count_invoice_pages(&self, query: &str) -> Result<u32, AppError> {
        let tables = self.available()?;
        Ok(total_pages(rows(&tables, query).len() as i64))
    }

    async fn invoice_summary(&self) -> Result<InvoiceSummary, AppError> {
        let tables = self.available()?;
        let total_for = |status: InvoiceStatus| {
            sum_cents(tables.invoices.iter().filter(|i| i.status == status.as_str()))
        };
        Ok(InvoiceSummary {
            invoice_count: tables.invoices.len() as i64,
            customer_count: tables.customers.len() as i64,
            paid_cents: total_for(InvoiceStatus::Paid)?,
            pending_cents: total_for(InvoiceStatus::Pending)?,
        })
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        let tables = self.available()?;
        let mut customers = tables.customers.clone();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    async fn list_customer_summaries(
        &self,
        query: &str,
    ) -> Result<Vec<CustomerSummary>, AppError> {
        let tables = self.available()?;
        let needle = query.to_lowercase();
        let mut summaries: Vec<CustomerSummary> = tables
            .customers
            .iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle) || c.email.to_lowercase().contains(&needle)
            })
            .map(|c| -> Result<CustomerSummary, AppError> {
                let invoices: Vec<&Invoice> = tables
                    .invoices
                    .iter()
                    .filter(|i| i.customer_id == c.id)
                    .collect();
                let total_for = |status: InvoiceStatus| {
                    sum_cents(
                        invoices
                            .iter()
                            .copied()
                            .filter(|i| i.status == status.as_str()),
                    )
                };
                Ok(CustomerSummary {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    email: c.email.clone(),
                    image_url: c.image_url.clone(),
                    total_invoices: invoices.len() as i64,
                    total_pending: total_for(InvoiceStatus::Pending)?,
                    total_paid: total_for(InvoiceStatus::Paid)?,
                })
            })
            .collect::<Result<_, AppError>>()?;
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.available().map(|_| ())
    }
}

#[async_trait]
impl UserStore for MockStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.available()?;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_invoice(customer_id: &str, cents: i64, day: u32) -> NewInvoice {
        NewInvoice {
            customer_id: customer_id.to_string(),
            amount_in_cents: cents,
            status: InvoiceStatus::Pending,
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
        }
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_paginated() {
        let store = MockStore::new();
        let customer = store.add_customer("Delba de Oliveira", "delba@oliveira.com").unwrap();
        for day in 1..=8 {
            store.insert_invoice(&new_invoice(&customer, 100 * day as i64, day)).await.unwrap();
        }

        let first = store
            .list_invoices(&ListInvoicesFilter::new(None, Some(1)))
            .await
            .unwrap();
        assert_eq!(first.len(), 6);
        assert_eq!(first[0].date.to_string(), "2024-05-08");

        let second = store
            .list_invoices(&ListInvoicesFilter::new(None, Some(2)))
            .await
            .unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(store.count_invoice_pages("").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn search_matches_customer_fields() {
        let store = MockStore::new();
        let delba = store.add_customer("Delba de Oliveira", "delba@oliveira.com").unwrap();
        let lee = store.add_customer("Lee Robinson", "lee@robinson.com").unwrap();
        store.insert_invoice(&new_invoice(&delba, 1000, 1)).await.unwrap();
        store.insert_invoice(&new_invoice(&lee, 2000, 2)).await.unwrap();

        let rows = store
            .list_invoices(&ListInvoicesFilter::new(Some("ROBINSON".into()), None))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Lee Robinson");
    }

    #[tokio::test]
    async fn totals_past_bigint_fail_instead_of_overflowing() {
        let store = MockStore::new();
        let customer = store.add_customer("Delba de Oliveira", "delba@oliveira.com").unwrap();
        let half = i64::MAX / 2 + 1;
        store.insert_invoice(&new_invoice(&customer, half, 1)).await.unwrap();

        let summary = store.invoice_summary().await.unwrap();
        assert_eq!(summary.pending_cents, half);

        store.insert_invoice(&new_invoice(&customer, half, 2)).await.unwrap();
        assert!(matches!(
            store.invoice_summary().await,
            Err(AppError::DatabaseError(_))
        ));
        assert!(matches!(
            store.list_customer_summaries("").await,
            Err(AppError::DatabaseError(_))
        ));
    }

    #[tokio::test]
    async fn search_wildcards_match_literally() {
        let store = MockStore::new();
        let delba = store.add_customer("Delba de Oliveira", "delba@oliveira.com").unwrap();
        store.insert_invoice(&new_invoice(&delba, 1000, 1)).await.unwrap();

        for query in ["%", "_", "Delba%"] {
            let rows = store
                .list_invoices(&ListInvoicesFilter::new(Some(query.into()), None))
                .await
                .unwrap();
            assert!(rows.is_empty(), "{}", query);
            assert_eq!(store.count_invoice_pages(query).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn unknown_customer_violates_foreign_key() {
        let store = MockStore::new();
        let result = store.insert_invoice(&new_invoice("missing", 100, 1)).await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MockStore::new();
        store.set_unavailable(true);
        assert!(store.health_check().await.is_err());
        assert!(store.find_user_by_email("user@nextmail.com").await.is_err());
        store.set_unavailable(false);
        assert!(store.health_check().await.is_ok());
    }
}
