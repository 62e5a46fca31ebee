use crate::utils::currency::format_currency;
use serde::Serialize;
use sqlx::FromRow;

/// Customer as offered in the invoice form.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
}

/// Customer with invoice totals, for the customers page.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CustomerSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub total_invoices: i64,
    pub total_pending: i64,
    pub total_paid: i64,
}

impl CustomerSummary {
    pub fn pending_display(&self) -> String {
        format_currency(self.total_pending)
    }

    pub fn paid_display(&self) -> String {
        format_currency(self.total_paid)
    }
}
