//! Invoice model for invoice-dashboard.

use crate::utils::currency::format_currency;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Number of invoices shown per listing page.
pub const ITEMS_PER_PAGE: u32 = 6;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown invoice status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for InvoiceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Invoice as stored. `amount` is in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: String,
    pub customer_id: String,
    pub amount: i64,
    pub status: String,
    pub date: NaiveDate,
}

impl Invoice {
    /// Amount in dollars as entered in the edit form (`12.5`, `25`).
    pub fn amount_in_dollars(&self) -> String {
        let dollars = self.amount / 100;
        let cents = self.amount % 100;
        if cents == 0 {
            dollars.to_string()
        } else {
            format!("{}.{:02}", dollars, cents)
        }
    }
}

/// Listing row: an invoice joined with its customer.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InvoiceRow {
    pub id: String,
    pub customer_id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub amount: i64,
    pub status: String,
    pub date: NaiveDate,
}

impl InvoiceRow {
    pub fn amount_display(&self) -> String {
        format_currency(self.amount)
    }

    pub fn date_display(&self) -> String {
        self.date.format("%b %-d, %Y").to_string()
    }

    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid.as_str()
    }
}

/// Input for inserting an invoice. The id is assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub customer_id: String,
    pub amount_in_cents: i64,
    pub status: InvoiceStatus,
    pub date: NaiveDate,
}

/// Fields an update may change. Id and date are immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceChanges {
    pub customer_id: String,
    pub amount_in_cents: i64,
    pub status: InvoiceStatus,
}

/// Search and pagination for the invoice listing.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub query: String,
    pub page: u32,
}

impl ListInvoicesFilter {
    pub fn new(query: Option<String>, page: Option<u32>) -> Self {
        Self {
            query: query.map(|q| q.trim().to_string()).unwrap_or_default(),
            page: page.unwrap_or(1).max(1),
        }
    }

    pub fn limit(&self) -> i64 {
        ITEMS_PER_PAGE as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) as i64 - 1) * ITEMS_PER_PAGE as i64
    }

    /// `ILIKE` pattern for the search query.
    pub fn pattern(&self) -> String {
        contains_pattern(&self.query)
    }

    /// Only the unfiltered first page is served from the view cache.
    pub fn is_default_view(&self) -> bool {
        self.query.is_empty() && self.page <= 1
    }
}

/// `ILIKE` pattern matching `text` anywhere, with `%` and `_` taken literally.
///
/// Escapes use backslash, Postgres' default `LIKE` escape character.
pub fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Number of listing pages needed for `total` matching invoices.
pub fn total_pages(total: i64) -> u32 {
    let per_page = ITEMS_PER_PAGE as i64;
    ((total.max(0) + per_page - 1) / per_page) as u32
}

/// Totals shown on the dashboard overview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
pub struct InvoiceSummary {
    pub invoice_count: i64,
    pub customer_count: i64,
    pub paid_cents: i64,
    pub pending_cents: i64,
}

impl InvoiceSummary {
    pub fn paid_display(&self) -> String {
        format_currency(self.paid_cents)
    }

    pub fn pending_display(&self) -> String {
        format_currency(self.pending_cents)
    }
}
