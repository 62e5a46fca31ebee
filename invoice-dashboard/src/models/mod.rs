//! Domain models for invoice-dashboard.

mod customer;
mod invoice;
pub mod user;

pub use customer::{Customer, CustomerSummary};
pub use invoice::{
    contains_pattern, total_pages, Invoice, InvoiceChanges, InvoiceRow, InvoiceStatus, InvoiceSummary,
    ListInvoicesFilter, NewInvoice, UnknownStatus, ITEMS_PER_PAGE,
};
pub use user::{AuthUser, User};
