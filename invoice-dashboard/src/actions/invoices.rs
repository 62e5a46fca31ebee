use super::{FormState, Navigation, INVOICES_PATH};
use crate::models::{InvoiceChanges, NewInvoice};
use crate::services::metrics::record_mutation;
use crate::services::{InvoiceStore, ViewCache};
use crate::validation::{validate_invoice, InvoiceForm};
use chrono::Utc;
use service_core::error::AppError;
use tracing::{error, info, instrument, warn};

pub const CREATE_INVALID: &str = "Missing Fields. Failed to create invoice.";
pub const CREATE_FAILED: &str = "Failed to create invoice.";
pub const UPDATE_FAILED: &str = "Failed to update invoice.";

/// Validate the form, insert a new invoice dated today, then send the caller
/// back to a freshly rendered listing.
#[instrument(skip_all)]
pub async fn create_invoice(
    store: &dyn InvoiceStore,
    cache: &ViewCache,
    form: &InvoiceForm,
) -> Result<Navigation, FormState> {
    let validated = validate_invoice(form).map_err(|errors| {
        record_mutation("create", "invalid");
        FormState::invalid(errors, CREATE_INVALID)
    })?;

    let invoice = NewInvoice {
        amount_in_cents: validated.amount_in_cents(),
        customer_id: validated.customer_id,
        status: validated.status,
        date: Utc::now().date_naive(),
    };

    match store.insert_invoice(&invoice).await {
        Ok(id) => {
            info!(
                invoice_id = %id,
                customer_id = %invoice.customer_id,
                amount = invoice.amount_in_cents,
                status = %invoice.status,
                "Invoice created"
            );
        }
        Err(e) => {
            error!(error = %e, "Database Error: failed to create invoice");
            record_mutation("create", "failed");
            return Err(FormState::failed(CREATE_FAILED));
        }
    }

    record_mutation("create", "ok");
    cache.revalidate_path(INVOICES_PATH);
    Ok(Navigation::Redirect(INVOICES_PATH))
}

/// Validate the form and overwrite customer, amount and status of invoice `id`.
///
/// Validation failures carry the same message as create. An id matching no row is not a failure; it is logged and the caller is
/// redirected as usual.
#[instrument(skip(store, cache, form))]
pub async fn update_invoice(
    store: &dyn InvoiceStore,
    cache: &ViewCache,
    id: &str,
    form: &InvoiceForm,
) -> Result<Navigation, FormState> {
    let validated = validate_invoice(form).map_err(|errors| {
        record_mutation("update", "invalid");
        FormState::invalid(errors, CREATE_INVALID)
    })?;

    let changes = InvoiceChanges {
        amount_in_cents: validated.amount_in_cents(),
        customer_id: validated.customer_id,
        status: validated.status,
    };

    match store.update_invoice(id, &changes).await {
        Ok(0) => warn!("Update matched no invoice"),
        Ok(_) => info!(amount = changes.amount_in_cents, status = %changes.status, "Invoice updated"),
        Err(e) => {
            error!(error = %e, "Database Error: failed to update invoice");
            record_mutation("update", "failed");
            return Err(FormState::failed(UPDATE_FAILED));
        }
    }

    record_mutation("update", "ok");
    cache.revalidate_path(INVOICES_PATH);
    Ok(Navigation::Redirect(INVOICES_PATH))
}

/// Delete invoice `id` and mark the listing stale.
///
/// Deleting an id that matches no row is a no-op returning `Ok(0)`.
/// Store errors propagate.
#[instrument(skip(store, cache))]
pub async fn delete_invoice(
    store: &dyn InvoiceStore,
    cache: &ViewCache,
    id: &str,
) -> Result<u64, AppError> {
    let deleted = store.delete_invoice(id).await.inspect_err(|_| {
        record_mutation("delete", "failed");
    })?;

    if deleted == 0 {
        info!("Delete matched no invoice");
    } else {
        info!("Invoice deleted");
    }

    record_mutation("delete", "ok");
    cache.revalidate_path(INVOICES_PATH);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockStore;
    use crate::validation::{
        AMOUNT_MUST_BE_POSITIVE, AMOUNT_TOO_LARGE, CUSTOMER_ID_REQUIRED, STATUS_REQUIRED,
    };

    fn form(customer_id: &str, amount: &str, status: &str) -> InvoiceForm {
        InvoiceForm {
            customer_id: Some(customer_id.to_string()),
            amount: Some(amount.to_string()),
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    fn setup() -> (MockStore, ViewCache, String) {
        let store = MockStore::new();
        let customer = store.add_customer("Evil Rabbit", "evil@rabbit.com").unwrap();
        let cache = ViewCache::new();
        cache.store(INVOICES_PATH, "<stale/>");
        (store, cache, customer)
    }

    #[tokio::test]
    async fn create_persists_cents_and_today_then_redirects() {
        let (store, cache, customer) = setup();

        let nav = create_invoice(&store, &cache, &form(&customer, "25", "paid"))
            .await
            .unwrap();

        assert_eq!(nav, Navigation::Redirect("/dashboard/invoices"));
        let invoices = store.invoices().unwrap();
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].amount, 2500);
        assert_eq!(invoices[0].status, "paid");
        assert_eq!(invoices[0].date, Utc::now().date_naive());
        assert!(!cache.is_cached(INVOICES_PATH));
    }

    #[tokio::test]
    async fn create_with_fractional_dollars_stores_whole_cents() {
        let (store, cache, customer) = setup();
        create_invoice(&store, &cache, &form(&customer, "12.50", "pending"))
            .await
            .unwrap();
        assert_eq!(store.invoices().unwrap()[0].amount, 1250);
    }

    #[tokio::test]
    async fn create_with_zero_amount_returns_state_and_touches_nothing() {
        let (store, cache, customer) = setup();

        let state = create_invoice(&store, &cache, &form(&customer, "0", "pending"))
            .await
            .unwrap_err();

        assert_eq!(state.message.as_deref(), Some(CREATE_INVALID));
        assert_eq!(state.errors_for("amount"), [AMOUNT_MUST_BE_POSITIVE]);
        assert!(store.invoices().unwrap().is_empty());
        assert!(cache.is_cached(INVOICES_PATH));
    }

    #[tokio::test]
    async fn create_with_unstorable_amount_touches_nothing() {
        let (store, cache, customer) = setup();

        let state = create_invoice(&store, &cache, &form(&customer, "1e20", "pending"))
            .await
            .unwrap_err();

        assert_eq!(state.message.as_deref(), Some(CREATE_INVALID));
        assert_eq!(state.errors_for("amount"), [AMOUNT_TOO_LARGE]);
        assert!(store.invoices().unwrap().is_empty());
        assert!(cache.is_cached(INVOICES_PATH));
    }

    #[tokio::test]
    async fn update_with_unstorable_amount_keeps_the_row() {
        let (store, cache, customer) = setup();
        create_invoice(&store, &cache, &form(&customer, "10", "pending"))
            .await
            .unwrap();
        let id = store.invoices().unwrap()[0].id.clone();

        let state = update_invoice(&store, &cache, &id, &form(&customer, "1e20", "paid"))
            .await
            .unwrap_err();

        assert_eq!(state.errors_for("amount"), [AMOUNT_TOO_LARGE]);
        assert_eq!(store.invoices().unwrap()[0].amount, 1000);
        assert!(store.invoice_summary().await.is_ok());
    }

    #[tokio::test]
    async fn create_reports_every_invalid_field() {
        let (store, cache, _) = setup();
        let state = create_invoice(&store, &cache, &InvoiceForm::default())
            .await
            .unwrap_err();
        assert_eq!(state.errors_for("customerId"), [CUSTOMER_ID_REQUIRED]);
        assert_eq!(state.errors_for("status"), [STATUS_REQUIRED]);
    }

    #[tokio::test]
    async fn create_twice_makes_two_rows() {
        let (store, cache, customer) = setup();
        let submitted = form(&customer, "10", "pending");
        create_invoice(&store, &cache, &submitted).await.unwrap();
        create_invoice(&store, &cache, &submitted).await.unwrap();

        let invoices = store.invoices().unwrap();
        assert_eq!(invoices.len(), 2);
        assert_ne!(invoices[0].id, invoices[1].id);
    }

    #[tokio::test]
    async fn create_persistence_failure_is_a_form_state() {
        let (store, cache, customer) = setup();
        store.set_unavailable(true);

        let state = create_invoice(&store, &cache, &form(&customer, "10", "pending"))
            .await
            .unwrap_err();

        assert_eq!(state.message.as_deref(), Some(CREATE_FAILED));
        assert!(state.errors.is_empty());
        assert!(cache.is_cached(INVOICES_PATH));
    }

    #[tokio::test]
    async fn update_changes_customer_amount_status_only() {
        let (store, cache, customer) = setup();
        let other = store.add_customer("Amy Burns", "amy@burns.com").unwrap();
        create_invoice(&store, &cache, &form(&customer, "10", "pending"))
            .await
            .unwrap();
        let before = store.invoices().unwrap().remove(0);
        cache.store(INVOICES_PATH, "<stale/>");

        let nav = update_invoice(&store, &cache, &before.id, &form(&other, "99.99", "paid"))
            .await
            .unwrap();

        assert_eq!(nav.path(), INVOICES_PATH);
        let after = store.invoices().unwrap().remove(0);
        assert_eq!(after.id, before.id);
        assert_eq!(after.date, before.date);
        assert_eq!(after.customer_id, other);
        assert_eq!(after.amount, 9999);
        assert_eq!(after.status, "paid");
        assert!(!cache.is_cached(INVOICES_PATH));
    }

    #[tokio::test]
    async fn update_validation_failure_shares_create_message() {
        let (store, cache, customer) = setup();
        let state = update_invoice(&store, &cache, "any", &form(&customer, "-1", "paid"))
            .await
            .unwrap_err();
        assert_eq!(
            state.message.as_deref(),
            Some("Missing Fields. Failed to create invoice.")
        );
        assert_eq!(state.errors_for("amount"), [AMOUNT_MUST_BE_POSITIVE]);
    }

    #[tokio::test]
    async fn update_of_missing_invoice_still_redirects() {
        let (store, cache, customer) = setup();
        let nav = update_invoice(&store, &cache, "does-not-exist", &form(&customer, "5", "paid"))
            .await
            .unwrap();
        assert_eq!(nav, Navigation::Redirect(INVOICES_PATH));
        assert!(store.invoices().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_persistence_failure_is_a_form_state() {
        let (store, cache, customer) = setup();
        store.set_unavailable(true);
        let state = update_invoice(&store, &cache, "any", &form(&customer, "5", "paid"))
            .await
            .unwrap_err();
        assert_eq!(state.message.as_deref(), Some(UPDATE_FAILED));
    }

    #[tokio::test]
    async fn delete_twice_is_safe() {
        let (store, cache, customer) = setup();
        create_invoice(&store, &cache, &form(&customer, "10", "pending"))
            .await
            .unwrap();
        let id = store.invoices().unwrap()[0].id.clone();
        cache.store(INVOICES_PATH, "<stale/>");

        assert_eq!(delete_invoice(&store, &cache, &id).await.unwrap(), 1);
        assert!(!cache.is_cached(INVOICES_PATH));
        assert_eq!(delete_invoice(&store, &cache, &id).await.unwrap(), 0);
        assert!(store.invoices().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_persistence_failure_propagates() {
        let (store, cache, _) = setup();
        store.set_unavailable(true);
        let result = delete_invoice(&store, &cache, "any").await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
        assert!(cache.is_cached(INVOICES_PATH));
    }
}
