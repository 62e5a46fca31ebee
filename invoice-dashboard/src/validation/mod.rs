//! Invoice form schema.
//!
//! Raw form fields are coerced into typed values first, then checked with
//! `validator` rules. Malformed input is an ordinary `Err(FieldErrors)`, never
//! a panic or an `AppError`.

use crate::models::InvoiceStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors};

pub const CUSTOMER_ID_REQUIRED: &str = "Customer ID is required";
pub const AMOUNT_MUST_BE_POSITIVE: &str = "Amount must be greater than $0";
pub const STATUS_REQUIRED: &str = "Please select an invoice status";
pub const AMOUNT_TOO_LARGE: &str = "Amount is too large";

/// Largest storable amount. Every cent value up to here is exact in an `f64`.
pub const MAX_AMOUNT_CENTS: i64 = (1 << 53) - 1;

/// Invoice form as submitted. Every field is optional at this stage.
///
/// `id` and `date` may be present in a submission but are not part of the
/// create/update schema and are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceForm {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "customerId")]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl InvoiceForm {
    pub fn customer_id_value(&self) -> &str {
        self.customer_id.as_deref().unwrap_or_default()
    }

    pub fn amount_value(&self) -> &str {
        self.amount.as_deref().unwrap_or_default()
    }

    pub fn status_value(&self) -> &str {
        self.status.as_deref().unwrap_or_default()
    }
}

/// Coerced input the rules run against.
#[derive(Debug, Validate)]
struct InvoiceInput {
    #[validate(
        required(message = "Customer ID is required"),
        length(min = 1, message = "Customer ID is required")
    )]
    customer_id: Option<String>,
    #[validate(
        required(message = "Amount must be greater than $0"),
        range(exclusive_min = 0.0, message = "Amount must be greater than $0")
    )]
    amount: Option<f64>,
    #[validate(required(message = "Please select an invoice status"))]
    status: Option<InvoiceStatus>,
}

impl From<&InvoiceForm> for InvoiceInput {
    fn from(form: &InvoiceForm) -> Self {
        Self {
            customer_id: form.customer_id.as_deref().map(|s| s.trim().to_string()),
            amount: form.amount.as_deref().and_then(coerce_amount),
            status: form.status.as_deref().and_then(|s| s.trim().parse().ok()),
        }
    }
}

/// Parse a dollar amount and round it to whole cents.
///
/// Unparsable and non-finite input coerces to nothing, which the `required`
/// rule reports with the amount message.
fn coerce_amount(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| (v * 100.0).round() / 100.0)
}

/// Convert dollars to whole cents, or `None` when the result falls outside
/// `-MAX_AMOUNT_CENTS..=MAX_AMOUNT_CENTS`.
pub fn dollars_to_cents(dollars: f64) -> Option<i64> {
    let cents = (dollars * 100.0).round();
    if cents.is_finite() && cents.abs() <= MAX_AMOUNT_CENTS as f64 {
        Some(cents as i64)
    } else {
        None
    }
}

/// Invoice fields that passed the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInvoice {
    pub customer_id: String,
    pub amount: f64,
    pub status: InvoiceStatus,
    cents: i64,
}

impl ValidatedInvoice {
    pub fn amount_in_cents(&self) -> i64 {
        self.cents
    }
}

/// Error messages keyed by form field name (`customerId`, `amount`, `status`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut field_errors = FieldErrors::default();
        for (field, errs) in errors.field_errors() {
            let field: &str = field.as_ref();
            let form_field = match field {
                "customer_id" => "customerId",
                other => other,
            };
            for err in errs {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                field_errors.add(form_field, message);
            }
        }
        field_errors
    }
}

/// Run the create/update schema over a submitted form.
pub fn validate_invoice(form: &InvoiceForm) -> Result<ValidatedInvoice, FieldErrors> {
    let input = InvoiceInput::from(form);
    let mut errors = match input.validate() {
        Ok(()) => FieldErrors::default(),
        Err(e) => FieldErrors::from(e),
    };

    let cents = input.amount.and_then(dollars_to_cents);
    if input.amount.is_some_and(|v| v > 0.0) && cents.is_none() {
        errors.add("amount", AMOUNT_TOO_LARGE);
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let (Some(customer_id), Some(amount), Some(status), Some(cents)) =
        (input.customer_id, input.amount, input.status, cents)
    else {
        // `required` rejects every missing field above
        return Err(FieldErrors::default());
    };

    Ok(ValidatedInvoice {
        customer_id,
        amount,
        status,
        cents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(customer_id: Option<&str>, amount: Option<&str>, status: Option<&str>) -> InvoiceForm {
        InvoiceForm {
            customer_id: customer_id.map(String::from),
            amount: amount.map(String::from),
            status: status.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn valid_form_is_coerced() {
        let validated = validate_invoice(&form(Some("abc"), Some("12.50"), Some("paid"))).unwrap();
        assert_eq!(validated.customer_id, "abc");
        assert_eq!(validated.amount, 12.5);
        assert_eq!(validated.status, InvoiceStatus::Paid);
        assert_eq!(validated.amount_in_cents(), 1250);
    }

    #[test]
    fn non_positive_and_non_numeric_amounts_are_rejected() {
        for amount in [
            Some("0"),
            Some("-5"),
            Some("abc"),
            Some(""),
            Some("NaN"),
            Some("inf"),
            Some("0.001"),
            None,
        ] {
            let errors = validate_invoice(&form(Some("abc"), amount, Some("pending")))
                .expect_err("amount should be rejected");
            assert_eq!(errors.get("amount"), [AMOUNT_MUST_BE_POSITIVE], "{:?}", amount);
            assert!(errors.get("customerId").is_empty());
            assert!(errors.get("status").is_empty());
        }
    }

    #[test]
    fn amounts_beyond_storable_cents_are_rejected() {
        for amount in ["1e20", "90071992547410", "1e300"] {
            let errors = validate_invoice(&form(Some("abc"), Some(amount), Some("paid")))
                .expect_err("amount should be rejected");
            assert_eq!(errors.get("amount"), [AMOUNT_TOO_LARGE], "{}", amount);
        }

        let large = validate_invoice(&form(Some("abc"), Some("90000000000000"), Some("paid")))
            .unwrap();
        assert_eq!(large.amount_in_cents(), 9_000_000_000_000_000);
        assert!(large.amount_in_cents() <= MAX_AMOUNT_CENTS);
    }

    #[test]
    fn too_large_amount_is_reported_with_other_fields() {
        let errors = validate_invoice(&form(None, Some("1e20"), None)).unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            ["amount", "customerId", "status"]
        );
        assert_eq!(errors.get("amount"), [AMOUNT_TOO_LARGE]);
    }

    #[test]
    fn cents_conversion_is_checked() {
        assert_eq!(dollars_to_cents(12.345), Some(1235));
        assert_eq!(dollars_to_cents(-1.0), Some(-100));
        assert_eq!(dollars_to_cents(1e20), None);
        assert_eq!(dollars_to_cents(f64::INFINITY), None);
        assert_eq!(dollars_to_cents(f64::NAN), None);
    }

    #[test]
    fn missing_customer_is_rejected() {
        for customer_id in [None, Some(""), Some("   ")] {
            let errors = validate_invoice(&form(customer_id, Some("10"), Some("paid"))).unwrap_err();
            assert_eq!(errors.get("customerId"), [CUSTOMER_ID_REQUIRED]);
            assert_eq!(errors.fields().collect::<Vec<_>>(), ["customerId"]);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        for status in [None, Some(""), Some("overdue"), Some("Paid")] {
            let errors = validate_invoice(&form(Some("abc"), Some("10"), status)).unwrap_err();
            assert_eq!(errors.get("status"), [STATUS_REQUIRED]);
        }
    }

    #[test]
    fn every_failing_field_is_reported_once() {
        let errors = validate_invoice(&InvoiceForm::default()).unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            ["amount", "customerId", "status"]
        );
        assert_eq!(errors.get("customerId").len(), 1);
        assert_eq!(errors.get("amount").len(), 1);
        assert_eq!(errors.get("status").len(), 1);
    }

    #[test]
    fn id_and_date_are_ignored() {
        let mut submitted = form(Some("abc"), Some("25"), Some("pending"));
        submitted.id = Some("not-used".into());
        submitted.date = Some("not a date".into());
        let validated = validate_invoice(&submitted).unwrap();
        assert_eq!(validated.amount_in_cents(), 2500);
    }

    #[test]
    fn amounts_round_to_whole_cents() {
        let validated = validate_invoice(&form(Some("abc"), Some("0.1"), Some("paid"))).unwrap();
        assert_eq!(validated.amount_in_cents(), 10);
        let validated = validate_invoice(&form(Some("abc"), Some("19.999"), Some("paid"))).unwrap();
        assert_eq!(validated.amount_in_cents(), 2000);
    }
}
