use crate::handlers::error::{render_page, DashboardError};
use crate::models::{AuthUser, InvoiceRow, InvoiceSummary, ListInvoicesFilter};
use crate::AppState;
use askama::Template;
use axum::{extract::State, response::Html};

const LATEST_INVOICES: usize = 5;

#[derive(Template)]
#[template(path = "dashboard/overview.html")]
pub struct OverviewTemplate {
    pub user_name: String,
    pub summary: InvoiceSummary,
    pub latest: Vec<InvoiceRow>,
}

pub async fn overview(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Html<String>, DashboardError> {
    let summary = state
        .invoices
        .invoice_summary()
        .await
        .map_err(DashboardError::at("/dashboard"))?;
    let mut latest = state
        .invoices
        .list_invoices(&ListInvoicesFilter::default())
        .await
        .map_err(DashboardError::at("/dashboard"))?;
    latest.truncate(LATEST_INVOICES);

    let html = render_page(&OverviewTemplate {
        user_name: user.display_name().to_string(),
        summary,
        latest,
    })
    .map_err(DashboardError::at("/dashboard"))?;
    Ok(Html(html))
}
