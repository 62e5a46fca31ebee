use crate::handlers::error::{render_page, DashboardError};
use crate::models::CustomerSummary;
use crate::AppState;
use askama::Template;
use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;

const CUSTOMERS_PATH: &str = "/dashboard/customers";

#[derive(Debug, Default, Deserialize)]
pub struct CustomersQuery {
    pub query: Option<String>,
}

#[derive(Template)]
#[template(path = "customers/list.html")]
pub struct CustomersTemplate {
    pub query: String,
    pub customers: Vec<CustomerSummary>,
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<CustomersQuery>,
) -> Result<Html<String>, DashboardError> {
    let query = params.query.unwrap_or_default().trim().to_string();

    let customers = state
        .invoices
        .list_customer_summaries(&query)
        .await
        .map_err(DashboardError::at(CUSTOMERS_PATH))?;

    let html = render_page(&CustomersTemplate { query, customers })
        .map_err(DashboardError::at(CUSTOMERS_PATH))?;
    Ok(Html(html))
}
