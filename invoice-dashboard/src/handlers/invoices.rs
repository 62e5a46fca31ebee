use crate::actions::invoices::{create_invoice, delete_invoice, update_invoice};
use crate::actions::{FormState, INVOICES_PATH};
use crate::handlers::error::{render_page, DashboardError};
use crate::handlers::{is_htmx, navigate};
use crate::models::{Customer, InvoiceRow, ListInvoicesFilter};
use crate::utils::url::encode_component;
use crate::validation::InvoiceForm;
use crate::AppState;
use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use service_core::error::AppError;

const CREATE_PATH: &str = "/dashboard/invoices/create";
const INVOICE_NOT_FOUND: &str = "Could not find the requested invoice.";

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub query: Option<String>,
    /// Kept as text so a malformed page number falls back to page 1.
    pub page: Option<String>,
}

pub struct PageLink {
    pub number: u32,
    pub href: String,
    pub active: bool,
}

#[derive(Template)]
#[template(path = "invoices/list.html")]
pub struct InvoicesTemplate {
    pub query: String,
    pub invoices: Vec<InvoiceRow>,
    pub pages: Vec<PageLink>,
    pub prev_href: String,
    pub next_href: String,
}

#[derive(Template)]
#[template(path = "invoices/form.html")]
pub struct InvoiceFormTemplate<'a> {
    pub heading: &'a str,
    pub action: String,
    pub submit_label: &'a str,
    pub customers: Vec<Customer>,
    pub form: InvoiceForm,
    pub state: FormState,
}

fn page_href(query: &str, page: u32) -> String {
    if query.is_empty() {
        format!("{}?page={}", INVOICES_PATH, page)
    } else {
        format!(
            "{}?query={}&page={}",
            INVOICES_PATH,
            encode_component(query),
            page
        )
    }
}

fn page_links(query: &str, current: u32, total: u32) -> Vec<PageLink> {
    (1..=total)
        .map(|number| PageLink {
            number,
            href: page_href(query, number),
            active: number == current,
        })
        .collect()
}

/// Invoice listing. The unfiltered first page is served from the view cache
/// until a mutation revalidates it.
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Html<String>, DashboardError> {
    let page = params.page.as_deref().and_then(|p| p.parse::<u32>().ok());
    let filter = ListInvoicesFilter::new(params.query, page);

    if filter.is_default_view() {
        if let Some(html) = state.view_cache.get(INVOICES_PATH) {
            return Ok(Html(html.to_string()));
        }
    }
    // Read before querying so a mutation landing mid-render is not masked.
    let generation = state.view_cache.generation(INVOICES_PATH);

    let retry_path = page_href(&filter.query, filter.page);
    let invoices = state
        .invoices
        .list_invoices(&filter)
        .await
        .map_err(DashboardError::at(&retry_path))?;
    let total_pages = state
        .invoices
        .count_invoice_pages(&filter.query)
        .await
        .map_err(DashboardError::at(&retry_path))?;

    let prev_href = if filter.page > 1 {
        page_href(&filter.query, filter.page - 1)
    } else {
        String::new()
    };
    let next_href = if filter.page < total_pages {
        page_href(&filter.query, filter.page + 1)
    } else {
        String::new()
    };

    let html = render_page(&InvoicesTemplate {
        pages: page_links(&filter.query, filter.page, total_pages),
        query: filter.query.clone(),
        invoices,
        prev_href,
        next_href,
    })
    .map_err(DashboardError::at(&retry_path))?;

    if filter.is_default_view() {
        state
            .view_cache
            .store_if_unchanged(INVOICES_PATH, generation, html.as_str());
    }

    Ok(Html(html))
}

async fn customers(state: &AppState, retry_path: &str) -> Result<Vec<Customer>, DashboardError> {
    state
        .invoices
        .list_customers()
        .await
        .map_err(DashboardError::at(retry_path))
}

pub async fn create_page(State(state): State<AppState>) -> Result<Html<String>, DashboardError> {
    let template = InvoiceFormTemplate {
        heading: "Create Invoice",
        action: CREATE_PATH.to_string(),
        submit_label: "Create Invoice",
        customers: customers(&state, CREATE_PATH).await?,
        form: InvoiceForm::default(),
        state: FormState::default(),
    };
    let html = render_page(&template).map_err(DashboardError::at(CREATE_PATH))?;
    Ok(Html(html))
}

pub async fn create_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<InvoiceForm>,
) -> Result<Response, DashboardError> {
    match create_invoice(state.invoices.as_ref(), &state.view_cache, &form).await {
        Ok(navigation) => Ok(navigate(&headers, navigation)),
        Err(form_state) => {
            let template = InvoiceFormTemplate {
                heading: "Create Invoice",
                action: CREATE_PATH.to_string(),
                submit_label: "Create Invoice",
                customers: customers(&state, CREATE_PATH).await?,
                form,
                state: form_state,
            };
            let html = render_page(&template).map_err(DashboardError::at(CREATE_PATH))?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response())
        }
    }
}

fn edit_path(id: &str) -> String {
    format!("{}/{}/edit", INVOICES_PATH, encode_component(id))
}

pub async fn edit_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, DashboardError> {
    let action = edit_path(&id);

    let invoice = state
        .invoices
        .find_invoice(&id)
        .await
        .map_err(DashboardError::at(&action))?
        .ok_or_else(|| {
            DashboardError::new(
                AppError::NotFound(anyhow::anyhow!(INVOICE_NOT_FOUND)),
                INVOICES_PATH,
            )
        })?;

    let form = InvoiceForm {
        amount: Some(invoice.amount_in_dollars()),
        id: Some(invoice.id),
        customer_id: Some(invoice.customer_id),
        status: Some(invoice.status),
        date: Some(invoice.date.to_string()),
    };

    let template = InvoiceFormTemplate {
        heading: "Edit Invoice",
        submit_label: "Edit Invoice",
        customers: customers(&state, &action).await?,
        form,
        state: FormState::default(),
        action: action.clone(),
    };
    let html = render_page(&template).map_err(DashboardError::at(&action))?;
    Ok(Html(html))
}

pub async fn edit_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Form(form): Form<InvoiceForm>,
) -> Result<Response, DashboardError> {
    match update_invoice(state.invoices.as_ref(), &state.view_cache, &id, &form).await {
        Ok(navigation) => Ok(navigate(&headers, navigation)),
        Err(form_state) => {
            let action = edit_path(&id);
            let template = InvoiceFormTemplate {
                heading: "Edit Invoice",
                submit_label: "Edit Invoice",
                customers: customers(&state, &action).await?,
                form,
                state: form_state,
                action: action.clone(),
            };
            let html = render_page(&template).map_err(DashboardError::at(&action))?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response())
        }
    }
}

/// HTMX callers get an empty body so the row can be swapped out in place;
/// plain posts are sent back to the listing.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, DashboardError> {
    delete_invoice(state.invoices.as_ref(), &state.view_cache, &id)
        .await
        .map_err(DashboardError::at(INVOICES_PATH))?;

    if is_htmx(&headers) {
        Ok(StatusCode::OK.into_response())
    } else {
        Ok(Redirect::to(INVOICES_PATH).into_response())
    }
}
