//! Database service for invoice-dashboard.

use crate::config::DatabaseSettings;
use crate::models::{
    contains_pattern, total_pages, Customer, CustomerSummary, Invoice, InvoiceChanges, InvoiceRow,
    InvoiceSummary, ListInvoicesFilter, NewInvoice, User,
};
use crate::services::metrics::DB_QUERY_DURATION;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use service_core::error::AppError;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Invoice and customer persistence.
///
/// Identifiers are opaque strings. An id the store cannot have issued simply
/// matches no row.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Insert an invoice and return its store-generated id.
    async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<String, AppError>;

    /// Update customer, amount and status. Returns the number of rows affected.
    async fn update_invoice(&self, id: &str, changes: &InvoiceChanges) -> Result<u64, AppError>;

    /// Delete by id. Returns the number of rows affected.
    async fn delete_invoice(&self, id: &str) -> Result<u64, AppError>;

    async fn find_invoice(&self, id: &str) -> Result<Option<Invoice>, AppError>;

    async fn list_invoices(&self, filter: &ListInvoicesFilter)
        -> Result<Vec<InvoiceRow>, AppError>;

    async fn count_invoice_pages(&self, query: &str) -> Result<u32, AppError>;

    async fn invoice_summary(&self) -> Result<InvoiceSummary, AppError>;

    async fn list_customers(&self) -> Result<Vec<Customer>, AppError>;

    async fn list_customer_summaries(&self, query: &str)
        -> Result<Vec<CustomerSummary>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// User lookup for the credentials provider.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(settings), fields(service = "invoice-dashboard"))]
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, AppError> {
        info!(
            max_connections = settings.max_connections,
            min_connections = settings.min_connections,
            require_ssl = settings.require_ssl,
            "Connecting to PostgreSQL"
        );

        let ssl_mode = if settings.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        let options = PgConnectOptions::from_str(settings.url.expose_secret())
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid database URL: {}", e)))?
            .ssl_mode(ssl_mode);

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

/// Ids are UUIDs in Postgres; anything else cannot match a row.
fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

const INVOICE_SEARCH: &str = r#"
    customers.name ILIKE $1 OR
    customers.email ILIKE $1 OR
    invoices.amount::text ILIKE $1 OR
    invoices.date::text ILIKE $1 OR
    invoices.status ILIKE $1
"#;

#[async_trait]
impl InvoiceStore for Database {
    #[instrument(skip(self, invoice), fields(customer_id = %invoice.customer_id))]
    async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<String, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice"])
            .start_timer();

        let id: String = sqlx::query_scalar(
            r#"
            INSERT INTO invoices (customer_id, amount, status, date)
            VALUES ($1::uuid, $2, $3, $4)
            RETURNING id::text
            "#,
        )
        .bind(&invoice.customer_id)
        .bind(invoice.amount_in_cents)
        .bind(invoice.status.as_str())
        .bind(invoice.date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert invoice: {}", e)))?;

        timer.observe_duration();

        Ok(id)
    }

    #[instrument(skip(self, changes), fields(invoice_id = %id))]
    async fn update_invoice(&self, id: &str, changes: &InvoiceChanges) -> Result<u64, AppError> {
        let Some(invoice_id) = parse_id(id) else {
            return Ok(0);
        };

        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET customer_id = $1::uuid, amount = $2, status = $3
            WHERE id = $4
            "#,
        )
        .bind(&changes.customer_id)
        .bind(changes.amount_in_cents)
        .bind(changes.status.as_str())
        .bind(invoice_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(invoice_id = %id))]
    async fn delete_invoice(&self, id: &str) -> Result<u64, AppError> {
        let Some(invoice_id) = parse_id(id) else {
            return Ok(0);
        };

        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(invoice_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoice: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(invoice_id = %id))]
    async fn find_invoice(&self, id: &str) -> Result<Option<Invoice>, AppError> {
        let Some(invoice_id) = parse_id(id) else {
            return Ok(None);
        };

        sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id::text AS id, customer_id::text AS customer_id, amount, status, date
            FROM invoices
            WHERE id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))
    }

    #[instrument(skip(self), fields(query = %filter.query, page = filter.page))]
    async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<InvoiceRow>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let sql = format!(
            r#"
            SELECT
                invoices.id::text AS id,
                invoices.customer_id::text AS customer_id,
                customers.name,
                customers.email,
                customers.image_url,
                invoices.amount,
                invoices.status,
                invoices.date
            FROM invoices
            JOIN customers ON invoices.customer_id = customers.id
            WHERE {}
            ORDER BY invoices.date DESC, invoices.id
            LIMIT $2 OFFSET $3
            "#,
            INVOICE_SEARCH
        );

        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(filter.pattern())
            .bind(filter.limit())
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e))
            })?;

        timer.observe_duration();

        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn count_invoice_pages(&self, query: &str) -> Result<u32, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_invoice_pages"])
            .start_timer();

        let sql = format!(
            r#"
            SELECT COUNT(*)
            FROM invoices
            JOIN customers ON invoices.customer_id = customers.id
            WHERE {}
            "#,
            INVOICE_SEARCH
        );

        let total: i64 = sqlx::query_scalar(&sql)
            .bind(contains_pattern(query))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to count invoices: {}", e))
            })?;

        timer.observe_duration();

        Ok(total_pages(total))
    }

    #[instrument(skip(self))]
    async fn invoice_summary(&self) -> Result<InvoiceSummary, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["invoice_summary"])
            .start_timer();

        let summary = sqlx::query_as::<_, InvoiceSummary>(
            r#"
            SELECT
                COUNT(*) AS invoice_count,
                (SELECT COUNT(*) FROM customers) AS customer_count,
                COALESCE(SUM(CASE WHEN status = 'paid' THEN amount ELSE 0 END), 0)::bigint AS paid_cents,
                COALESCE(SUM(CASE WHEN status = 'pending' THEN amount ELSE 0 END), 0)::bigint AS pending_cents
            FROM invoices
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to summarize invoices: {}", e))
        })?;

        timer.observe_duration();

        Ok(summary)
    }

    #[instrument(skip(self))]
    async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_customers"])
            .start_timer();

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id::text AS id, name, email, image_url
            FROM customers
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list customers: {}", e)))?;

        timer.observe_duration();

        Ok(customers)
    }

    #[instrument(skip(self))]
    async fn list_customer_summaries(
        &self,
        query: &str,
    ) -> Result<Vec<CustomerSummary>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_customer_summaries"])
            .start_timer();

        let summaries = sqlx::query_as::<_, CustomerSummary>(
            r#"
            SELECT
                customers.id::text AS id,
                customers.name,
                customers.email,
                customers.image_url,
                COUNT(invoices.id) AS total_invoices,
                COALESCE(SUM(CASE WHEN invoices.status = 'pending' THEN invoices.amount ELSE 0 END), 0)::bigint AS total_pending,
                COALESCE(SUM(CASE WHEN invoices.status = 'paid' THEN invoices.amount ELSE 0 END), 0)::bigint AS total_paid
            FROM customers
            LEFT JOIN invoices ON customers.id = invoices.customer_id
            WHERE customers.name ILIKE $1 OR customers.email ILIKE $1
            GROUP BY customers.id, customers.name, customers.email, customers.image_url
            ORDER BY customers.name ASC
            "#,
        )
        .bind(contains_pattern(query))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list customers: {}", e)))?;

        timer.observe_duration();

        Ok(summaries)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for Database {
    #[instrument(skip(self, email))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id::text AS id, name, email, password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find user: {}", e)))
    }
}
