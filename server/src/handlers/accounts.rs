//! Account handlers - run a synchronizer operation and format its result.
//!
//! This is where soft errors turn into log lines: the synchronizer hands them
//! back, and [`settle`] logs each one at `warn` before the response is built.

use crate::envelope::Envelope;
use crate::error::{AppError, Result};
use crate::telemetry;
use axum::http::StatusCode;
use finance_engine::{
    AccountChanges, AccountId, Fetched, NewAccount, Synced, Synchronizer,
};
use serde::Deserialize;

/// Form fields accepted by create and update.
#[derive(Debug, Default, Deserialize)]
pub struct AccountForm {
    #[serde(default)]
    pub name: String,
    pub balance: Option<String>,
}

impl AccountForm {
    /// A missing or blank balance counts as zero.
    pub fn balance(&self) -> Result<f64> {
        let raw = self.balance.as_deref().map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Ok(0.0);
        }
        match raw.parse::<f64>() {
            Ok(balance) if balance.is_finite() => Ok(balance),
            _ => Err(AppError::BadRequest(format!("invalid balance '{raw}'"))),
        }
    }
}

/// Query parameters for search.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Parse an account id from the path. Anything that is not an id cannot name
/// an account.
pub fn parse_id(raw: &str) -> Result<AccountId> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("account {raw} not found")))
}

/// Log and count the outcome of an operation, returning its value.
fn settle<T>(operation: &'static str, result: finance_engine::Result<Synced<T>>) -> Result<T> {
    match result {
        Ok(synced) => {
            for soft in &synced.soft_errors {
                tracing::warn!(
                    operation,
                    store = %soft.store,
                    call = %soft.operation,
                    target = %soft.target,
                    error = %soft.source,
                    "Derived store call failed"
                );
                telemetry::record_soft_error(operation, soft);
            }
            telemetry::record_operation(operation, "success");
            Ok(synced.value)
        }
        Err(e) => {
            if e.is_not_found() {
                tracing::info!(operation, error = %e, "Account lookup failed");
            } else {
                tracing::error!(operation, error = %e, "Operation failed");
            }
            telemetry::record_operation(operation, "error");
            Err(e.into())
        }
    }
}

fn respond_read(operation: &'static str, fetched: Fetched) -> Result<Envelope> {
    telemetry::record_read(operation, fetched.source);
    Ok(Envelope::raw(StatusCode::OK, fetched.body)?)
}

/// Read one account.
pub async fn handle_get_account(sync: &Synchronizer, id: AccountId) -> Result<Envelope> {
    let fetched = settle("get_account", sync.get_account(id).await)?;
    respond_read("get_account", fetched)
}

/// Read every live account.
pub async fn handle_get_all_accounts(sync: &Synchronizer) -> Result<Envelope> {
    let fetched = settle("get_all_accounts", sync.get_all_accounts().await)?;
    respond_read("get_all_accounts", fetched)
}

/// Create an account.
pub async fn handle_create_account(sync: &Synchronizer, form: AccountForm) -> Result<Envelope> {
    let balance = form.balance()?;
    let summary = settle(
        "create_account",
        sync.create_account(NewAccount::new(form.name, balance)).await,
    )?;
    tracing::info!(id = summary.id, "Account created");
    Ok(Envelope::data(StatusCode::CREATED, &summary)?)
}

/// Update an account.
pub async fn handle_update_account(
    sync: &Synchronizer,
    id: AccountId,
    form: AccountForm,
) -> Result<Envelope> {
    let balance = form.balance()?;
    let summary = settle(
        "update_account",
        sync.update_account(id, AccountChanges::new(form.name, balance))
            .await,
    )?;
    Ok(Envelope::data(StatusCode::OK, &summary)?)
}

/// Soft-delete an account.
pub async fn handle_delete_account(sync: &Synchronizer, id: AccountId) -> Result<Envelope> {
    let summary = settle("delete_account", sync.delete_account(id).await)?;
    tracing::info!(id = summary.id, "Account deleted");
    Ok(Envelope::data(StatusCode::OK, &summary)?)
}

/// Free-text search.
pub async fn handle_search_accounts(sync: &Synchronizer, query: SearchQuery) -> Result<Envelope> {
    let accounts = settle("search_accounts", sync.search_accounts(&query.q).await)?;
    Ok(Envelope::data(StatusCode::OK, &accounts)?)
}
