//! Client-side core for the workforce dashboard backend: an authenticated
//! HTTP client with bounded retry for transient failures, typed endpoint
//! wrappers, and the paginated list controller views consume.

use std::sync::Arc;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::domain::{
    CompanyId, ConsultantRecord, InvoiceId, InvoiceRecord, InvoiceStatus, InvoiceStatusSummary,
    MonthlyRevenuePoint, Role, TimeLogId, UserId,
};
use shared::protocol::{
    ApiEnvelope, ApproveTimeLogsRequest, ListQuery, PageData, UpdateInvoiceStatusRequest,
};
use tracing::{debug, warn};

mod controller;
mod error;
mod retry;

pub use controller::{FetchOutcome, FetchState, ListController, ListFilters, ListRoute};
pub use error::{is_transient_message, FetchError, FetchFailure};
pub use retry::RetryPolicy;

/// Authenticated principal scoping every request.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub role: Role,
    pub company_id: Option<CompanyId>,
    pub auth_token: Option<String>,
}

/// Read-only session lookup injected into the client so it can be exercised
/// without a real auth backend.
pub trait SessionProvider: Send + Sync {
    fn current(&self) -> Option<Session>;
}

pub struct StaticSessionProvider {
    session: Session,
}

impl StaticSessionProvider {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

impl SessionProvider for StaticSessionProvider {
    fn current(&self) -> Option<Session> {
        Some(self.session.clone())
    }
}

/// Null session source: every scoped call fails before the network.
pub struct MissingSessionProvider;

impl SessionProvider for MissingSessionProvider {
    fn current(&self) -> Option<Session> {
        None
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Arc<dyn SessionProvider>) -> Self {
        Self::with_retry_policy(base_url, session, RetryPolicy::default())
    }

    pub fn with_retry_policy(
        base_url: impl Into<String>,
        session: Arc<dyn SessionProvider>,
        retry: RetryPolicy,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
            session,
            retry,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// `GET /company/invoices/{companyId}` with the query's filters.
    pub async fn list_invoices(
        &self,
        query: &ListQuery,
    ) -> Result<PageData<InvoiceRecord>, FetchFailure> {
        self.fetch_page(ListRoute::CompanyInvoices, query).await
    }

    /// `GET /company/consultants` with the query's filters.
    pub async fn list_consultants(
        &self,
        query: &ListQuery,
    ) -> Result<PageData<ConsultantRecord>, FetchFailure> {
        self.fetch_page(ListRoute::CompanyConsultants, query).await
    }

    /// `GET /company/invoices/{companyId}/summary`, the non-paginated rollup.
    pub async fn invoice_summary(&self) -> Result<Vec<InvoiceStatusSummary>, FetchFailure> {
        let company_id = self
            .company_id()
            .map_err(FetchFailure::before_request)?;
        let url = format!("{}/company/invoices/{}/summary", self.base_url, company_id);
        self.get_with_retry(url, Vec::new()).await
    }

    /// `GET /company/invoices/{companyId}/monthly`, the chart series.
    pub async fn monthly_revenue(&self) -> Result<Vec<MonthlyRevenuePoint>, FetchFailure> {
        let company_id = self
            .company_id()
            .map_err(FetchFailure::before_request)?;
        let url = format!("{}/company/invoices/{}/monthly", self.base_url, company_id);
        self.get_with_retry(url, Vec::new()).await
    }

    /// Fetch one page of the given collection. Context resolution happens
    /// before any request is issued, so a missing company id costs zero
    /// network calls.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        route: ListRoute,
        query: &ListQuery,
    ) -> Result<PageData<T>, FetchFailure> {
        let url = self
            .route_url(route)
            .map_err(FetchFailure::before_request)?;
        self.get_with_retry(url, query.query_pairs()).await
    }

    /// `PUT /company/invoices/{id}/status`. Mutations are not idempotent and
    /// are never retried; failures surface immediately.
    pub async fn update_invoice_status(
        &self,
        invoice_id: &InvoiceId,
        status: InvoiceStatus,
    ) -> Result<(), FetchError> {
        self.require_session()?;
        let url = format!("{}/company/invoices/{}/status", self.base_url, invoice_id);
        let body = UpdateInvoiceStatusRequest {
            invoice_id: invoice_id.clone(),
            status,
        };
        self.send_mutation(Method::PUT, url, &body).await
    }

    /// `POST /company/time-logs/approve` for a batch of time log ids.
    pub async fn approve_time_logs(&self, time_log_ids: &[TimeLogId]) -> Result<(), FetchError> {
        self.require_session()?;
        let url = format!("{}/company/time-logs/approve", self.base_url);
        let body = ApproveTimeLogsRequest {
            time_log_ids: time_log_ids.to_vec(),
        };
        self.send_mutation(Method::POST, url, &body).await
    }

    fn route_url(&self, route: ListRoute) -> Result<String, FetchError> {
        match route {
            ListRoute::CompanyInvoices => {
                let company_id = self.company_id()?;
                Ok(format!("{}/company/invoices/{}", self.base_url, company_id))
            }
            ListRoute::CompanyConsultants => {
                self.require_session()?;
                Ok(format!("{}/company/consultants", self.base_url))
            }
        }
    }

    fn require_session(&self) -> Result<Session, FetchError> {
        self.session
            .current()
            .ok_or_else(|| FetchError::MissingContext("Session not found".to_string()))
    }

    fn company_id(&self) -> Result<CompanyId, FetchError> {
        self.session
            .current()
            .and_then(|session| session.company_id)
            .ok_or_else(|| FetchError::MissingContext("Company ID not found".to_string()))
    }

    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        url: String,
        pairs: Vec<(&'static str, String)>,
    ) -> Result<T, FetchFailure> {
        let mut attempt: u32 = 0;
        loop {
            match self.get_envelope(&url, &pairs).await {
                Ok(value) => {
                    debug!(%url, attempts = attempt + 1, "fetch completed");
                    return Ok(value);
                }
                Err(error) if error.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        %url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    warn!(%url, attempts = attempt + 1, %error, "fetch failed");
                    return Err(FetchFailure {
                        error,
                        attempts: attempt + 1,
                    });
                }
            }
        }
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        url: &str,
        pairs: &[(&'static str, String)],
    ) -> Result<T, FetchError> {
        let mut request = self.http.get(url).timeout(self.retry.request_timeout);
        if !pairs.is_empty() {
            request = request.query(&pairs);
        }
        if let Some(token) = self.session.current().and_then(|s| s.auth_token) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let body = response.text().await.map_err(map_transport_error)?;
        let envelope: ApiEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
            FetchError::InvalidResponse(format!("failed to parse response: {e}, body: {body}"))
        })?;
        envelope.into_result().map_err(FetchError::from)
    }

    async fn send_mutation<B: Serialize>(
        &self,
        method: Method,
        url: String,
        body: &B,
    ) -> Result<(), FetchError> {
        let mut request = self
            .http
            .request(method, &url)
            .timeout(self.retry.request_timeout)
            .json(body);
        if let Some(token) = self.session.current().and_then(|s| s.auth_token) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let text = response.text().await.map_err(map_transport_error)?;
        // Mutation envelopes often carry no data; only the status matters.
        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_str(&text).map_err(|e| {
            FetchError::InvalidResponse(format!("failed to parse response: {e}, body: {text}"))
        })?;
        if envelope.status != 200 {
            return Err(FetchError::Api {
                message: envelope
                    .message
                    .unwrap_or_else(|| "request failed".to_string()),
            });
        }
        debug!(%url, "mutation accepted");
        Ok(())
    }
}

fn map_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(err)
    }
}

#[cfg(test)]
mod tests;
