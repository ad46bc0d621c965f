use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DepartmentId, InvoiceId, InvoiceStatus, TimeLogId};

/// Page sizes the backend accepts for list endpoints.
pub const ALLOWED_LIMITS: [u64; 5] = [5, 10, 20, 50, 100];

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Uniform response wrapper used by every backend endpoint. Success and
/// failure are signalled by the embedded `status` field, not the HTTP
/// status line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("{message}")]
    Rejected { message: String },

    #[error("response envelope has status 200 but no data")]
    MissingData,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload. The check is against the envelope's own `status`
    /// field: anything other than 200 is a rejection carrying the server's
    /// message, even when the HTTP layer reported success.
    pub fn into_result(self) -> Result<T, EnvelopeError> {
        if self.status != 200 {
            return Err(EnvelopeError::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| "request failed".to_string()),
            });
        }
        self.data.ok_or(EnvelopeError::MissingData)
    }
}

/// Paginated collection payload carried in `ApiEnvelope::data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageData<T> {
    pub items: Vec<T>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Derive consistent metadata for a window over `total` items.
    pub fn compute(page: u64, limit: u64, total: u64) -> Self {
        let limit = limit.max(1);
        let total_pages = total.div_ceil(limit);
        let page = page.max(1);
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    /// Whether a server-supplied value satisfies the pagination invariants.
    pub fn is_consistent(&self) -> bool {
        *self == Self::compute(self.page, self.limit, self.total)
    }
}

/// Query parameters for the list endpoints. `page` and `limit` are always
/// sent; filters are omitted when unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u64,
    pub limit: u64,
    pub search: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub department_id: Option<DepartmentId>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: None,
            status: None,
            start_date: None,
            end_date: None,
            department_id: None,
        }
    }
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u64) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = clamp_limit(limit);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_department(mut self, department_id: DepartmentId) -> Self {
        self.department_id = Some(department_id);
        self
    }

    /// Render the query-string pairs the backend expects (camelCase keys).
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(status) = &self.status {
            pairs.push(("status", status.clone()));
        }
        if let Some(start) = self.start_date {
            pairs.push(("startDate", start.to_string()));
        }
        if let Some(end) = self.end_date {
            pairs.push(("endDate", end.to_string()));
        }
        if let Some(department_id) = &self.department_id {
            pairs.push(("departmentId", department_id.to_string()));
        }
        pairs
    }
}

/// Snap an arbitrary limit to the nearest value the backend accepts.
pub fn clamp_limit(limit: u64) -> u64 {
    ALLOWED_LIMITS
        .into_iter()
        .min_by_key(|allowed| allowed.abs_diff(limit))
        .unwrap_or(DEFAULT_LIMIT)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceStatusRequest {
    pub invoice_id: InvoiceId,
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveTimeLogsRequest {
    pub time_log_ids: Vec<TimeLogId>,
}
