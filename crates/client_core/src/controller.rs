//! Paginated list synchronization: one controller per list view, holding the
//! current query, the fetch state, and a request token that keeps stale
//! responses from overwriting newer ones.

use std::future::Future;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use shared::domain::DepartmentId;
use shared::protocol::{clamp_limit, ListQuery, PageData, PaginationMeta};
use tracing::debug;

use crate::{ApiClient, FetchFailure};

/// Which backend collection a controller synchronizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListRoute {
    CompanyInvoices,
    CompanyConsultants,
}

/// Observable state of one list view.
#[derive(Debug, Clone)]
pub enum FetchState<T> {
    Idle,
    Loading,
    Success {
        items: Vec<T>,
        pagination: PaginationMeta,
    },
    Error {
        message: String,
        attempts: u32,
    },
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

pub type FetchOutcome<T> = Result<PageData<T>, FetchFailure>;

/// Filter parameters a view can replace in one step. Replacing filters always
/// returns the list to page 1.
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub search: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub department_id: Option<DepartmentId>,
}

pub struct ListController<T> {
    client: ApiClient,
    route: ListRoute,
    query: ListQuery,
    state: FetchState<T>,
    issued: u64,
}

impl<T: DeserializeOwned> ListController<T> {
    pub fn new(client: ApiClient, route: ListRoute) -> Self {
        Self::with_query(client, route, ListQuery::default())
    }

    pub fn with_query(client: ApiClient, route: ListRoute, query: ListQuery) -> Self {
        Self {
            client,
            route,
            query,
            state: FetchState::Idle,
            issued: 0,
        }
    }

    pub fn state(&self) -> &FetchState<T> {
        &self.state
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn pagination(&self) -> Option<&PaginationMeta> {
        match &self.state {
            FetchState::Success { pagination, .. } => Some(pagination),
            _ => None,
        }
    }

    /// Start a fetch cycle: bump the request token, move to `Loading`, and
    /// hand back the token plus a future the caller may drive anywhere.
    /// Dropping the future abandons the request; no state is written until
    /// the outcome is passed to [`apply`](Self::apply).
    pub fn begin(&mut self) -> (u64, impl Future<Output = FetchOutcome<T>>) {
        self.issued += 1;
        let token = self.issued;
        self.state = FetchState::Loading;

        let client = self.client.clone();
        let route = self.route;
        let query = self.query.clone();
        (token, async move {
            client.fetch_page::<T>(route, &query).await
        })
    }

    /// Apply a fetch outcome. Outcomes from superseded cycles are dropped so
    /// a slow stale response can never overwrite a newer one.
    pub fn apply(&mut self, token: u64, outcome: FetchOutcome<T>) -> bool {
        if token != self.issued {
            debug!(token, latest = self.issued, "dropping stale fetch outcome");
            return false;
        }
        self.state = match outcome {
            Ok(page) => FetchState::Success {
                items: page.items,
                pagination: page.pagination,
            },
            Err(failure) => FetchState::Error {
                message: failure.error.to_string(),
                attempts: failure.attempts,
            },
        };
        true
    }

    /// Run one full fetch cycle in place.
    pub async fn refresh(&mut self) {
        let (token, fetch) = self.begin();
        let outcome = fetch.await;
        self.apply(token, outcome);
    }

    /// Replace the filter set, reset to page 1, and re-fetch.
    pub async fn apply_filters(&mut self, filters: ListFilters) {
        self.query.search = filters.search;
        self.query.status = filters.status;
        self.query.start_date = filters.start_date;
        self.query.end_date = filters.end_date;
        self.query.department_id = filters.department_id;
        self.query.page = 1;
        self.refresh().await;
    }

    /// Move to another page, clamped to the bounds of the last known
    /// pagination metadata. A no-op when the clamped page is already current.
    pub async fn change_page(&mut self, page: u64) {
        let clamped = self.clamp_page(page);
        if clamped == self.query.page {
            return;
        }
        self.query.page = clamped;
        self.refresh().await;
    }

    /// Change the page size; snaps to the allowed set and always returns to
    /// page 1.
    pub async fn change_limit(&mut self, limit: u64) {
        self.query.limit = clamp_limit(limit);
        self.query.page = 1;
        self.refresh().await;
    }

    /// Manual re-entry after an error. The retry budget lives inside the
    /// client, so this starts over at attempt 0.
    pub async fn retry(&mut self) {
        self.refresh().await;
    }

    fn clamp_page(&self, page: u64) -> u64 {
        let page = page.max(1);
        match self.pagination() {
            Some(meta) if meta.total_pages > 0 => page.min(meta.total_pages),
            _ => page,
        }
    }
}
