//! Pager
//!
//! Turns the paged `instances.list` endpoint into one lazy sequence.
//! A pager walks the pages exactly once; to start over, build a new one.

use super::client::{InstanceListRequest, SqlAdminApi};
use super::model::DatabaseInstance;
use crate::error::{Result, SqlError};
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;

/// Lazy, single-pass iterator over every instance of a list request
pub struct InstancePager<'a, A: SqlAdminApi + ?Sized> {
    api: &'a A,
    request: InstanceListRequest,
    page_token: Option<String>,
    buffer: VecDeque<DatabaseInstance>,
    exhausted: bool,
    pages_fetched: usize,
}

impl<'a, A: SqlAdminApi + ?Sized> InstancePager<'a, A> {
    pub fn new(api: &'a A, request: InstanceListRequest) -> Self {
        Self {
            api,
            request,
            page_token: None,
            buffer: VecDeque::new(),
            exhausted: false,
            pages_fetched: 0,
        }
    }

    /// Number of pages requested so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Next instance, fetching the next page when the buffered one runs out
    pub async fn next(&mut self) -> Result<Option<DatabaseInstance>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    /// Like [`next`](Self::next), but stops with `Cancelled` once `cancel`
    /// fires. Buffered items are still delivered; no page is requested after
    /// cancellation.
    pub async fn next_cancellable(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<DatabaseInstance>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            if self.exhausted {
                return Ok(None);
            }
            if cancel.is_cancelled() {
                self.exhausted = true;
                return Err(SqlError::Cancelled { operation: None });
            }
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                fetched = self.fetch_page() => Some(fetched),
            };
            match fetched {
                Some(fetched) => fetched?,
                None => {
                    self.exhausted = true;
                    return Err(SqlError::Cancelled { operation: None });
                },
            }
        }
    }

    /// Drain every remaining page into memory
    pub async fn collect_all(mut self) -> Result<Vec<DatabaseInstance>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let token = self.page_token.take();
        let response = match self.api.list_instances(&self.request, token.as_deref()).await {
            Ok(response) => response,
            Err(err) => {
                self.exhausted = true;
                return Err(err);
            },
        };
        self.pages_fetched += 1;

        for warning in &response.warnings {
            tracing::warn!(
                "List warning [{}]: {}",
                warning.code.as_deref().unwrap_or("UNKNOWN"),
                warning.message.as_deref().unwrap_or("-")
            );
        }

        let items = response.items.unwrap_or_default();
        if items.is_empty() {
            tracing::debug!("Page {} is empty, ending listing", self.pages_fetched);
            self.exhausted = true;
            return Ok(());
        }

        tracing::debug!("Page {}: {} instances", self.pages_fetched, items.len());
        self.buffer.extend(items);

        match response.next_page_token.filter(|t| !t.is_empty()) {
            Some(next) => self.page_token = Some(next),
            None => self.exhausted = true,
        }
        Ok(())
    }
}
