use super::exec::{Connection, Transport};
use super::telemetry;
use super::types::QueryRequest;
use crate::errors::SearchError;
use crate::types::Document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollState {
    Idle,
    InProgress { scroll_id: String },
    Exhausted,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollPage {
    pub documents: Vec<Document>,
    pub scroll_id: Option<String>,
    pub total: u64,
}

/// Server-side scroll over one query. Single owner, sequential access: the first page runs
/// the full search, later pages send only the scroll id and keep-alive.
pub struct ScrollCursor<'a, T: Transport> {
    connection: &'a Connection<T>,
    request: QueryRequest,
    scroll_time: String,
    state: ScrollState,
}

impl<'a, T: Transport> ScrollCursor<'a, T> {
    pub(crate) fn new(connection: &'a Connection<T>, request: QueryRequest) -> Self {
        let scroll_time =
            request.scroll_time.clone().unwrap_or_else(|| connection.config().scroll_time.clone());
        // An id on the request resumes an existing scroll.
        let state = match &request.scroll_id {
            Some(id) => ScrollState::InProgress { scroll_id: id.clone() },
            None => ScrollState::Idle,
        };
        Self { connection, request, scroll_time, state }
    }

    #[must_use]
    pub fn state(&self) -> &ScrollState {
        &self.state
    }

    #[must_use]
    pub fn scroll_id(&self) -> Option<&str> {
        match &self.state {
            ScrollState::InProgress { scroll_id } => Some(scroll_id),
            _ => None,
        }
    }

    /// Fetch the next page. `Ok(None)` once an empty page was seen; the cursor is then
    /// exhausted and issues no further requests.
    ///
    /// # Errors
    /// Compile and transport errors. The cursor state is left unchanged.
    pub fn next_page(&mut self) -> Result<Option<ScrollPage>, SearchError> {
        let results = match &self.state {
            ScrollState::Exhausted => return Ok(None),
            ScrollState::Idle => {
                let mut initial = self.request.clone();
                initial.scroll_time = Some(self.scroll_time.clone());
                initial.scroll_id = None;
                self.connection.select(&initial)?
            }
            ScrollState::InProgress { scroll_id } => self.connection.scroll_page(
                scroll_id,
                &self.scroll_time,
                self.request.include_inner_hits,
            )?,
        };
        telemetry::record_scroll_page();
        if results.documents.is_empty() {
            log::debug!("scroll on {} exhausted", self.request.index);
            self.state = ScrollState::Exhausted;
            return Ok(None);
        }
        self.state = match &results.scroll_id {
            Some(id) => ScrollState::InProgress { scroll_id: id.clone() },
            None => ScrollState::Exhausted,
        };
        Ok(Some(ScrollPage {
            documents: results.documents,
            scroll_id: results.scroll_id,
            total: results.total,
        }))
    }
}

/// Single-pass lazy sequence of documents behind a page buffer. Not restartable; open a new
/// cursor to iterate again.
pub struct DocumentCursor<'a, T: Transport> {
    pages: ScrollCursor<'a, T>,
    buffer: std::vec::IntoIter<Document>,
    limit: Option<u64>,
    yielded: u64,
    done: bool,
}

impl<'a, T: Transport> DocumentCursor<'a, T> {
    pub(crate) fn new(pages: ScrollCursor<'a, T>, limit: Option<u64>) -> Self {
        Self { pages, buffer: Vec::new().into_iter(), limit, yielded: 0, done: false }
    }

    #[must_use]
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// Drain the remaining documents, stopping at the first error.
    ///
    /// # Errors
    /// The first compile or transport error.
    pub fn to_vec(self) -> Result<Vec<Document>, SearchError> {
        self.collect()
    }
}

impl<T: Transport> Iterator for DocumentCursor<'_, T> {
    type Item = Result<Document, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(limit) = self.limit
            && self.yielded >= limit
        {
            self.done = true;
            return None;
        }
        loop {
            if let Some(doc) = self.buffer.next() {
                self.yielded += 1;
                return Some(Ok(doc));
            }
            match self.pages.next_page() {
                Ok(Some(page)) => self.buffer = page.documents.into_iter(),
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
