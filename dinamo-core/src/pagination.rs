/// Cursor-driven pagination
///
/// A fetch function is called with the cursor of the previous page (none for
/// the first call) until the store stops returning one. Pages are produced as
/// a lazy stream, so dropping the stream stops fetching: at most one request
/// is ever in flight.

use crate::{Item, Result};
use futures::{stream, Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::trace;

/// Opaque continuation token: the store's last evaluated key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor(Item);

impl Cursor {
    pub fn new(key: Item) -> Self {
        Self(key)
    }

    pub fn key(&self) -> &Item {
        &self.0
    }

    pub fn into_key(self) -> Item {
        self.0
    }
}

impl From<Item> for Cursor {
    fn from(key: Item) -> Self {
        Self(key)
    }
}

/// One page of results plus the cursor to resume from
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// None once the sequence is exhausted
    pub cursor: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, cursor: Option<Cursor>) -> Self {
        Self { items, cursor }
    }

    pub fn is_last(&self) -> bool {
        self.cursor.is_none()
    }

    /// Convert every item, failing on the first error
    pub fn try_map<U>(self, f: impl FnMut(T) -> Result<U>) -> Result<Page<U>> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<Vec<_>>>()?,
            cursor: self.cursor,
        })
    }
}

enum State {
    Fetching(Option<Cursor>),
    Done,
}

/// Lazy stream of pages starting at `start`.
///
/// Each page is fetched only after the previous one arrived; the stream ends
/// after the first page returned without a cursor.
pub fn pages<T, F, Fut>(start: Option<Cursor>, fetch: F) -> impl Stream<Item = Result<Page<T>>>
where
    F: FnMut(Option<Cursor>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    stream::try_unfold((State::Fetching(start), fetch), |(state, mut fetch)| async move {
        let cursor = match state {
            State::Fetching(cursor) => cursor,
            State::Done => return Ok(None),
        };

        let page = fetch(cursor).await?;
        trace!(items = page.items.len(), last = page.is_last(), "page fetched");

        let next = match &page.cursor {
            Some(cursor) => State::Fetching(Some(cursor.clone())),
            None => State::Done,
        };
        Ok(Some((page, (next, fetch))))
    })
}

/// Fetch one page, or every page when `recursive` is set.
///
/// Recursive fetches accumulate items in arrival order and finish with no
/// cursor. A single fetch returns the store's cursor for the caller to drive.
pub async fn collect<T, F, Fut>(start: Option<Cursor>, recursive: bool, fetch: F) -> Result<Page<T>>
where
    F: FnMut(Option<Cursor>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut pages = std::pin::pin!(pages(start, fetch));
    let mut items = Vec::new();
    let mut cursor = None;

    while let Some(page) = pages.try_next().await? {
        items.extend(page.items);
        cursor = page.cursor;
        if !recursive {
            break;
        }
    }

    Ok(Page { items, cursor })
}
