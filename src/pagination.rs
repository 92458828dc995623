//! Page-until-empty pagination
//!
//! GitHub list endpoints signal the end of a listing with an empty page. The
//! loop below is an explicit two-state machine: it stays in
//! [`PageState::Fetching`] while pages return items and moves to
//! [`PageState::Complete`] on the first empty page or failure. Pages are
//! requested strictly one after another.

use std::future::Future;

/// First page number used by the API
pub const FIRST_PAGE: u32 = 1;

/// Position of a pagination loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageState {
    /// The given page is the next one to request
    Fetching {
        /// 1-based page number
        page: u32,
    },
    /// No further pages will be requested
    Complete,
}

impl PageState {
    /// Transition after a page returned `item_count` items
    pub fn advance(self, item_count: usize) -> PageState {
        match self {
            PageState::Fetching { page } if item_count > 0 => PageState::Fetching { page: page + 1 },
            PageState::Fetching { .. } | PageState::Complete => PageState::Complete,
        }
    }
}

/// Outcome of a full pagination loop
#[derive(Debug)]
pub struct Paginated<T, E> {
    /// Items of every successful page, in page order
    pub items: Vec<T>,
    /// Number of page requests issued (including the terminating one)
    pub requests: u32,
    /// Failure that stopped the loop early, if any
    pub error: Option<E>,
}

impl<T, E> Paginated<T, E> {
    /// Convert into a plain result, discarding partial items on failure
    pub fn into_result(self) -> Result<Vec<T>, E> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.items),
        }
    }
}

/// Request pages starting at [`FIRST_PAGE`] until one comes back empty
///
/// A failing page ends the loop; items gathered from earlier pages are kept.
pub async fn paginate<T, E, F, Fut>(mut fetch_page: F) -> Paginated<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let mut items = Vec::new();
    let mut requests = 0;
    let mut state = PageState::Fetching { page: FIRST_PAGE };

    while let PageState::Fetching { page } = state {
        requests += 1;
        match fetch_page(page).await {
            Ok(batch) => {
                state = state.advance(batch.len());
                items.extend(batch);
            }
            Err(e) => {
                return Paginated {
                    items,
                    requests,
                    error: Some(e),
                };
            }
        }
    }

    Paginated {
        items,
        requests,
        error: None,
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn state_advances_on_items_and_completes_on_empty() {
        let state = PageState::Fetching { page: 1 };
        assert_eq!(state.advance(100), PageState::Fetching { page: 2 });
        assert_eq!(state.advance(0), PageState::Complete);
        assert_eq!(PageState::Complete.advance(5), PageState::Complete);
    }

    #[tokio::test]
    async fn concatenates_pages_until_empty() {
        let pages: Vec<Vec<u32>> = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9], vec![]];
        let requested = Mutex::new(Vec::new());

        let result = paginate(|page| {
            requested.lock().unwrap().push(page);
            let batch = pages[(page - 1) as usize].clone();
            async move { Ok::<_, String>(batch) }
        })
        .await;

        assert_eq!(result.items, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(result.requests, 4, "K=3 full pages plus the empty one");
        assert!(result.error.is_none());
        assert_eq!(*requested.lock().unwrap(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn empty_first_page_issues_one_request() {
        let result = paginate(|_| async { Ok::<Vec<u8>, String>(vec![]) }).await;
        assert!(result.items.is_empty());
        assert_eq!(result.requests, 1);
        assert!(result.into_result().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_keeps_items_from_earlier_pages() {
        let result = paginate(|page| async move {
            match page {
                1 => Ok(vec!["a", "b"]),
                _ => Err("HTTP 500".to_string()),
            }
        })
        .await;

        assert_eq!(result.items, vec!["a", "b"]);
        assert_eq!(result.requests, 2);
        assert_eq!(result.error.as_deref(), Some("HTTP 500"));
    }

    #[tokio::test]
    async fn into_result_surfaces_error() {
        let result = paginate(|_| async { Err::<Vec<u8>, _>("boom") }).await;
        assert_eq!(result.into_result().unwrap_err(), "boom");
    }
}
