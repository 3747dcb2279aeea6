#![allow(missing_docs)]

//! Search box controller: debounced input, modal visibility and query dispatch.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{api::SearchHit, debounce::Debouncer, error::PortalError};

/// Downstream query service fed with settled search text.
#[async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, PortalError>;
}

/// Result of one query, delivered back to the UI.
#[derive(Debug)]
pub struct SearchOutcome {
    pub query: String,
    pub result: Result<Vec<SearchHit>, PortalError>,
}

/// State behind the search input.
///
/// Typing opens the results modal right away; the modal's query only follows
/// once the text has settled.
pub struct SearchBox {
    value: String,
    modal_open: bool,
    debouncer: Debouncer<String>,
}

impl SearchBox {
    pub fn new(delay: Duration) -> Result<Self, PortalError> {
        Ok(Self {
            value: String::new(),
            modal_open: false,
            debouncer: Debouncer::new(delay, String::new())?,
        })
    }

    /// Apply an edit of the input text.
    pub fn handle_change(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.modal_open = !self.value.is_empty();
        self.debouncer.feed(self.value.clone());
    }

    pub fn push_char(&mut self, ch: char) {
        let mut next = self.value.clone();
        next.push(ch);
        self.handle_change(next);
    }

    pub fn pop_char(&mut self) {
        let mut next = self.value.clone();
        if next.pop().is_some() {
            self.handle_change(next);
        }
    }

    /// Text as typed.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Text that has settled; this is what the modal searches for.
    pub fn debounced(&self) -> String {
        self.debouncer.current_settled_value()
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal_open
    }

    /// Hide the results modal, keeping the typed text.
    pub fn close(&mut self) {
        self.modal_open = false;
    }

    /// Settle events of the underlying debouncer.
    pub fn settle_events(&self) -> UnboundedReceiver<String> {
        self.debouncer.settle_events()
    }

    /// Stop reacting to input; pending settles are dropped.
    pub fn dispose(&self) {
        self.debouncer.dispose();
    }
}

/// Query to send for a settled value. Empty text means "do not query".
pub fn query_for(settled: &str) -> Option<&str> {
    let query = settled.trim();
    (!query.is_empty()).then_some(query)
}

/// Run one backend query per settle event until the settle stream closes or
/// the receiver of outcomes goes away.
pub fn spawn_search_worker<B>(
    backend: Arc<B>,
    mut settled: UnboundedReceiver<String>,
    outcomes: mpsc::Sender<SearchOutcome>,
) -> JoinHandle<()>
where
    B: SearchBackend + ?Sized,
{
    tokio::spawn(async move {
        while let Some(value) = settled.recv().await {
            let Some(query) = query_for(&value) else {
                debug!("Settled search is empty; skipping query");
                continue;
            };
            debug!(query, "Dispatching search");
            let result = backend.search(query).await;
            if let Err(err) = &result {
                warn!(query, "Search failed: {err}");
            }
            let outcome = SearchOutcome {
                query: query.to_string(),
                result,
            };
            if outcomes.send(outcome).await.is_err() {
                break;
            }
        }
        debug!("Search worker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use parking_lot::Mutex;
    use tokio::time::sleep;

    #[derive(Default)]
    struct RecordingBackend {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SearchBackend for RecordingBackend {
        async fn search(&self, query: &str) -> Result<Vec<SearchHit>, PortalError> {
            self.queries.lock().push(query.to_string());
            Ok(vec![SearchHit {
                title: format!("{query} result"),
                description: None,
                url: None,
            }])
        }
    }

    #[test]
    fn empty_settled_values_are_not_queried() {
        assert_eq!(query_for(""), None);
        assert_eq!(query_for("   "), None);
        assert_eq!(query_for(" app "), Some("app"));
    }

    #[tokio::test(start_paused = true)]
    async fn modal_follows_raw_text_and_query_follows_settled_text() -> Result<()> {
        let mut search = SearchBox::new(Duration::from_millis(500))?;
        assert!(!search.is_modal_open());

        search.push_char('a');
        search.push_char('p');
        assert!(search.is_modal_open());
        assert_eq!(search.value(), "ap");
        assert_eq!(search.debounced(), "");

        sleep(Duration::from_millis(600)).await;
        assert_eq!(search.debounced(), "ap");

        search.close();
        assert!(!search.is_modal_open());
        assert_eq!(search.value(), "ap");

        search.pop_char();
        search.pop_char();
        assert!(!search.is_modal_open());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn worker_queries_once_per_settle() -> Result<()> {
        let backend = Arc::new(RecordingBackend::default());
        let mut search = SearchBox::new(Duration::from_millis(500))?;
        let (tx, mut rx) = mpsc::channel(8);
        let worker = spawn_search_worker(backend.clone(), search.settle_events(), tx);

        for ch in "app".chars() {
            search.push_char(ch);
            sleep(Duration::from_millis(30)).await;
        }
        let outcome = rx.recv().await.expect("search outcome");
        assert_eq!(outcome.query, "app");
        assert_eq!(outcome.result?.len(), 1);

        search.handle_change("");
        sleep(Duration::from_millis(600)).await;
        search.handle_change("pear");
        let outcome = rx.recv().await.expect("search outcome");
        assert_eq!(outcome.query, "pear");

        assert_eq!(*backend.queries.lock(), vec!["app".to_string(), "pear".to_string()]);

        search.dispose();
        worker.await?;
        Ok(())
    }
}
