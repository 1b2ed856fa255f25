use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ApiError;
use crate::models::SupportTicket;
use crate::polling::{PollSource, Poller};
use crate::snapshot::{Applied, FetchSeq, Fetched, SnapshotCell};
use crate::store::TicketStore;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentOutcome {
    Posted,
    Empty,
    InFlight,
    Closed,
    NotLoaded,
}

/// Status view of one submitted ticket: initial load, background refresh,
/// and comments.
pub struct TicketTracker<T> {
    store: Rc<TicketStore<T>>,
    ticket_number: String,
    snapshot: Rc<SnapshotCell<SupportTicket>>,
    poller: Poller,
    posting: Cell<bool>,
    observer: Rc<dyn Fn(&SupportTicket)>,
}

impl<T: Transport + 'static> TicketTracker<T> {
    pub fn new(
        store: TicketStore<T>,
        ticket_number: impl Into<String>,
        poller: Poller,
        observer: impl Fn(&SupportTicket) + 'static,
    ) -> Self {
        Self {
            store: Rc::new(store),
            ticket_number: ticket_number.into(),
            snapshot: Rc::new(SnapshotCell::new()),
            poller,
            posting: Cell::new(false),
            observer: Rc::new(observer),
        }
    }

    pub fn ticket_number(&self) -> &str {
        &self.ticket_number
    }

    pub fn ticket(&self) -> Option<SupportTicket> {
        self.snapshot.get()
    }

    pub fn is_posting(&self) -> bool {
        self.posting.get()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_active()
    }

    /// `Ok(None)` is the "ticket not found" case, shown inline by the caller.
    pub async fn load(&self) -> Result<Option<SupportTicket>, ApiError> {
        let seq = self.snapshot.begin();
        let Some(ticket) = self.store.fetch_ticket(&self.ticket_number).await? else {
            debug!(ticket_number = %self.ticket_number, "ticket not found");
            return Ok(None);
        };
        self.apply(seq, ticket.clone());
        self.ensure_polling();
        Ok(Some(ticket))
    }

    pub async fn add_comment(&self, content: &str) -> Result<CommentOutcome, ApiError> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(CommentOutcome::Empty);
        }
        if self.posting.get() {
            return Ok(CommentOutcome::InFlight);
        }
        let Some(ticket) = self.snapshot.get() else {
            return Ok(CommentOutcome::NotLoaded);
        };
        if ticket.status.is_terminal() {
            return Ok(CommentOutcome::Closed);
        }

        self.posting.set(true);
        let seq = self.snapshot.begin();
        let result = self
            .store
            .add_ticket_comment(&self.ticket_number, content)
            .await;
        self.posting.set(false);

        self.apply(seq, result?);
        Ok(CommentOutcome::Posted)
    }

    pub fn ensure_polling(&self) -> bool {
        let Some(ticket) = self.snapshot.get() else {
            return false;
        };
        if ticket.status.is_terminal() || self.poller.is_active() {
            return false;
        }
        let feed = TicketFeed {
            store: Rc::clone(&self.store),
            ticket_number: self.ticket_number.clone(),
            snapshot: Rc::clone(&self.snapshot),
        };
        let initial = Fetched {
            seq: FetchSeq::INITIAL,
            value: ticket,
        };
        let snapshot = Rc::clone(&self.snapshot);
        let observer = Rc::clone(&self.observer);
        self.poller
            .launch(feed, &initial, move |fetched: Fetched<SupportTicket>| {
                if snapshot.apply(fetched.seq, fetched.value) == Applied::Replaced {
                    if let Some(current) = snapshot.get() {
                        observer(&current);
                    }
                }
            })
    }

    pub fn detach(&self) {
        self.poller.stop();
    }

    fn apply(&self, seq: FetchSeq, ticket: SupportTicket) {
        if self.snapshot.apply(seq, ticket) == Applied::Replaced {
            if let Some(current) = self.snapshot.get() {
                (self.observer)(&current);
            }
        }
    }
}

impl<T> Drop for TicketTracker<T> {
    fn drop(&mut self) {
        self.poller.stop();
    }
}

struct TicketFeed<T> {
    store: Rc<TicketStore<T>>,
    ticket_number: String,
    snapshot: Rc<SnapshotCell<SupportTicket>>,
}

#[async_trait(?Send)]
impl<T: Transport> PollSource for TicketFeed<T> {
    type Snapshot = Fetched<SupportTicket>;

    async fn fetch(&self) -> Result<Self::Snapshot, ApiError> {
        let seq = self.snapshot.begin();
        let value = self
            .store
            .fetch_ticket(&self.ticket_number)
            .await?
            .ok_or_else(|| ApiError::NotFound {
                path: format!("/api/forms/support/ticket/{}", self.ticket_number),
            })?;
        Ok(Fetched { seq, value })
    }

    fn is_terminal(&self, snapshot: &Self::Snapshot) -> bool {
        snapshot.value.status.is_terminal()
    }
}
