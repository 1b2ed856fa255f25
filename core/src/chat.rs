use std::cell::{Cell, RefCell};
use std::fmt::Display;
use std::rc::Rc;

use async_trait::async_trait;
use chrono::TimeZone;
use tracing::{debug, info};

use crate::error::{ApiError, ChatError};
use crate::models::{Attachment, ChatSession, Message, Participant};
use crate::polling::{PollSource, Poller};
use crate::snapshot::{Applied, FetchSeq, Fetched, SnapshotCell};
use crate::store::ChatStore;
use crate::transport::{FilePart, Transport};
use crate::validation::check_attachment_size;

/// Why a snapshot replacement happened. The UI only protects the caret for
/// updates it did not cause itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrigin {
    Poll,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendSkip {
    Empty,
    InFlight,
    Closed,
    NotOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Skipped(SendSkip),
}

type Observer = Rc<dyn Fn(&ChatSession, UpdateOrigin)>;

/// One customer's live chat with support.
///
/// Session state lives in a [`SnapshotCell`] that only two paths write to:
/// the poll loop and [`send`](ChatRoom::send)/[`close`](ChatRoom::close).
/// The observer is told about every replacement.
pub struct ChatRoom<T> {
    store: Rc<ChatStore<T>>,
    snapshot: Rc<SnapshotCell<ChatSession>>,
    poller: Poller,
    current_user: Participant,
    max_attachment_bytes: usize,
    sending: Cell<bool>,
    attachment: RefCell<Option<FilePart>>,
    observer: Observer,
}

impl<T: Transport + 'static> ChatRoom<T> {
    pub fn new(
        store: ChatStore<T>,
        poller: Poller,
        current_user: Participant,
        max_attachment_bytes: usize,
        observer: impl Fn(&ChatSession, UpdateOrigin) + 'static,
    ) -> Self {
        Self {
            store: Rc::new(store),
            snapshot: Rc::new(SnapshotCell::new()),
            poller,
            current_user,
            max_attachment_bytes,
            sending: Cell::new(false),
            attachment: RefCell::new(None),
            observer: Rc::new(observer),
        }
    }

    pub fn session(&self) -> Option<ChatSession> {
        self.snapshot.get()
    }

    pub fn current_user(&self) -> &Participant {
        &self.current_user
    }

    pub fn is_sending(&self) -> bool {
        self.sending.get()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_active()
    }

    pub fn attachment(&self) -> Option<FilePart> {
        self.attachment.borrow().clone()
    }

    /// Creates a session (or resumes `resume_id`) and starts polling it.
    pub async fn open(&self, resume_id: Option<&str>) -> Result<ChatSession, ApiError> {
        let seq = self.snapshot.begin();
        let session = self.store.create_session(resume_id).await?;
        self.apply(seq, session.clone());
        self.ensure_polling();
        Ok(session)
    }

    /// Keeps the previous selection when `file` is over the size limit.
    pub fn select_attachment(&self, file: FilePart) -> Result<(), ChatError> {
        check_attachment_size(file.size(), self.max_attachment_bytes)?;
        debug!(filename = %file.filename, size = file.size(), "attachment selected");
        *self.attachment.borrow_mut() = Some(file);
        Ok(())
    }

    pub fn clear_attachment(&self) {
        self.attachment.borrow_mut().take();
    }

    pub async fn send(&self, text: &str) -> Result<SendOutcome, ChatError> {
        let content = text.trim();
        if content.is_empty() && self.attachment.borrow().is_none() {
            return Ok(SendOutcome::Skipped(SendSkip::Empty));
        }
        if self.sending.get() {
            return Ok(SendOutcome::Skipped(SendSkip::InFlight));
        }
        let Some(session) = self.snapshot.get() else {
            return Ok(SendOutcome::Skipped(SendSkip::NotOpen));
        };
        if session.is_closed() {
            return Ok(SendOutcome::Skipped(SendSkip::Closed));
        }

        self.sending.set(true);
        let attachment = self.attachment.borrow().clone();
        let seq = self.snapshot.begin();
        let result = self
            .store
            .send_message(&session.id, content, attachment)
            .await;
        self.sending.set(false);

        let updated = result?;
        self.attachment.borrow_mut().take();
        self.apply(seq, updated);
        self.ensure_polling();
        Ok(SendOutcome::Sent)
    }

    /// Stops polling and closes the session on the server.
    pub async fn close(&self) -> Result<(), ApiError> {
        self.poller.stop();
        let Some(session) = self.snapshot.get() else {
            return Ok(());
        };
        if session.is_closed() {
            return Ok(());
        }
        let seq = self.snapshot.begin();
        let closed = self.store.close_session(&session.id).await?;
        self.apply(seq, closed);
        Ok(())
    }

    /// Stops polling without touching the server, e.g. on unmount.
    pub fn detach(&self) {
        self.poller.stop();
    }

    /// Starts polling unless it is already running or the session is closed.
    pub fn ensure_polling(&self) -> bool {
        let Some(session) = self.snapshot.get() else {
            return false;
        };
        if session.is_closed() || self.poller.is_active() {
            return false;
        }
        let feed = SessionFeed {
            store: Rc::clone(&self.store),
            session_id: session.id.clone(),
            snapshot: Rc::clone(&self.snapshot),
        };
        let initial = Fetched {
            seq: FetchSeq::INITIAL,
            value: session,
        };
        let snapshot = Rc::clone(&self.snapshot);
        let observer = Rc::clone(&self.observer);
        self.poller.launch(feed, &initial, move |fetched: Fetched<ChatSession>| {
            if snapshot.apply(fetched.seq, fetched.value) == Applied::Replaced {
                if let Some(current) = snapshot.get() {
                    observer(&current, UpdateOrigin::Poll);
                }
            }
        })
    }

    fn apply(&self, seq: FetchSeq, session: ChatSession) {
        if self.snapshot.apply(seq, session) != Applied::Replaced {
            return;
        }
        if let Some(current) = self.snapshot.get() {
            if current.is_closed() {
                info!(session_id = %current.id, "chat session is closed");
            }
            (self.observer)(&current, UpdateOrigin::Local);
        }
    }
}

impl<T> Drop for ChatRoom<T> {
    fn drop(&mut self) {
        self.poller.stop();
    }
}

struct SessionFeed<T> {
    store: Rc<ChatStore<T>>,
    session_id: String,
    snapshot: Rc<SnapshotCell<ChatSession>>,
}

#[async_trait(?Send)]
impl<T: Transport> PollSource for SessionFeed<T> {
    type Snapshot = Fetched<ChatSession>;

    async fn fetch(&self) -> Result<Self::Snapshot, ApiError> {
        let seq = self.snapshot.begin();
        let value = self.store.load_session(&self.session_id).await?;
        Ok(Fetched { seq, value })
    }

    fn is_terminal(&self, snapshot: &Self::Snapshot) -> bool {
        snapshot.value.is_closed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Sent by the current user; rendered on the right.
    Own,
    Other,
}

/// What the chat list needs to draw one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub key: String,
    pub alignment: Alignment,
    pub sender_name: String,
    pub show_admin_badge: bool,
    pub content: String,
    pub attachment: Option<Attachment>,
    pub time_label: String,
}

pub fn message_views<Tz>(messages: &[Message], current_user_id: &str, tz: &Tz) -> Vec<MessageView>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    messages
        .iter()
        .enumerate()
        .map(|(index, message)| MessageView {
            key: message
                .id
                .clone()
                .unwrap_or_else(|| format!("pending-{index}-{}", message.timestamp.timestamp_millis())),
            alignment: if message.sender.id == current_user_id {
                Alignment::Own
            } else {
                Alignment::Other
            },
            sender_name: message.sender.name.clone(),
            show_admin_badge: message.sender.is_admin(),
            content: message.content.clone(),
            attachment: message.attachment.clone(),
            time_label: message
                .timestamp
                .with_timezone(tz)
                .format("%H:%M")
                .to_string(),
        })
        .collect()
}
