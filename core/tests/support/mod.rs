#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures_util::future::LocalBoxFuture;
use serde_json::{json, Value};

use support_core::polling::{LocalSpawner, PollSchedule, Poller, Sleeper};
use support_core::redirect::{Clock, Navigator, Redirect};
use support_core::transport::{ApiRequest, Method, RawResponse, Transport, TransportError};
use support_core::{ApiClient, SupportConfig};

pub const BASE_URL: &str = "http://api.test";

#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, Value),
    Raw(u16, String),
    NoResponse,
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Reply::Json(200, body)
    }

    pub fn data(data: Value) -> Self {
        Reply::Json(200, json!({ "status": "success", "data": data }))
    }

    pub fn status(status: u16, message: &str) -> Self {
        Reply::Json(status, json!({ "status": "error", "message": message }))
    }

    pub fn after(self, delay: Duration) -> Self {
        Reply::Delayed(delay, Box::new(self))
    }
}

/// Scripted transport. Each (method, path) has a queue of replies; the last
/// one keeps being served once the queue runs down.
#[derive(Default)]
pub struct FakeTransport {
    replies: RefCell<HashMap<(Method, String), VecDeque<Reply>>>,
    log: RefCell<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn on(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.replies
            .borrow_mut()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Drops whatever was queued for the route.
    pub fn set(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.replies
            .borrow_mut()
            .insert((method, path.to_string()), VecDeque::from([reply]));
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.borrow().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        let url = format!("{BASE_URL}{path}");
        self.log
            .borrow()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    pub fn last(&self, method: Method, path: &str) -> Option<ApiRequest> {
        let url = format!("{BASE_URL}{path}");
        self.log
            .borrow()
            .iter()
            .rev()
            .find(|r| r.method == method && r.url == url)
            .cloned()
    }

    fn next_reply(&self, method: Method, path: &str) -> Option<Reply> {
        let mut replies = self.replies.borrow_mut();
        let queue = replies.get_mut(&(method, path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait(?Send)]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .to_string();
        let method = request.method;
        let url = request.url.clone();
        self.log.borrow_mut().push(request);

        let mut reply = self
            .next_reply(method, &path)
            .unwrap_or_else(|| Reply::status(404, "no route"));
        loop {
            match reply {
                Reply::Json(status, body) => return Ok(RawResponse::new(status, body.to_string())),
                Reply::Raw(status, body) => return Ok(RawResponse::new(status, body)),
                Reply::NoResponse => {
                    return Err(TransportError {
                        url,
                        reason: "connection refused".into(),
                    })
                }
                Reply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    visits: RefCell<Vec<Redirect>>,
}

impl RecordingNavigator {
    pub fn paths(&self) -> Vec<String> {
        self.visits.borrow().iter().map(|r| r.path.clone()).collect()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, redirect: &Redirect) {
        self.visits.borrow_mut().push(redirect.clone());
    }
}

pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            now: Cell::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()),
        })
    }

    pub fn advance(&self, by: Duration) {
        self.now
            .set(self.now.get() + chrono::Duration::from_std(by).unwrap());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

pub struct TokioSleeper;

#[async_trait(?Send)]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Needs to run inside a `LocalSet`.
pub struct LocalSetSpawner;

impl LocalSpawner for LocalSetSpawner {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }
}

pub struct Harness {
    pub transport: Rc<FakeTransport>,
    pub navigator: Rc<RecordingNavigator>,
    pub clock: Rc<ManualClock>,
    pub config: SupportConfig,
    pub api: Rc<ApiClient<Rc<FakeTransport>>>,
}

impl Harness {
    pub fn new() -> Self {
        let transport = FakeTransport::new();
        let navigator = Rc::new(RecordingNavigator::default());
        let clock = ManualClock::new();
        let config = SupportConfig::with_base_url(BASE_URL);
        let api = Rc::new(ApiClient::new(
            Rc::clone(&transport),
            &config,
            navigator.clone(),
            clock.clone(),
        ));
        Self {
            transport,
            navigator,
            clock,
            config,
            api,
        }
    }

    pub fn poller(&self) -> Poller {
        Poller::new(
            PollSchedule::from_config(&self.config),
            Rc::new(TokioSleeper),
            Rc::new(LocalSetSpawner),
        )
    }
}

pub fn customer() -> Value {
    json!({ "id": "cust-1", "name": "Ada", "role": "customer" })
}

pub fn agent() -> Value {
    json!({ "id": "agent-7", "name": "Grace", "role": "admin" })
}

pub fn message(id: &str, sender: Value, content: &str, minute: u32) -> Value {
    json!({
        "id": id,
        "sender": sender,
        "content": content,
        "timestamp": format!("2024-05-01T09:{minute:02}:00Z"),
    })
}

pub fn session(id: &str, status: &str, messages: Vec<Value>) -> Value {
    json!({ "id": id, "status": status, "messages": messages })
}

pub fn ticket(number: &str, status: &str, comments: Vec<Value>) -> Value {
    json!({
        "ticketNumber": number,
        "issueCategory": "technical",
        "issueTitle": "Cannot log in",
        "description": "The login button does nothing",
        "priority": "high",
        "status": status,
        "comments": comments,
        "createdAt": "2024-05-01T09:00:00Z",
        "updatedAt": "2024-05-01T09:00:00Z",
    })
}

pub fn comment(content: &str, user: Value) -> Value {
    json!({ "content": content, "createdAt": "2024-05-01T09:30:00Z", "user": user })
}
