mod support;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde_json::json;
use tokio::task::LocalSet;
use tokio::time::sleep;

use support::{agent, customer, message, session, FakeTransport, Harness, Reply};
use support_core::chat::{ChatRoom, SendOutcome, SendSkip, UpdateOrigin};
use support_core::store::ChatStore;
use support_core::transport::{FilePart, FormPart, Method, RequestBody};
use support_core::validation::ValidationError;
use support_core::{ChatError, ChatSession, Participant, SessionStatus};

type Updates = Rc<RefCell<Vec<(SessionStatus, usize, UpdateOrigin)>>>;

fn room(h: &Harness) -> (ChatRoom<Rc<FakeTransport>>, Updates) {
    let updates: Updates = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&updates);
    let user: Participant = serde_json::from_value(customer()).unwrap();
    let room = ChatRoom::new(
        ChatStore::new(Rc::clone(&h.api)),
        h.poller(),
        user,
        h.config.max_attachment_bytes,
        move |session: &ChatSession, origin| {
            sink.borrow_mut()
                .push((session.status, session.messages.len(), origin));
        },
    );
    (room, updates)
}

fn file(name: &str, size: usize) -> FilePart {
    FilePart::new(name, "image/png", vec![0u8; size])
}

#[tokio::test(start_paused = true)]
async fn open_creates_session_and_follows_it() {
    let h = Harness::new();
    h.transport
        .on(Method::Post, "/api/chat/session", Reply::data(session("s1", "initialized", vec![])))
        .on(
            Method::Get,
            "/api/chat/session/s1",
            Reply::data(session("s1", "waiting", vec![])),
        );
    let (room, updates) = room(&h);

    LocalSet::new()
        .run_until(async {
            let opened = room.open(None).await.unwrap();
            assert_eq!(opened.status, SessionStatus::Initialized);
            assert!(room.is_polling());

            sleep(Duration::from_millis(3_100)).await;
            room.detach();
        })
        .await;

    assert_eq!(
        *updates.borrow(),
        vec![
            (SessionStatus::Initialized, 0, UpdateOrigin::Local),
            (SessionStatus::Waiting, 0, UpdateOrigin::Poll),
        ]
    );
    let body = h.transport.last(Method::Post, "/api/chat/session").unwrap().body;
    assert_eq!(body, RequestBody::Json(json!({})));
}

#[tokio::test(start_paused = true)]
async fn resume_sends_session_id() {
    let h = Harness::new();
    h.transport.on(
        Method::Post,
        "/api/chat/session",
        Reply::data(session("s9", "active", vec![])),
    );
    let (room, _) = room(&h);

    LocalSet::new()
        .run_until(async {
            room.open(Some("s9")).await.unwrap();
            room.detach();
        })
        .await;

    let body = h.transport.last(Method::Post, "/api/chat/session").unwrap().body;
    assert_eq!(body, RequestBody::Json(json!({ "sessionId": "s9" })));
}

#[tokio::test(start_paused = true)]
async fn empty_send_is_a_no_op() {
    let h = Harness::new();
    let existing = vec![message("m1", agent(), "Hello", 1)];
    h.transport.on(
        Method::Post,
        "/api/chat/session",
        Reply::data(session("s1", "active", existing)),
    );
    let (room, updates) = room(&h);

    LocalSet::new()
        .run_until(async {
            room.open(None).await.unwrap();
            room.detach();
            let before = h.transport.requests().len();

            let outcome = room.send("   \n ").await.unwrap();

            assert_eq!(outcome, SendOutcome::Skipped(SendSkip::Empty));
            assert_eq!(h.transport.requests().len(), before);
        })
        .await;

    assert_eq!(updates.borrow().len(), 1);
    assert_eq!(room.session().unwrap().messages.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn closed_session_neither_sends_nor_polls() {
    let h = Harness::new();
    h.transport.on(
        Method::Post,
        "/api/chat/session",
        Reply::data(session("s1", "closed", vec![])),
    );
    let (room, _) = room(&h);

    LocalSet::new()
        .run_until(async {
            room.open(Some("s1")).await.unwrap();
            assert!(!room.is_polling());

            let outcome = room.send("anyone there?").await.unwrap();
            assert_eq!(outcome, SendOutcome::Skipped(SendSkip::Closed));

            sleep(Duration::from_secs(20)).await;
        })
        .await;

    assert_eq!(h.transport.count(Method::Post, "/api/chat/message/s1"), 0);
    assert_eq!(h.transport.count(Method::Get, "/api/chat/session/s1"), 0);
}

#[tokio::test(start_paused = true)]
async fn send_replaces_state_with_server_copy() {
    let h = Harness::new();
    let mine = message("m2", customer(), "My printer is on fire", 2);
    let server = session("s1", "waiting", vec![message("m1", agent(), "Hi", 1), mine]);
    h.transport
        .on(Method::Post, "/api/chat/session", Reply::data(session("s1", "initialized", vec![])))
        .on(Method::Post, "/api/chat/message/s1", Reply::data(json!({ "id": "m2" })))
        .on(Method::Get, "/api/chat/session/s1", Reply::data(server.clone()));
    let (room, _) = room(&h);

    LocalSet::new()
        .run_until(async {
            room.open(None).await.unwrap();
            let outcome = room.send("  My printer is on fire ").await.unwrap();
            assert_eq!(outcome, SendOutcome::Sent);
            room.detach();
        })
        .await;

    let expected: ChatSession = serde_json::from_value(server).unwrap();
    assert_eq!(room.session().unwrap(), expected);
    assert!(!room.is_sending());

    let sent = h.transport.last(Method::Post, "/api/chat/message/s1").unwrap();
    let RequestBody::Multipart(form) = sent.body else {
        panic!("message should be multipart");
    };
    assert_eq!(form.text_value("content"), Some("My printer is on fire"));
}

#[tokio::test(start_paused = true)]
async fn send_restarts_stopped_polling() {
    let h = Harness::new();
    h.transport
        .on(Method::Post, "/api/chat/session", Reply::data(session("s1", "waiting", vec![])))
        .on(Method::Post, "/api/chat/message/s1", Reply::ok(json!({})))
        .on(
            Method::Get,
            "/api/chat/session/s1",
            Reply::data(session("s1", "waiting", vec![message("m1", customer(), "hi", 1)])),
        );
    let (room, _) = room(&h);

    LocalSet::new()
        .run_until(async {
            room.open(None).await.unwrap();
            room.detach();
            assert!(!room.is_polling());

            room.send("hi").await.unwrap();
            assert!(room.is_polling());

            let reloads = h.transport.count(Method::Get, "/api/chat/session/s1");
            sleep(Duration::from_millis(3_100)).await;
            assert_eq!(h.transport.count(Method::Get, "/api/chat/session/s1"), reloads + 1);
            room.detach();
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn late_poll_result_does_not_undo_a_send() {
    let h = Harness::new();
    let opened = session("s1", "waiting", vec![]);
    // What the server said before the send; differs from both other snapshots.
    let stale = session("s1", "initialized", vec![]);
    let fresh = session("s1", "waiting", vec![message("m1", customer(), "hi", 1)]);
    h.transport
        .on(Method::Post, "/api/chat/session", Reply::data(opened))
        .on(Method::Post, "/api/chat/message/s1", Reply::ok(json!({})))
        .on(
            Method::Get,
            "/api/chat/session/s1",
            Reply::data(stale).after(Duration::from_secs(2)),
        )
        .on(Method::Get, "/api/chat/session/s1", Reply::data(fresh));
    let (room, updates) = room(&h);

    LocalSet::new()
        .run_until(async {
            room.open(None).await.unwrap();
            // poll fetch is in flight from 3s to 5s
            sleep(Duration::from_millis(3_500)).await;
            room.send("hi").await.unwrap();
            sleep(Duration::from_secs(2)).await;
            room.detach();
        })
        .await;

    let shown = room.session().unwrap();
    assert_eq!(shown.status, SessionStatus::Waiting);
    assert_eq!(shown.messages.len(), 1);
    let updates = updates.borrow();
    assert!(updates.iter().all(|(_, _, origin)| *origin == UpdateOrigin::Local));
    assert!(!updates
        .iter()
        .any(|(status, _, _)| *status == SessionStatus::Initialized));
    assert_eq!(updates.last(), Some(&(SessionStatus::Waiting, 1, UpdateOrigin::Local)));
}

#[tokio::test(start_paused = true)]
async fn oversized_attachment_keeps_previous_selection() {
    let h = Harness::new();
    let (room, _) = room(&h);

    room.select_attachment(file("small.png", 1024)).unwrap();
    let err = room
        .select_attachment(file("huge.png", 6 * 1024 * 1024))
        .unwrap_err();

    assert!(matches!(
        err,
        ChatError::Validation(ValidationError::FileTooLarge { .. })
    ));
    assert_eq!(room.attachment().unwrap().filename, "small.png");
}

#[tokio::test(start_paused = true)]
async fn attachment_is_sent_and_cleared() {
    let h = Harness::new();
    h.transport
        .on(Method::Post, "/api/chat/session", Reply::data(session("s1", "active", vec![])))
        .on(Method::Post, "/api/chat/message/s1", Reply::ok(json!({})))
        .on(Method::Get, "/api/chat/session/s1", Reply::data(session("s1", "active", vec![])));
    let (room, _) = room(&h);

    LocalSet::new()
        .run_until(async {
            room.open(None).await.unwrap();
            room.select_attachment(file("log.png", 10)).unwrap();
            let outcome = room.send("").await.unwrap();
            assert_eq!(outcome, SendOutcome::Sent);
            room.detach();
        })
        .await;

    assert!(room.attachment().is_none());
    let sent = h.transport.last(Method::Post, "/api/chat/message/s1").unwrap();
    let RequestBody::Multipart(form) = sent.body else {
        panic!("message should be multipart");
    };
    assert!(form.parts().iter().any(|part| matches!(
        part,
        FormPart::File { name, file } if name == "attachment" && file.filename == "log.png"
    )));
}

#[tokio::test(start_paused = true)]
async fn rejected_send_keeps_attachment_for_retry() {
    let h = Harness::new();
    h.transport
        .on(Method::Post, "/api/chat/session", Reply::data(session("s1", "active", vec![])))
        .on(
            Method::Post,
            "/api/chat/message/s1",
            Reply::status(400, "Message is too long"),
        );
    let (room, _) = room(&h);

    LocalSet::new()
        .run_until(async {
            room.open(None).await.unwrap();
            room.select_attachment(file("log.png", 10)).unwrap();
            let err = room.send("text").await.unwrap_err();
            assert!(matches!(err, ChatError::Api(ref e) if e.status() == Some(400)));
            assert!(!err.is_handled());
            room.detach();
        })
        .await;

    assert!(!room.is_sending());
    assert!(room.attachment().is_some());
    assert!(h.navigator.paths().is_empty());
}

#[tokio::test(start_paused = true)]
async fn close_stops_polling_and_reports_closed() {
    let h = Harness::new();
    h.transport
        .on(Method::Post, "/api/chat/session", Reply::data(session("s1", "active", vec![])))
        .on(Method::Post, "/api/chat/session/s1/close", Reply::ok(json!({})))
        .on(Method::Get, "/api/chat/session/s1", Reply::data(session("s1", "closed", vec![])));
    let (room, updates) = room(&h);

    LocalSet::new()
        .run_until(async {
            room.open(None).await.unwrap();
            room.close().await.unwrap();
            assert!(!room.is_polling());
            sleep(Duration::from_secs(20)).await;
        })
        .await;

    assert!(room.session().unwrap().is_closed());
    assert_eq!(h.transport.count(Method::Get, "/api/chat/session/s1"), 1);
    assert_eq!(updates.borrow().last().unwrap().0, SessionStatus::Closed);
}
