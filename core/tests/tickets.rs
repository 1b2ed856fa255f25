mod support;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde_json::json;
use tokio::task::LocalSet;
use tokio::time::sleep;

use support::{agent, comment, customer, ticket, Harness, Reply};
use support_core::store::TicketStore;
use support_core::ticket::{
    check_identity, CommentOutcome, Identity, TicketTracker, TicketWizard, WizardStep,
};
use support_core::transport::{Method, RequestBody};
use support_core::validation::Field;
use support_core::{Priority, SupportTicket, TicketStatus};

fn filled_wizard(h: &Harness) -> TicketWizard {
    let mut wizard = TicketWizard::new(h.config.max_attachment_bytes);
    let draft = wizard.draft_mut();
    draft.issue_category = "technical".into();
    draft.issue_title = "Cannot log in".into();
    draft.priority = "high".into();
    draft.description = "The login button does nothing".into();
    wizard
}

#[tokio::test]
async fn wizard_submits_and_lands_on_confirmation() {
    let h = Harness::new();
    h.transport.on(
        Method::Post,
        "/api/forms/support",
        Reply::data(ticket("TKT-1001", "open", vec![])),
    );
    let store = TicketStore::new(Rc::clone(&h.api));
    let mut wizard = filled_wizard(&h);
    assert!(wizard.next());
    assert!(wizard.next());
    assert_eq!(wizard.step(), WizardStep::Review);

    let submitted = wizard.submit(&store).await.unwrap().unwrap();

    assert_eq!(submitted.ticket_number, "TKT-1001");
    assert_eq!(submitted.priority, Priority::High);
    assert_eq!(wizard.step(), WizardStep::Submitted);
    assert_eq!(wizard.ticket_number(), Some("TKT-1001"));

    let sent = h.transport.last(Method::Post, "/api/forms/support").unwrap();
    let RequestBody::Multipart(form) = sent.body else {
        panic!("ticket should be multipart");
    };
    assert_eq!(form.text_value("issueTitle"), Some("Cannot log in"));
    assert_eq!(form.text_value("priority"), Some("high"));
}

#[tokio::test]
async fn submit_with_missing_description_goes_back_without_network() {
    let h = Harness::new();
    let store = TicketStore::new(Rc::clone(&h.api));
    let mut wizard = filled_wizard(&h);
    wizard.next();
    wizard.next();
    wizard.draft_mut().description.clear();

    let result = wizard.submit(&store).await.unwrap();

    assert!(result.is_none());
    assert_eq!(wizard.step(), WizardStep::Description);
    assert!(wizard.errors().contains(Field::Description));
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn receipt_only_response_fetches_the_ticket() {
    let h = Harness::new();
    h.transport
        .on(
            Method::Post,
            "/api/forms/support",
            Reply::data(json!({ "ticketNumber": "TKT-1002" })),
        )
        .on(
            Method::Get,
            "/api/forms/support/ticket/TKT-1002",
            Reply::data(ticket("TKT-1002", "open", vec![])),
        );
    let store = TicketStore::new(Rc::clone(&h.api));
    let mut wizard = filled_wizard(&h);
    wizard.next();
    wizard.next();

    let submitted = wizard.submit(&store).await.unwrap().unwrap();

    assert_eq!(submitted.ticket_number, "TKT-1002");
    assert_eq!(submitted.status, TicketStatus::Open);
}

#[tokio::test]
async fn failed_submit_keeps_draft_for_retry() {
    let h = Harness::new();
    h.transport.on(
        Method::Post,
        "/api/forms/support",
        Reply::status(400, "Issue category is not recognised"),
    );
    let store = TicketStore::new(Rc::clone(&h.api));
    let mut wizard = filled_wizard(&h);
    wizard.next();
    wizard.next();

    let err = wizard.submit(&store).await.unwrap_err();

    assert_eq!(err.user_message(), "Issue category is not recognised");
    assert!(!wizard.is_submitting());
    assert_eq!(wizard.step(), WizardStep::Review);
    assert_eq!(wizard.draft().issue_title, "Cannot log in");
}

#[tokio::test]
async fn unknown_ticket_is_none() {
    let h = Harness::new();
    h.transport.on(
        Method::Get,
        "/api/forms/support/ticket/TKT-404",
        Reply::status(404, "Ticket not found"),
    );
    let store = TicketStore::new(Rc::clone(&h.api));

    assert!(store.fetch_ticket("TKT-404").await.unwrap().is_none());
    assert!(h.navigator.paths().is_empty());
}

#[tokio::test]
async fn comment_returns_refetched_ticket() {
    let h = Harness::new();
    let path = "/api/forms/support/ticket/TKT-1001";
    h.transport
        .on(
            Method::Post,
            "/api/forms/support/tickets/TKT-1001/comments",
            Reply::data(json!({ "ok": true })),
        )
        .on(
            Method::Get,
            path,
            Reply::data(ticket(
                "TKT-1001",
                "in_progress",
                vec![comment("Any update?", customer())],
            )),
        );
    let store = TicketStore::new(Rc::clone(&h.api));

    let updated = store.add_ticket_comment("TKT-1001", "Any update?").await.unwrap();

    assert_eq!(updated.status, TicketStatus::InProgress);
    assert_eq!(updated.comments.len(), 1);
    assert_eq!(h.transport.count(Method::Get, path), 1);
}

#[tokio::test(start_paused = true)]
async fn tracker_polls_until_ticket_closes() {
    let h = Harness::new();
    let path = "/api/forms/support/ticket/TKT-1001";
    h.transport
        .on(Method::Get, path, Reply::data(ticket("TKT-1001", "open", vec![])))
        .on(
            Method::Get,
            path,
            Reply::data(ticket("TKT-1001", "resolved", vec![comment("Fixed", agent())])),
        )
        .on(Method::Get, path, Reply::data(ticket("TKT-1001", "closed", vec![])));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let tracker = TicketTracker::new(
        TicketStore::new(Rc::clone(&h.api)),
        "TKT-1001",
        h.poller(),
        move |t: &SupportTicket| sink.borrow_mut().push(t.status),
    );

    LocalSet::new()
        .run_until(async {
            let loaded = tracker.load().await.unwrap().unwrap();
            assert_eq!(loaded.status, TicketStatus::Open);
            assert!(tracker.is_polling());

            sleep(Duration::from_secs(30)).await;
        })
        .await;

    assert!(!tracker.is_polling());
    assert_eq!(h.transport.count(Method::Get, path), 3);
    assert_eq!(
        *seen.borrow(),
        vec![TicketStatus::Open, TicketStatus::Resolved, TicketStatus::Closed]
    );
}

#[tokio::test(start_paused = true)]
async fn tracker_refuses_comments_on_closed_ticket() {
    let h = Harness::new();
    h.transport.on(
        Method::Get,
        "/api/forms/support/ticket/TKT-7",
        Reply::data(ticket("TKT-7", "closed", vec![])),
    );
    let tracker = TicketTracker::new(
        TicketStore::new(Rc::clone(&h.api)),
        "TKT-7",
        h.poller(),
        |_: &SupportTicket| {},
    );

    LocalSet::new()
        .run_until(async {
            tracker.load().await.unwrap();
            assert!(!tracker.is_polling());
            assert_eq!(tracker.add_comment("hello").await.unwrap(), CommentOutcome::Closed);
            assert_eq!(tracker.add_comment("  ").await.unwrap(), CommentOutcome::Empty);
        })
        .await;

    assert_eq!(
        h.transport
            .count(Method::Post, "/api/forms/support/tickets/TKT-7/comments"),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn tracker_reports_missing_ticket() {
    let h = Harness::new();
    h.transport.on(
        Method::Get,
        "/api/forms/support/ticket/TKT-9",
        Reply::status(404, "Ticket not found"),
    );
    let tracker = TicketTracker::new(
        TicketStore::new(Rc::clone(&h.api)),
        "TKT-9",
        h.poller(),
        |_: &SupportTicket| {},
    );

    assert!(tracker.load().await.unwrap().is_none());
    assert!(!tracker.is_polling());
    assert_eq!(
        tracker.add_comment("hello").await.unwrap(),
        CommentOutcome::NotLoaded
    );
}

#[tokio::test]
async fn identity_gate() {
    let h = Harness::new();
    h.transport
        .on(Method::Get, "/api/auth/me", Reply::data(customer()))
        .on(Method::Get, "/api/auth/me", Reply::status(401, "Not authenticated"));

    match check_identity(&*h.api).await {
        Identity::Authenticated(user) => assert_eq!(user.name, "Ada"),
        Identity::Anonymous => panic!("expected a logged-in user"),
    }
    assert_eq!(check_identity(&*h.api).await, Identity::Anonymous);
    assert!(h.navigator.paths().is_empty());
}
