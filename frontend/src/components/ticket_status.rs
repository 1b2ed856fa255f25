use std::rc::Rc;

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use leptos::task::spawn_local;

use support_core::ticket::{CommentOutcome, TicketTracker};
use support_core::{Comment, SupportTicket};

use crate::api::{api_base, FetchTransport};
use crate::state::SupportState;

type Tracker = Rc<TicketTracker<FetchTransport>>;

#[derive(Clone, PartialEq)]
enum Load {
    Pending,
    Found,
    Missing,
    Failed(String),
}

/// Status page of one submitted ticket. Keeps refreshing until the ticket
/// is closed.
#[component]
pub fn TicketStatusView(ticket_number: String) -> impl IntoView {
    let state = expect_context::<SupportState>();
    let ticket = RwSignal::new(None::<SupportTicket>);
    let load = RwSignal::new(Load::Pending);
    let comment = RwSignal::new(String::new());
    let posting = RwSignal::new(false);
    let comment_error = RwSignal::new(None::<String>);

    let tracker: StoredValue<Tracker, LocalStorage> = StoredValue::new_local(Rc::new(TicketTracker::new(
        state.ticket_store(),
        ticket_number.clone(),
        state.poller(),
        move |latest: &SupportTicket| ticket.set(Some(latest.clone())),
    )));

    let initial = tracker.get_value();
    spawn_local(async move {
        match initial.load().await {
            Ok(Some(_)) => load.set(Load::Found),
            Ok(None) => load.set(Load::Missing),
            Err(err) => load.set(Load::Failed(err.user_message())),
        }
    });

    on_cleanup(move || {
        tracker.try_with_value(|tracker| tracker.detach());
    });

    let post_comment = move |_| {
        let tracker = tracker.get_value();
        let text = comment.get_untracked();
        spawn_local(async move {
            posting.set(true);
            let result = tracker.add_comment(&text).await;
            posting.set(false);
            match result {
                Ok(CommentOutcome::Posted) => {
                    comment.set(String::new());
                    comment_error.set(None);
                }
                Ok(CommentOutcome::Closed) => {
                    comment_error.set(Some("This ticket is closed.".to_string()));
                }
                Ok(other) => log::debug!("Comment not posted: {other:?}"),
                Err(err) if err.is_handled() => {}
                Err(err) => comment_error.set(Some(err.user_message())),
            }
        });
    };

    let is_closed = move || ticket.with(|t| t.as_ref().is_some_and(|t| t.status.is_terminal()));

    view! {
        <section class="ticket-status">
            <h2>"Ticket " {ticket_number}</h2>
            {move || match load.get() {
                Load::Pending => view! { <div class="loading">"Loading ticket…"</div> }.into_any(),
                Load::Missing => view! { <div class="empty-state">"We could not find that ticket."</div> }.into_any(),
                Load::Failed(message) => view! { <div class="error-banner">{message}</div> }.into_any(),
                Load::Found => ticket.get().map(ticket_details).into_any(),
            }}
            <Show when=move || load.get() == Load::Found && !is_closed()>
                <div class="comment-form">
                    {move || comment_error.get().map(|err| view! { <div class="error-banner">{err}</div> })}
                    <textarea
                        rows="3"
                        placeholder="Add a comment"
                        prop:value=comment
                        on:input=move |ev| comment.set(event_target_value(&ev))
                    />
                    <button on:click=post_comment disabled=move || posting.get()>
                        {move || if posting.get() { "Posting…" } else { "Add comment" }}
                    </button>
                </div>
            </Show>
        </section>
    }
}

fn ticket_details(ticket: SupportTicket) -> impl IntoView {
    let attachment = ticket.attachment.map(|attachment| {
        let href = format!("{}{}", api_base(), attachment.path);
        view! { <a class="attachment" href=href target="_blank" rel="noopener">{attachment.filename}</a> }
    });
    let comments = if ticket.comments.is_empty() {
        view! { <p class="empty-state">"No comments yet."</p> }.into_any()
    } else {
        view! { <ul class="comments">{ticket.comments.into_iter().map(comment_item).collect_view()}</ul> }
            .into_any()
    };

    view! {
        <div class="ticket-details">
            <div class="ticket-meta">
                <span class=format!("status status-{}", ticket.status.as_str())>{ticket.status.label()}</span>
                <span class="priority">{ticket.priority.to_string()}</span>
                <span class="category">{ticket.issue_category}</span>
            </div>
            <h3>{ticket.issue_title}</h3>
            <p class="multiline">{ticket.description}</p>
            {ticket.steps_to_reproduce.map(|steps| view! {
                <h4>"Steps to reproduce"</h4>
                <p class="multiline">{steps}</p>
            })}
            {attachment}
            <p class="updated">"Last updated " {format_time(ticket.updated_at)}</p>
            {comments}
        </div>
    }
}

fn comment_item(comment: Comment) -> impl IntoView {
    view! {
        <li class="comment">
            <div class="message-meta">
                <span class="sender">{comment.user.name.clone()}</span>
                {comment.user.is_admin().then(|| view! { <span class="badge">"Support"</span> })}
                <span class="time">{format_time(comment.created_at)}</span>
            </div>
            <div class="content">{comment.content}</div>
        </li>
    }
}

fn format_time(at: chrono::DateTime<chrono::Utc>) -> String {
    at.with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}
