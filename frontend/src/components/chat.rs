use std::rc::Rc;

use leptos::ev;
use leptos::html::Textarea;
use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use leptos::task::spawn_local;
use web_sys::HtmlInputElement;

use support_core::chat::{message_views, Alignment, ChatRoom, MessageView, SendOutcome, UpdateOrigin};
use support_core::focus::FocusKeeper;
use support_core::{ChatError, ChatSession, SessionStatus};

use crate::api::{api_base, read_file, FetchTransport};
use crate::focus::TextareaSurface;
use crate::state::{query_param, SupportState};

type Room = Rc<ChatRoom<FetchTransport>>;

/// Live chat with support: message history, composer and attachment picker.
///
/// `?session=<id>` resumes an earlier session.
#[component]
pub fn ChatWidget() -> impl IntoView {
    let state = expect_context::<SupportState>();
    let config = state.config();

    let session = RwSignal::new(None::<ChatSession>);
    let error = RwSignal::new(None::<String>);
    let input = RwSignal::new(String::new());
    let sending = RwSignal::new(false);
    let attachment_name = RwSignal::new(None::<String>);
    let textarea = NodeRef::<Textarea>::new();
    let room: StoredValue<Option<Room>, LocalStorage> = StoredValue::new_local(None);
    let keeper = Rc::new(FocusKeeper::new());

    let observer = move |snapshot: &ChatSession, origin: UpdateOrigin| {
        let from_poll = origin == UpdateOrigin::Poll;
        if from_poll {
            if let Some(element) = textarea.get_untracked() {
                keeper.capture(&TextareaSurface(element));
            }
        }
        session.set(Some(snapshot.clone()));
        if from_poll && keeper.is_pending() {
            let keeper = Rc::clone(&keeper);
            request_animation_frame(move || match textarea.get_untracked() {
                Some(element) => {
                    keeper.restore(&TextareaSurface(element));
                }
                None => keeper.discard(),
            });
        }
    };

    spawn_local(async move {
        let Some(user) = state.require_login().await else {
            return;
        };
        let opened = Rc::new(ChatRoom::new(
            state.chat_store(),
            state.poller(),
            user,
            config.max_attachment_bytes,
            observer,
        ));
        room.set_value(Some(Rc::clone(&opened)));
        let resume = query_param("session");
        match opened.open(resume.as_deref()).await {
            Ok(session) => log::info!("Chat session {} is {}", session.id, session.status),
            Err(err) if err.is_handled() => {}
            Err(err) => error.set(Some(err.user_message())),
        }
    });

    on_cleanup(move || {
        room.try_with_value(|room| {
            if let Some(room) = room {
                room.detach();
            }
        });
    });

    let current_room = move || room.with_value(Clone::clone);

    let send = move || {
        let Some(room) = current_room() else {
            return;
        };
        let text = input.get_untracked();
        spawn_local(async move {
            sending.set(true);
            let result = room.send(&text).await;
            sending.set(false);
            match result {
                Ok(SendOutcome::Sent) => {
                    input.set(String::new());
                    attachment_name.set(None);
                    error.set(None);
                }
                Ok(SendOutcome::Skipped(reason)) => log::debug!("Send skipped: {reason:?}"),
                Err(err) => show_chat_error(error, err),
            }
        });
    };

    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    let on_file = move |ev: ev::Event| {
        let picker = event_target::<HtmlInputElement>(&ev);
        let Some(file) = picker.files().and_then(|files| files.get(0)) else {
            return;
        };
        picker.set_value("");
        let Some(room) = current_room() else {
            return;
        };
        spawn_local(async move {
            let part = match read_file(&file).await {
                Ok(part) => part,
                Err(err) => {
                    error.set(Some(format!("Could not read {}: {err}", file.name())));
                    return;
                }
            };
            let name = part.filename.clone();
            match room.select_attachment(part) {
                Ok(()) => {
                    attachment_name.set(Some(name));
                    error.set(None);
                }
                // The previous selection stays in place.
                Err(err) => error.set(Some(err.to_string())),
            }
        });
    };

    let clear_attachment = move |_| {
        if let Some(room) = current_room() {
            room.clear_attachment();
        }
        attachment_name.set(None);
    };

    let end_chat = move |_| {
        let Some(room) = current_room() else {
            return;
        };
        spawn_local(async move {
            if let Err(err) = room.close().await {
                if !err.is_handled() {
                    error.set(Some(err.user_message()));
                }
            }
        });
    };

    let is_closed = move || session.with(|s| s.as_ref().is_some_and(ChatSession::is_closed));
    let my_id = move || state.user.with(|u| u.as_ref().map(|u| u.id.clone()).unwrap_or_default());
    let messages = move || {
        session.with(|s| {
            s.as_ref()
                .map(|s| message_views(&s.messages, &my_id(), &chrono::Local))
                .unwrap_or_default()
        })
    };

    view! {
        <section class="chat-widget">
            {move || error.get().map(|err| view! { <div class="error-banner">{err}</div> })}

            <header class="chat-header">
                <span>"Live support"</span>
                <span class="status">{move || session.with(|s| s.as_ref().map(|s| status_label(s.status)))}</span>
                <button class="end-chat" on:click=end_chat disabled=move || session.with(Option::is_none) || is_closed()>
                    "End chat"
                </button>
            </header>

            <div class="messages-container">
                <Show
                    when=move || session.with(|s| s.as_ref().is_some_and(|s| !s.messages.is_empty()))
                    fallback=|| view! { <div class="empty-state">"Ask us anything. An agent will join shortly."</div> }
                >
                    <For each=messages key=|m| m.key.clone() let:message>
                        <MessageBubble message=message />
                    </For>
                </Show>
            </div>

            <Show
                when=move || !is_closed()
                fallback=|| view! { <div class="closed-notice">"This chat has ended."</div> }
            >
                <div class="input-area">
                    {move || attachment_name.get().map(|name| view! {
                        <div class="attachment-chip">
                            <span>{name}</span>
                            <button on:click=clear_attachment>"Remove"</button>
                        </div>
                    })}
                    <div class="input-row">
                        <textarea
                            rows="1"
                            placeholder="Type a message… (Enter to send, Shift+Enter for newline)"
                            node_ref=textarea
                            prop:value=input
                            on:input=move |ev| input.set(event_target_value(&ev))
                            on:keydown=on_keydown
                        />
                        <label class="attach-btn">
                            "Attach"
                            <input type="file" hidden on:change=on_file />
                        </label>
                        <button
                            class="send-btn"
                            on:click=move |_| send()
                            disabled=move || sending.get()
                        >
                            {move || if sending.get() { "Sending…" } else { "Send" }}
                        </button>
                    </div>
                </div>
            </Show>
        </section>
    }
}

/// A single chat message bubble.
#[component]
fn MessageBubble(message: MessageView) -> impl IntoView {
    let css_class = match message.alignment {
        Alignment::Own => "message own",
        Alignment::Other => "message other",
    };
    let attachment = message.attachment.map(|attachment| {
        let href = format!("{}{}", api_base(), attachment.path);
        view! {
            <a class="attachment" href=href target="_blank" rel="noopener">
                {attachment.filename}
            </a>
        }
    });

    view! {
        <div class=css_class>
            <div class="message-meta">
                <span class="sender">{message.sender_name}</span>
                {message.show_admin_badge.then(|| view! { <span class="badge">"Support"</span> })}
                <span class="time">{message.time_label}</span>
            </div>
            <div class="content">{message.content}</div>
            {attachment}
        </div>
    }
}

fn status_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Initialized => "Starting",
        SessionStatus::Waiting => "Waiting for an agent",
        SessionStatus::Active => "Connected",
        SessionStatus::Closed => "Closed",
    }
}

fn show_chat_error(error: RwSignal<Option<String>>, err: ChatError) {
    match err {
        ChatError::Api(err) if err.is_handled() => {}
        ChatError::Api(err) => error.set(Some(err.user_message())),
        ChatError::Validation(err) => error.set(Some(err.to_string())),
    }
}
