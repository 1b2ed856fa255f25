mod api;
mod components;
mod focus;
mod state;

use leptos::mount::mount_to_body;
use leptos::prelude::*;

use components::chat::ChatWidget;
use components::ticket_form::TicketForm;
use components::ticket_status::TicketStatusView;
use state::SupportState;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Page {
    Chat,
    NewTicket,
    Ticket(String),
    Home,
}

impl Page {
    fn from_path(path: &str) -> Self {
        let path = path.trim_end_matches('/');
        match path.strip_prefix("/support") {
            Some("/chat") => Page::Chat,
            Some("/ticket/new") => Page::NewTicket,
            Some(rest) => match rest.strip_prefix("/ticket/") {
                Some(number) if !number.is_empty() && !number.contains('/') => {
                    Page::Ticket(number.to_string())
                }
                _ => Page::Home,
            },
            None => Page::Home,
        }
    }
}

/// Root application component.
#[component]
fn App() -> impl IntoView {
    SupportState::provide();

    let path = window().location().pathname().unwrap_or_default();
    match Page::from_path(&path) {
        Page::Chat => view! { <ChatWidget /> }.into_any(),
        Page::NewTicket => view! { <TicketForm /> }.into_any(),
        Page::Ticket(ticket_number) => view! { <TicketStatusView ticket_number=ticket_number /> }.into_any(),
        Page::Home => view! {
            <nav class="support-home">
                <h1>"How can we help?"</h1>
                <a href="/support/chat">"Chat with us"</a>
                <a href="/support/ticket/new">"Open a ticket"</a>
            </nav>
        }
        .into_any(),
    }
}

fn main() {
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");
    mount_to_body(App);
}
