use std::rc::Rc;

use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;

use support_core::polling::{PollSchedule, Poller};
use support_core::redirect::SystemClock;
use support_core::store::{ChatStore, TicketStore};
use support_core::ticket::{check_identity, login_redirect, Identity};
use support_core::{ApiClient, Participant, SupportConfig};

use crate::api::{self, BrowserNavigator, BrowserSpawner, FetchTransport, GlooSleeper};

pub type Api = ApiClient<FetchTransport>;

/// Shared application state, provided via Leptos context.
///
/// One [`ApiClient`] (and so one redirect guard) serves every view on the
/// page.
#[derive(Clone, Copy)]
pub struct SupportState {
    config: StoredValue<SupportConfig>,
    api: StoredValue<Rc<Api>, LocalStorage>,
    pub user: RwSignal<Option<Participant>>,
}

impl SupportState {
    /// Create a new `SupportState` and provide it in the current Leptos context.
    pub fn provide() -> Self {
        let config = api::support_config();
        let client = ApiClient::new(
            FetchTransport,
            &config,
            Rc::new(BrowserNavigator),
            Rc::new(SystemClock),
        );
        let state = Self {
            config: StoredValue::new(config),
            api: StoredValue::new_local(Rc::new(client)),
            user: RwSignal::new(None),
        };
        provide_context(state);
        state
    }

    pub fn config(&self) -> SupportConfig {
        self.config.get_value()
    }

    pub fn api(&self) -> Rc<Api> {
        self.api.with_value(Rc::clone)
    }

    pub fn chat_store(&self) -> ChatStore<FetchTransport> {
        ChatStore::new(self.api())
    }

    pub fn ticket_store(&self) -> TicketStore<FetchTransport> {
        TicketStore::new(self.api())
    }

    /// A fresh poller; each view owns its own loop.
    pub fn poller(&self) -> Poller {
        Poller::new(
            PollSchedule::from_config(&self.config.read_value()),
            Rc::new(GlooSleeper),
            Rc::new(BrowserSpawner),
        )
    }

    /// Resolves the current user, or sends the browser to the login page
    /// with a way back to where it was.
    pub async fn require_login(&self) -> Option<Participant> {
        match check_identity(&*self.api()).await {
            Identity::Authenticated(user) => {
                self.user.set(Some(user.clone()));
                Some(user)
            }
            Identity::Anonymous => {
                self.user.set(None);
                let target = login_redirect(&self.config.read_value().login_path, &current_path());
                log::info!("Not logged in, redirecting to {target}");
                api::go_to(&target);
                None
            }
        }
    }
}

/// Path and query of the current page.
pub fn current_path() -> String {
    let location = window().location();
    let path = location.pathname().unwrap_or_else(|_| "/".to_string());
    let search = location.search().unwrap_or_default();
    format!("{path}{search}")
}

/// Value of `name` in the current page's query string.
pub fn query_param(name: &str) -> Option<String> {
    let search = window().location().search().ok()?;
    web_sys::UrlSearchParams::new_with_str(&search)
        .ok()?
        .get(name)
        .filter(|value| !value.is_empty())
}
