use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::RedirectPaths;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectTarget {
    SessionExpired,
    ServerError,
    NetworkError,
}

impl RedirectTarget {
    pub fn path<'a>(&self, paths: &'a RedirectPaths) -> &'a str {
        match self {
            RedirectTarget::SessionExpired => &paths.session_expired,
            RedirectTarget::ServerError => &paths.server_error,
            RedirectTarget::NetworkError => &paths.network_error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: RedirectTarget,
    pub path: String,
}

/// Performs a full navigation away from the current view.
pub trait Navigator {
    fn navigate(&self, redirect: &Redirect);
}

/// Lets one redirect through, then swallows every other one until the
/// cooldown has elapsed.
pub struct RedirectGuard {
    clock: Rc<dyn Clock>,
    cooldown: chrono::Duration,
    suppressed_until: Cell<Option<DateTime<Utc>>>,
}

impl RedirectGuard {
    pub fn new(clock: Rc<dyn Clock>, cooldown: Duration) -> Self {
        let cooldown =
            chrono::Duration::from_std(cooldown).unwrap_or_else(|_| chrono::Duration::days(365));
        Self {
            clock,
            cooldown,
            suppressed_until: Cell::new(None),
        }
    }

    /// Returns true when the caller may navigate.
    pub fn try_acquire(&self) -> bool {
        let now = self.clock.now();
        if let Some(until) = self.suppressed_until.get() {
            if now < until {
                return false;
            }
        }
        let until = now
            .checked_add_signed(self.cooldown)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.suppressed_until.set(Some(until));
        true
    }

    pub fn is_armed(&self) -> bool {
        self.suppressed_until
            .get()
            .is_some_and(|until| self.clock.now() < until)
    }
}

/// Routes failure redirects through a [`RedirectGuard`].
pub struct Redirector {
    guard: RedirectGuard,
    navigator: Rc<dyn Navigator>,
    paths: RedirectPaths,
}

impl Redirector {
    pub fn new(guard: RedirectGuard, navigator: Rc<dyn Navigator>, paths: RedirectPaths) -> Self {
        Self {
            guard,
            navigator,
            paths,
        }
    }

    /// Returns whether a navigation was actually issued.
    pub fn redirect(&self, target: RedirectTarget) -> bool {
        if !self.guard.try_acquire() {
            debug!(?target, "redirect suppressed during cooldown");
            return false;
        }
        let redirect = Redirect {
            target,
            path: target.path(&self.paths).to_string(),
        };
        warn!(?target, path = %redirect.path, "redirecting after failed request");
        self.navigator.navigate(&redirect);
        true
    }

    pub fn guard(&self) -> &RedirectGuard {
        &self.guard
    }
}
