use std::fmt;
use std::time::Duration;

use log::{error, info};

use crate::broker::{BrokerApi, EventRouter};
use crate::error::{AppError, Result};

/// Correlation tag for the login waiter; there is only ever one login.
pub const LOGIN_TAG: &str = "CommConnect";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticated,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Authenticated => "authenticated",
            SessionState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Owns the broker handle and its completion router for one run.
pub struct Session<B: BrokerApi> {
    broker: B,
    router: EventRouter,
    state: SessionState,
}

impl<B: BrokerApi> Session<B> {
    /// Register `router` as the broker's completion handler.
    pub fn new(broker: B, router: EventRouter) -> Self {
        broker.attach(router.clone());
        Self {
            broker,
            router,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Log in and block until the broker reports the outcome.
    ///
    /// Without `login_timeout` the wait is bounded only by the remote login
    /// prompt. Both failure paths leave the session `Failed`; callers are
    /// expected to abort the run.
    pub async fn connect(&mut self, login_timeout: Option<Duration>) -> Result<()> {
        if self.state != SessionState::Disconnected {
            return Err(AppError::InvalidState(format!(
                "connect called while {}",
                self.state
            )));
        }

        let handle = self.router.login_waiter().arm(LOGIN_TAG)?;
        self.state = SessionState::Connecting;
        info!("logging in...");

        if let Err(err) = self.broker.comm_connect() {
            self.state = SessionState::Failed;
            error!("login could not be started: {err}");
            return Err(err);
        }

        match handle.wait(login_timeout).await {
            Ok(0) => {
                self.state = SessionState::Authenticated;
                info!("login succeeded");
                Ok(())
            }
            Ok(code) => {
                self.state = SessionState::Failed;
                error!("login failed with error code {code}");
                Err(AppError::Authentication { code })
            }
            Err(AppError::Timeout { .. }) => {
                self.state = SessionState::Failed;
                error!("login did not complete in time");
                Err(AppError::LoginTimeout)
            }
            Err(err) => {
                self.state = SessionState::Failed;
                Err(err)
            }
        }
    }

    /// Drop any outstanding waits and return to `Disconnected`.
    pub fn terminate(&mut self) {
        self.router.transaction_waiter().disarm();
        self.router.login_waiter().disarm();
        if self.state == SessionState::Authenticated {
            self.state = SessionState::Disconnected;
            info!("session closed");
        }
    }
}
