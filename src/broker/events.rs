use std::sync::Arc;

use log::{debug, trace};

use crate::error::Result;
use crate::fetch::decode;
use crate::fetch::waiter::ResponseWaiter;
use crate::records::OhlcvRecord;

use super::RowSource;

/// Outcome delivered to whoever is blocked on a transaction request.
pub type TrOutcome = Result<Vec<OhlcvRecord>>;

struct RouterInner {
    login: ResponseWaiter<i32>,
    transactions: ResponseWaiter<TrOutcome>,
    history_limit: usize,
}

/// Completion handler registered with the broker.
///
/// Holds one waiter for the login event and one for transaction
/// completions. Cloning shares the same waiters.
#[derive(Clone)]
pub struct EventRouter {
    inner: Arc<RouterInner>,
}

impl EventRouter {
    pub fn new(history_limit: usize) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                login: ResponseWaiter::new(),
                transactions: ResponseWaiter::new(),
                history_limit,
            }),
        }
    }

    pub fn login_waiter(&self) -> &ResponseWaiter<i32> {
        &self.inner.login
    }

    pub fn transaction_waiter(&self) -> &ResponseWaiter<TrOutcome> {
        &self.inner.transactions
    }

    pub fn history_limit(&self) -> usize {
        self.inner.history_limit
    }

    /// Login completion. A call with nobody waiting is dropped.
    pub fn on_event_connect(&self, err_code: i32) {
        if !self
            .inner
            .login
            .signal(crate::fetch::session::LOGIN_TAG, err_code)
        {
            debug!("login event (code {err_code}) arrived with no pending connect");
        }
    }

    /// Transaction completion. Rows are decoded here because `rows` is only
    /// readable for the duration of the callback.
    pub fn on_receive_tr_data(
        &self,
        screen_no: &str,
        rq_name: &str,
        tr_code: &str,
        rows: &dyn RowSource,
    ) {
        if !self.inner.transactions.is_armed_for(rq_name) {
            trace!("dropping completion {rq_name}/{tr_code} on screen {screen_no}");
            return;
        }

        let outcome = decode::extract(rows, self.inner.history_limit);
        if !self.inner.transactions.signal(rq_name, outcome) {
            trace!("completion {rq_name} lost its waiter while decoding");
        }
    }
}
