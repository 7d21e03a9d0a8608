use crate::error::Result;

pub mod events;
pub mod replay;

pub use events::EventRouter;
pub use replay::{ReplayBroker, ReplayFixture, ReplaySymbol};

/// Market segments the catalog pulls codes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    Kospi,
    Kosdaq,
}

impl Market {
    pub const ALL: [Market; 2] = [Market::Kospi, Market::Kosdaq];

    /// Identifier the broker expects for `GetCodeListByMarket`.
    pub fn remote_id(self) -> &'static str {
        match self {
            Market::Kospi => "0",
            Market::Kosdaq => "10",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Market::Kospi => "KOSPI",
            Market::Kosdaq => "KOSDAQ",
        }
    }
}

/// Repeating-row view handed to the completion callback.
///
/// Only valid while the callback runs; implementations may reuse the
/// underlying buffer once it returns.
pub trait RowSource {
    fn repeat_count(&self) -> usize;
    fn comm_data(&self, row: usize, field: &str) -> String;
}

/// Callback-driven broker surface.
///
/// Calls return immediately. Login and transaction results arrive later
/// through the [`EventRouter`] registered with `attach`, possibly from
/// another thread.
pub trait BrokerApi: Send + Sync {
    fn attach(&self, router: EventRouter);

    /// Starts the login flow; completion is reported via `on_event_connect`.
    fn comm_connect(&self) -> Result<()>;

    /// `;`-separated code list, possibly with empty entries.
    fn code_list_by_market(&self, market: Market) -> String;

    fn master_code_name(&self, code: &str) -> String;

    /// Free-form trading status text, e.g. `증거금100%|거래정지`.
    fn master_stock_state(&self, code: &str) -> String;

    fn set_input_value(&self, id: &str, value: &str);

    /// Submits a transaction request; completion is reported via
    /// `on_receive_tr_data` carrying `rq_name` back.
    fn comm_rq_data(&self, rq_name: &str, tr_code: &str, prev_next: i32, screen_no: &str)
        -> Result<()>;
}

impl<B: BrokerApi + ?Sized> BrokerApi for std::sync::Arc<B> {
    fn attach(&self, router: EventRouter) {
        (**self).attach(router)
    }

    fn comm_connect(&self) -> Result<()> {
        (**self).comm_connect()
    }

    fn code_list_by_market(&self, market: Market) -> String {
        (**self).code_list_by_market(market)
    }

    fn master_code_name(&self, code: &str) -> String {
        (**self).master_code_name(code)
    }

    fn master_stock_state(&self, code: &str) -> String {
        (**self).master_stock_state(code)
    }

    fn set_input_value(&self, id: &str, value: &str) {
        (**self).set_input_value(id, value)
    }

    fn comm_rq_data(
        &self,
        rq_name: &str,
        tr_code: &str,
        prev_next: i32,
        screen_no: &str,
    ) -> Result<()> {
        (**self).comm_rq_data(rq_name, tr_code, prev_next, screen_no)
    }
}
