pub mod decode;
pub mod history;
pub mod pacing;
pub mod request;
pub mod session;
pub mod waiter;

pub use decode::{extract, DEFAULT_HISTORY_LIMIT};
pub use history::{BatchFetcher, FetchReport, SymbolOutcome};
pub use pacing::{RequestPacer, DEFAULT_REQUEST_INTERVAL};
pub use request::{daily_chart_tag, RequestDispatcher, DEFAULT_SCREEN_NO};
pub use session::{Session, SessionState};
pub use waiter::{PendingRequest, ResponseWaiter, WaitHandle};
