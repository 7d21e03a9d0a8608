use std::time::Duration;

use log::debug;

use crate::broker::BrokerApi;
use crate::error::{AppError, Result};
use crate::records::OhlcvRecord;

use super::session::Session;
use super::waiter::PendingRequest;

/// Daily price-history transaction.
pub const DAILY_CHART_TR: &str = "opt10081";
pub const DAILY_CHART_RQ_NAME: &str = "opt10081_req";

pub const INPUT_CODE: &str = "종목코드";
pub const INPUT_BASE_DATE: &str = "기준일자";
pub const INPUT_ADJUSTED: &str = "수정주가구분";

pub const DEFAULT_SCREEN_NO: &str = "0101";

/// Correlation tag for a symbol's daily-chart request.
pub fn daily_chart_tag(code: &str) -> String {
    format!("{DAILY_CHART_RQ_NAME}:{code}")
}

/// Issues one transaction at a time and blocks until its completion.
pub struct RequestDispatcher<'s, B: BrokerApi> {
    session: &'s Session<B>,
    screen_no: String,
    timeout: Option<Duration>,
}

impl<'s, B: BrokerApi> RequestDispatcher<'s, B> {
    pub fn new(
        session: &'s Session<B>,
        screen_no: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            session,
            screen_no: screen_no.into(),
            timeout,
        }
    }

    pub fn pending(&self) -> Option<PendingRequest> {
        self.session.router().transaction_waiter().pending()
    }

    /// Request the adjusted daily chart for `code`, most recent first, and
    /// wait for the completion tagged `tag`.
    ///
    /// With no timeout configured an unresponsive remote blocks forever.
    pub async fn request(&mut self, code: &str, tag: &str) -> Result<Vec<OhlcvRecord>> {
        if !self.session.is_ready() {
            return Err(AppError::InvalidState(format!(
                "request for {code} issued while session is {}",
                self.session.state()
            )));
        }

        let handle = self.session.router().transaction_waiter().arm(tag)?;

        let broker = self.session.broker();
        broker.set_input_value(INPUT_CODE, code);
        broker.set_input_value(INPUT_BASE_DATE, "");
        broker.set_input_value(INPUT_ADJUSTED, "1");
        broker.comm_rq_data(tag, DAILY_CHART_TR, 0, &self.screen_no)?;
        debug!("submitted {DAILY_CHART_TR} for {code} as {tag}");

        handle.wait(self.timeout).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{EventRouter, ReplayBroker, ReplayFixture, ReplaySymbol};
    use crate::fetch::decode::{
        DEFAULT_HISTORY_LIMIT, FIELD_CLOSE, FIELD_DATE, FIELD_HIGH, FIELD_LOW, FIELD_OPEN,
        FIELD_VOLUME,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn row(date: &str, close: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (FIELD_DATE.to_string(), date.to_string()),
            (FIELD_OPEN.to_string(), "100".to_string()),
            (FIELD_HIGH.to_string(), "110".to_string()),
            (FIELD_LOW.to_string(), "95".to_string()),
            (FIELD_CLOSE.to_string(), close.to_string()),
            (FIELD_VOLUME.to_string(), "1000".to_string()),
        ])
    }

    fn fixture() -> ReplayFixture {
        ReplayFixture {
            latency_ms: 5,
            symbols: BTreeMap::from([
                (
                    "005930".to_string(),
                    ReplaySymbol {
                        name: "삼성전자".to_string(),
                        rows: vec![row("20240102", "+105"), row("20240101", "95")],
                        ..ReplaySymbol::default()
                    },
                ),
                (
                    "000660".to_string(),
                    ReplaySymbol {
                        name: "SK하이닉스".to_string(),
                        silent: true,
                        ..ReplaySymbol::default()
                    },
                ),
                (
                    "035720".to_string(),
                    ReplaySymbol {
                        name: "카카오".to_string(),
                        rows: vec![row("20240102", "n/a")],
                        ..ReplaySymbol::default()
                    },
                ),
            ]),
            ..ReplayFixture::default()
        }
    }

    async fn connected(
        fixture: ReplayFixture,
    ) -> (Session<Arc<ReplayBroker>>, Arc<ReplayBroker>) {
        let broker = Arc::new(ReplayBroker::new(fixture));
        let router = EventRouter::new(DEFAULT_HISTORY_LIMIT);
        let mut session = Session::new(Arc::clone(&broker), router);
        session.connect(None).await.unwrap();
        (session, broker)
    }

    #[tokio::test]
    async fn returns_extracted_rows_for_matching_completion() {
        let (session, broker) = connected(fixture()).await;
        let mut dispatcher = RequestDispatcher::new(&session, DEFAULT_SCREEN_NO, None);

        let records = dispatcher
            .request("005930", &daily_chart_tag("005930"))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].close, 105);
        assert!(dispatcher.pending().is_none());
        assert_eq!(broker.submitted(), 1);
    }

    #[tokio::test]
    async fn stale_completions_do_not_release_the_wait() {
        let fixture = ReplayFixture {
            stale_echo: true,
            ..fixture()
        };
        let (session, _broker) = connected(fixture).await;
        let mut dispatcher = RequestDispatcher::new(&session, DEFAULT_SCREEN_NO, None);

        let records = dispatcher
            .request("005930", &daily_chart_tag("005930"))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn unknown_symbol_yields_empty_history() {
        let (session, _broker) = connected(fixture()).await;
        let mut dispatcher = RequestDispatcher::new(&session, DEFAULT_SCREEN_NO, None);

        let records = dispatcher.request("123456", "empty").await.unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn parse_failure_surfaces_as_extraction_error() {
        let (session, _broker) = connected(fixture()).await;
        let mut dispatcher = RequestDispatcher::new(&session, DEFAULT_SCREEN_NO, None);

        let err = dispatcher
            .request("035720", &daily_chart_tag("035720"))
            .await
            .expect_err("bad close price");

        assert!(matches!(err, AppError::Extraction { field: FIELD_CLOSE, .. }));
    }

    #[tokio::test]
    async fn silent_remote_times_out_when_bounded() {
        let (session, _broker) = connected(fixture()).await;
        let mut dispatcher =
            RequestDispatcher::new(&session, DEFAULT_SCREEN_NO, Some(Duration::from_millis(30)));

        let err = dispatcher
            .request("000660", &daily_chart_tag("000660"))
            .await
            .expect_err("no completion");

        assert!(matches!(err, AppError::Timeout { .. }));
        assert!(dispatcher.pending().is_none());
    }

    #[tokio::test]
    async fn silent_remote_blocks_forever_without_timeout() {
        let (session, _broker) = connected(fixture()).await;
        let mut dispatcher = RequestDispatcher::new(&session, DEFAULT_SCREEN_NO, None);

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            dispatcher.request("000660", &daily_chart_tag("000660")),
        )
        .await;

        assert!(outcome.is_err(), "request must still be waiting");
    }

    #[tokio::test]
    async fn refuses_requests_before_login() {
        let session = Session::new(
            ReplayBroker::new(fixture()),
            EventRouter::new(DEFAULT_HISTORY_LIMIT),
        );
        let mut dispatcher = RequestDispatcher::new(&session, DEFAULT_SCREEN_NO, None);

        let err = dispatcher.request("005930", "early").await.expect_err("not logged in");
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn submission_failure_releases_the_slot() {
        let mut fixture = fixture();
        if let Some(symbol) = fixture.symbols.get_mut("005930") {
            symbol.reject = true;
        }
        let (session, _broker) = connected(fixture).await;
        let mut dispatcher = RequestDispatcher::new(&session, DEFAULT_SCREEN_NO, None);

        let err = dispatcher
            .request("005930", &daily_chart_tag("005930"))
            .await
            .expect_err("rejected");

        assert!(matches!(err, AppError::Broker(_)));
        assert!(dispatcher.pending().is_none());
    }
}
