use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::broker::BrokerApi;
use crate::error::{AppError, Result};
use crate::records::{FetchResult, StockHistory};
use crate::services::{Symbol, SymbolCatalog};

use super::pacing::RequestPacer;
use super::request::{daily_chart_tag, RequestDispatcher, DEFAULT_SCREEN_NO};
use super::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolOutcome {
    Fetched { records: usize },
    Excluded(String),
    Failed(String),
    /// Code appeared twice in the input; the first result is kept.
    Duplicate,
}

/// Result map plus what happened to every input code, in input order.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub result: FetchResult,
    pub outcomes: Vec<(String, SymbolOutcome)>,
}

impl FetchReport {
    pub fn fetched(&self) -> usize {
        self.count(|outcome| matches!(outcome, SymbolOutcome::Fetched { .. }))
    }

    pub fn excluded(&self) -> usize {
        self.count(|outcome| matches!(outcome, SymbolOutcome::Excluded(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, SymbolOutcome::Failed(_)))
    }

    fn count(&self, predicate: impl Fn(&SymbolOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| predicate(outcome))
            .count()
    }
}

/// Walks the symbol list one request at a time, pacing calls that reach the
/// remote and isolating per-symbol failures.
pub struct BatchFetcher {
    pacer: RequestPacer,
    request_timeout: Option<Duration>,
    screen_no: String,
    progress_counter: Arc<AtomicUsize>,
}

impl BatchFetcher {
    pub fn new(pacer: RequestPacer, request_timeout: Option<Duration>) -> Self {
        Self {
            pacer,
            request_timeout,
            screen_no: DEFAULT_SCREEN_NO.to_string(),
            progress_counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_screen_no(mut self, screen_no: impl Into<String>) -> Self {
        self.screen_no = screen_no.into();
        self
    }

    /// Symbols processed so far in the current run.
    pub fn progress_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.progress_counter)
    }

    pub async fn run<B: BrokerApi>(
        &self,
        session: &Session<B>,
        codes: &[String],
    ) -> Result<FetchReport> {
        if !session.is_ready() {
            return Err(AppError::InvalidState(format!(
                "batch fetch started while session is {}",
                session.state()
            )));
        }

        let catalog = SymbolCatalog::new(session.broker());
        let mut dispatcher =
            RequestDispatcher::new(session, self.screen_no.clone(), self.request_timeout);
        let mut report = FetchReport::default();
        let total = codes.len();

        self.progress_counter.store(0, Ordering::SeqCst);

        for (idx, code) in codes.iter().enumerate() {
            let position = idx + 1;

            let outcome = if report.result.contains_key(code) {
                SymbolOutcome::Duplicate
            } else {
                self.fetch_symbol(&catalog, &mut dispatcher, &mut report, code, position, total)
                    .await
            };

            self.progress_counter.fetch_add(1, Ordering::SeqCst);
            report.outcomes.push((code.clone(), outcome));
        }

        info!(
            "batch finished: {} fetched, {} excluded, {} failed",
            report.fetched(),
            report.excluded(),
            report.failed()
        );
        Ok(report)
    }

    async fn fetch_symbol<B: BrokerApi>(
        &self,
        catalog: &SymbolCatalog<'_, B>,
        dispatcher: &mut RequestDispatcher<'_, B>,
        report: &mut FetchReport,
        code: &str,
        position: usize,
        total: usize,
    ) -> SymbolOutcome {
        let (symbol, eligibility) = catalog.resolve(code);
        let Symbol { code, name, .. } = symbol;

        if let Some(reason) = eligibility.reason() {
            info!("[{position}/{total}] {code} {name} excluded: {reason}");
            return SymbolOutcome::Excluded(reason);
        }

        info!("[{position}/{total}] {code} {name} requesting daily chart...");
        let outcome = match dispatcher.request(&code, &daily_chart_tag(&code)).await {
            Ok(ohlcv) => {
                let records = ohlcv.len();
                if records == 0 {
                    info!("  >> {code} {name} returned no rows");
                }
                report
                    .result
                    .entry(code)
                    .or_insert(StockHistory { name, ohlcv });
                SymbolOutcome::Fetched { records }
            }
            Err(err) => {
                warn!("  >> {code} {name} failed: {err}");
                SymbolOutcome::Failed(err.to_string())
            }
        };
        self.pacer.pause().await;
        outcome
    }
}
