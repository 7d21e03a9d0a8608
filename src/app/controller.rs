use std::path::PathBuf;

use log::{debug, info};
use reqwest::Client;

use crate::broker::{BrokerApi, EventRouter, ReplayBroker};
use crate::config::CollectorConfig;
use crate::error::Result;
use crate::fetch::{BatchFetcher, FetchReport, RequestPacer, Session};
use crate::records::Records;
use crate::services::{fetch_quote_listing, load_universe, SymbolCatalog};

/// What a finished run produced.
pub struct CollectionSummary {
    pub output: PathBuf,
    pub report: FetchReport,
}

/// Drives one collection run: login, universe, batch fetch, persistence.
pub struct Collector {
    config: CollectorConfig,
    records: Records,
    pacer: RequestPacer,
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Self {
        let records = Records::new(config.output_path.clone());
        let pacer = RequestPacer::new(config.request_interval());
        Self {
            config,
            records,
            pacer,
        }
    }

    pub fn with_pacer(mut self, pacer: RequestPacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Run against the replay broker named in the config.
    pub async fn run(&self) -> Result<CollectionSummary> {
        let broker = ReplayBroker::from_file(&self.config.broker.fixture)?;
        self.run_with(broker).await
    }

    /// Run against any broker. Login failure is returned before anything is
    /// fetched or written.
    pub async fn run_with<B: BrokerApi>(&self, broker: B) -> Result<CollectionSummary> {
        self.records.prepare()?;

        let mut session = Session::new(broker, EventRouter::new(self.config.history_limit));
        session.connect(self.config.login_timeout()).await?;

        let codes = self.universe(&session)?;
        let fetcher = BatchFetcher::new(self.pacer.clone(), self.config.request_timeout())
            .with_screen_no(self.config.screen_no.clone());
        let report = fetcher.run(&session, &codes).await?;
        session.terminate();

        let output = self.records.save(&report.result)?;
        info!(
            "saved {} symbols to {}",
            report.result.len(),
            output.display()
        );

        if let Some(url) = &self.config.quote_listing_url {
            let rows = fetch_quote_listing(&Client::new(), url).await;
            info!("quote listing {url}: {} rows", rows.len());
            for row in &rows {
                debug!("{} {} {}", row.code, row.name, row.last_close);
            }
        }

        Ok(CollectionSummary { output, report })
    }

    fn universe<B: BrokerApi>(&self, session: &Session<B>) -> Result<Vec<String>> {
        match &self.config.universe_file {
            Some(path) => {
                let codes = load_universe(path)?;
                info!("universe file {}: {} codes", path.display(), codes.len());
                Ok(codes)
            }
            None => Ok(SymbolCatalog::new(session.broker()).enumerate()),
        }
    }
}
