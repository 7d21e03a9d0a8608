use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Context, Result};
use crate::fetch::request::{DAILY_CHART_TR, INPUT_CODE};

use super::{BrokerApi, EventRouter, Market, RowSource};

/// Recorded broker behaviour: login outcome, market listings, master data and
/// daily-chart rows keyed by the remote field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayFixture {
    /// `None` means the login event never fires.
    pub login_code: Option<i32>,
    pub latency_ms: u64,
    pub kospi: String,
    pub kosdaq: String,
    pub symbols: BTreeMap<String, ReplaySymbol>,
    /// Emit a completion with a foreign tag ahead of every real one.
    pub stale_echo: bool,
}

impl Default for ReplayFixture {
    fn default() -> Self {
        Self {
            login_code: Some(0),
            latency_ms: 0,
            kospi: String::new(),
            kosdaq: String::new(),
            symbols: BTreeMap::new(),
            stale_echo: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySymbol {
    pub name: String,
    pub state: String,
    pub rows: Vec<BTreeMap<String, String>>,
    /// Accept the request but never complete it.
    pub silent: bool,
    /// Refuse the request at submission time.
    pub reject: bool,
}

struct ReplayRows<'a>(&'a [BTreeMap<String, String>]);

impl RowSource for ReplayRows<'_> {
    fn repeat_count(&self) -> usize {
        self.0.len()
    }

    fn comm_data(&self, row: usize, field: &str) -> String {
        self.0
            .get(row)
            .and_then(|fields| fields.get(field))
            .cloned()
            .unwrap_or_default()
    }
}

/// Broker that replays a fixture, delivering completions from a worker
/// thread the way a live connection would.
pub struct ReplayBroker {
    fixture: Arc<ReplayFixture>,
    router: Mutex<Option<EventRouter>>,
    inputs: Mutex<HashMap<String, String>>,
    submitted: AtomicUsize,
}

impl ReplayBroker {
    pub fn new(fixture: ReplayFixture) -> Self {
        Self {
            fixture: Arc::new(fixture),
            router: Mutex::new(None),
            inputs: Mutex::new(HashMap::new()),
            submitted: AtomicUsize::new(0),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read broker fixture {}", path.display()))?;
        let fixture: ReplayFixture = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse broker fixture {}", path.display()))?;
        Ok(Self::new(fixture))
    }

    /// Number of transaction requests accepted so far.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    fn router(&self) -> Result<EventRouter> {
        self.router
            .lock()
            .map_err(|_| AppError::message("Failed to lock replay router"))?
            .clone()
            .ok_or_else(|| AppError::Broker("no event handler attached".to_string()))
    }

    fn input(&self, id: &str) -> Result<String> {
        let inputs = self
            .inputs
            .lock()
            .map_err(|_| AppError::message("Failed to lock replay inputs"))?;
        inputs
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::Broker(format!("input `{id}` was not set")))
    }

    fn deliver<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let latency = Duration::from_millis(self.fixture.latency_ms);
        thread::spawn(move || {
            if !latency.is_zero() {
                thread::sleep(latency);
            }
            callback();
        });
    }
}

impl BrokerApi for ReplayBroker {
    fn attach(&self, router: EventRouter) {
        let mut slot = self
            .router
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(router);
    }

    fn comm_connect(&self) -> Result<()> {
        let router = self.router()?;
        match self.fixture.login_code {
            Some(code) => self.deliver(move || router.on_event_connect(code)),
            None => debug!("replay fixture never completes login"),
        }
        Ok(())
    }

    fn code_list_by_market(&self, market: Market) -> String {
        match market {
            Market::Kospi => self.fixture.kospi.clone(),
            Market::Kosdaq => self.fixture.kosdaq.clone(),
        }
    }

    fn master_code_name(&self, code: &str) -> String {
        self.fixture
            .symbols
            .get(code)
            .map(|symbol| symbol.name.clone())
            .unwrap_or_default()
    }

    fn master_stock_state(&self, code: &str) -> String {
        self.fixture
            .symbols
            .get(code)
            .map(|symbol| symbol.state.clone())
            .unwrap_or_default()
    }

    fn set_input_value(&self, id: &str, value: &str) {
        let mut inputs = self
            .inputs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inputs.insert(id.to_string(), value.to_string());
    }

    fn comm_rq_data(
        &self,
        rq_name: &str,
        tr_code: &str,
        _prev_next: i32,
        screen_no: &str,
    ) -> Result<()> {
        if tr_code != DAILY_CHART_TR {
            return Err(AppError::Broker(format!(
                "unsupported transaction `{tr_code}`"
            )));
        }

        let code = self.input(INPUT_CODE)?;
        let symbol = self.fixture.symbols.get(&code);
        if symbol.map(|symbol| symbol.reject).unwrap_or(false) {
            return Err(AppError::Broker(format!("request for {code} rejected")));
        }

        self.submitted.fetch_add(1, Ordering::SeqCst);
        if symbol.map(|symbol| symbol.silent).unwrap_or(false) {
            debug!("replay fixture never completes {rq_name}");
            return Ok(());
        }

        let router = self.router()?;
        let fixture = Arc::clone(&self.fixture);
        let rq_name = rq_name.to_string();
        let tr_code = tr_code.to_string();
        let screen_no = screen_no.to_string();

        self.deliver(move || {
            let rows = fixture
                .symbols
                .get(&code)
                .map(|symbol| symbol.rows.as_slice())
                .unwrap_or(&[]);
            let rows = ReplayRows(rows);
            if fixture.stale_echo {
                let stale = format!("{rq_name}#stale");
                router.on_receive_tr_data(&screen_no, &stale, &tr_code, &rows);
            }
            router.on_receive_tr_data(&screen_no, &rq_name, &tr_code, &rows);
        });

        Ok(())
    }
}
