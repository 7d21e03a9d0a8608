use std::collections::HashSet;
use std::path::Path;

use log::info;

use crate::broker::{BrokerApi, Market};
use crate::error::{Context, Result};

/// Name fragments marking instruments without a usable daily chart:
/// preferred shares, ETF, ETN, REIT, SPAC, bonds, futures, options, ELS.
pub const EXCLUDED_KEYWORDS: &[&str] = &[
    "우", "ETF", "ETN", "리츠", "스팩", "채권", "선물", "옵션", "ELS",
];

/// Status fragments meaning trading is halted.
pub const SUSPENSION_MARKERS: &[&str] = &["거래정지", "정지"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub code: String,
    pub name: String,
    pub tradable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    ExcludedKeyword(&'static str),
    Suspended(String),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Eligibility::Eligible => None,
            Eligibility::ExcludedKeyword(keyword) => Some(format!("name contains `{keyword}`")),
            Eligibility::Suspended(state) => Some(format!("trading suspended ({state})")),
        }
    }
}

/// Symbol enumeration and eligibility checks against broker master data.
pub struct SymbolCatalog<'a, B: BrokerApi> {
    broker: &'a B,
}

impl<'a, B: BrokerApi> SymbolCatalog<'a, B> {
    pub fn new(broker: &'a B) -> Self {
        Self { broker }
    }

    /// KOSPI then KOSDAQ codes, empty entries dropped, first occurrence kept.
    pub fn enumerate(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut codes = Vec::new();

        for market in Market::ALL {
            let listing = self.broker.code_list_by_market(market);
            let before = codes.len();
            for code in listing.split(';').map(str::trim).filter(|code| !code.is_empty()) {
                if seen.insert(code.to_string()) {
                    codes.push(code.to_string());
                }
            }
            info!("{}: {} codes", market.label(), codes.len() - before);
        }

        info!("total symbols: {}", codes.len());
        codes
    }

    pub fn name(&self, code: &str) -> String {
        self.broker.master_code_name(code).trim().to_string()
    }

    /// Keyword exclusion first, then the live trading status.
    pub fn is_eligible(&self, code: &str, name: &str) -> Eligibility {
        if let Some(keyword) = EXCLUDED_KEYWORDS
            .iter()
            .find(|keyword| name.contains(*keyword))
        {
            return Eligibility::ExcludedKeyword(*keyword);
        }

        let state = self.broker.master_stock_state(code);
        if SUSPENSION_MARKERS.iter().any(|marker| state.contains(marker)) {
            return Eligibility::Suspended(state.trim().to_string());
        }

        Eligibility::Eligible
    }

    /// Master name and eligibility for one code, looked up together.
    pub fn resolve(&self, code: &str) -> (Symbol, Eligibility) {
        let name = self.name(code);
        let eligibility = self.is_eligible(code, &name);
        let symbol = Symbol {
            code: code.to_string(),
            name,
            tradable: eligibility.is_eligible(),
        };
        (symbol, eligibility)
    }

    pub fn symbol(&self, code: &str) -> Symbol {
        self.resolve(code).0
    }
}

/// Read a fixed universe from a CSV file: header row, code in the first column.
pub fn load_universe<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open universe file {}", path.display()))?;

    let mut seen = HashSet::new();
    let mut codes = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to read universe record")?;
        let Some(code) = record.get(0).map(str::trim) else {
            continue;
        };
        if !code.is_empty() && seen.insert(code.to_string()) {
            codes.push(code.to_string());
        }
    }

    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{ReplayBroker, ReplayFixture, ReplaySymbol};
    use std::collections::BTreeMap;

    fn broker() -> ReplayBroker {
        let symbol = |name: &str, state: &str| ReplaySymbol {
            name: name.to_string(),
            state: state.to_string(),
            ..ReplaySymbol::default()
        };
        ReplayBroker::new(ReplayFixture {
            kospi: "005930;000660;;005935;".to_string(),
            kosdaq: ";035720;005930;".to_string(),
            symbols: BTreeMap::from([
                ("005930".to_string(), symbol("삼성전자", "증거금20%|담보대출|신용가능")),
                ("005935".to_string(), symbol("삼성전자우", "증거금20%")),
                ("000660".to_string(), symbol("SK하이닉스", "증거금100%|거래정지")),
                ("069500".to_string(), symbol("KODEX 200 ETF", "거래정지")),
            ]),
            ..ReplayFixture::default()
        })
    }

    #[test]
    fn enumerates_both_markets_without_duplicates() {
        let broker = broker();
        let codes = SymbolCatalog::new(&broker).enumerate();

        assert_eq!(codes, vec!["005930", "000660", "005935", "035720"]);
    }

    #[test]
    fn excludes_keyword_names_regardless_of_status() {
        let broker = broker();
        let catalog = SymbolCatalog::new(&broker);

        assert_eq!(
            catalog.is_eligible("005935", "삼성전자우"),
            Eligibility::ExcludedKeyword("우")
        );
        for keyword in EXCLUDED_KEYWORDS {
            let name = format!("테스트{keyword}상품");
            assert!(!catalog.is_eligible("005930", &name).is_eligible(), "{name}");
        }
        assert_eq!(
            catalog.is_eligible("069500", "KODEX 200 ETF"),
            Eligibility::ExcludedKeyword("ETF")
        );
    }

    #[test]
    fn excludes_suspended_symbols() {
        let broker = broker();
        let catalog = SymbolCatalog::new(&broker);

        match catalog.is_eligible("000660", "SK하이닉스") {
            Eligibility::Suspended(state) => assert!(state.contains("거래정지")),
            other => panic!("unexpected eligibility: {other:?}"),
        }
        assert!(catalog.is_eligible("005930", "삼성전자").is_eligible());
    }

    #[test]
    fn builds_symbol_with_live_status() {
        let broker = broker();
        let catalog = SymbolCatalog::new(&broker);

        let symbol = catalog.symbol("000660");
        assert_eq!(symbol.name, "SK하이닉스");
        assert!(!symbol.tradable);
        assert!(catalog.symbol("005930").tradable);
    }

    #[test]
    fn resolves_name_and_eligibility_together() {
        let broker = broker();
        let catalog = SymbolCatalog::new(&broker);

        let (symbol, eligibility) = catalog.resolve("005935");
        assert_eq!(symbol.code, "005935");
        assert_eq!(symbol.name, "삼성전자우");
        assert!(!symbol.tradable);
        assert_eq!(eligibility, Eligibility::ExcludedKeyword("우"));
    }

    #[test]
    fn loads_bundled_universe_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/universe/sample.csv");
        let codes = load_universe(&path).expect("load universe");

        assert!(!codes.is_empty());
        assert_eq!(codes[0], "005930");
    }
}
