pub mod catalog;
pub mod quotes;

pub use catalog::{load_universe, Eligibility, Symbol, SymbolCatalog};
pub use quotes::{fetch_quote_listing, parse_quote_listing, QuoteRow};
