pub mod confidence;
pub mod freshness;
pub mod market_scope;
pub mod run_status;
pub mod signal_metadata;
pub mod source_class;
pub mod verdict;
