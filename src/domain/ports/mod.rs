pub mod quote_provider;
pub mod reasoning;
pub mod run_lock;
pub mod signal_repository;
pub mod source_gatherer;
pub mod ticker_universe;
