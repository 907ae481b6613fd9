pub mod agent_run;
pub mod daily_report;
pub mod decision;
pub mod normalized_signal;
pub mod raw_signal;
pub mod scored_signal;
