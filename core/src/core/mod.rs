pub mod pipeline;
pub mod report_store;
pub mod run_summary;
pub mod throttle;
