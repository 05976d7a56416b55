pub mod aggregate;
pub mod backtest;
pub mod config;
pub mod dataset;
pub mod ev;
pub mod fake_dataset;
pub mod goal_minutes;
pub mod historical_dataset;
pub mod label;
pub mod label_stats;
pub mod parquet_source;
pub mod projection;
pub mod report_export;
pub mod scenario;
pub mod source;
pub mod team_patterns;
