pub mod config;
pub mod edge;
pub mod error;
pub mod eval;
pub mod export;
pub mod http_cache;
pub mod http_client;
pub mod margin_model;
pub mod odds;
pub mod odds_fetch;
pub mod rating;
pub mod rollup;
pub mod schedule_fetch;
pub mod schedule_store;
pub mod synthetic;
pub mod team_log;
pub mod teams;
