pub mod catalog_store;
pub mod config;
pub mod contract;
pub mod core_service;
pub mod desktop_entry;
pub mod discovery;
pub mod icon_cache;
pub mod launcher;
pub mod logging;
pub mod model;
pub mod query_engine;
pub mod ranker;
pub mod reconcile;
pub mod search_history;
pub mod transport;
