pub mod app;
pub mod completion;
pub mod config;
pub mod control;
pub mod domain;
pub mod facts;
pub mod recovery;
pub mod report;
pub mod shared;
pub mod staleness;
pub mod store;
