pub mod app;
pub mod batch;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod github;
pub mod ingest;
pub mod outputs;
pub mod shared;
pub mod targeting;
