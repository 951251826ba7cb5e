pub mod clock;
pub mod completer;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod ports;
pub mod store;
