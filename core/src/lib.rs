pub mod api;
pub mod cloud;
pub mod config;
pub mod context;
pub mod error;
pub mod local;
pub mod orchestrator;
pub mod output;
pub mod protocol;
pub mod request;
