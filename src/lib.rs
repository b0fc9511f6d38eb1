pub mod app;
pub mod assemble;
pub mod config;
pub mod connectivity;
pub mod document;
pub mod domain;
pub mod error;
pub mod esi;
pub mod fetch;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod server;
pub mod service;
pub mod store;
pub mod svg;
