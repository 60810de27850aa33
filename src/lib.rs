pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod repo;
pub mod service;
pub mod site;
pub mod telemetry;
