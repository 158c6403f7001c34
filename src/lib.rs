pub mod config;
pub mod documents;
pub mod error;
pub mod jobs;
pub mod routes;
pub mod service;
pub mod state;
pub mod translate;
