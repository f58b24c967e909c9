pub mod config;
pub mod domain;
pub mod gateway;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod state;
