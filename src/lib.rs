pub mod config;
pub mod coordinator;
pub mod device;
pub mod entities;
pub mod error;
pub mod model;
pub mod routes;
pub mod server;
