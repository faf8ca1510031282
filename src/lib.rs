pub mod auth;
pub mod db;
pub mod error;
pub mod errors;
pub mod models;
pub mod object_id;
pub mod pagination;
pub mod server;
#[cfg(test)]
mod tests;
pub mod tracing_config;

pub use error::Error;
