mod client;
mod handlers;
mod models;
mod state;
mod translate;

pub use client::run_client;
pub use handlers::run_server;
