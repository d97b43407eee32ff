pub mod config;
mod error;
mod http_layers;
mod recommend;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::ErrorBody;
pub use http_layers::*;
pub use server::{make_app, run_server};
