pub mod app;
pub mod config;
pub mod handlers;
pub mod security;
pub mod services;
pub mod state;
pub mod templates;
pub mod utils;

pub use app::build_router;
