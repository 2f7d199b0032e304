//! Shop service: users, categories and billing.

mod billing;
mod handlers;
mod models;

pub use handlers::*;
