//! Data layer of the enrollment admin dashboard: live store subscriptions,
//! record normalization and the derived views the dashboard renders.

pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod normalize;
pub mod services;
pub mod store;
pub mod view;

pub use error::AppError;
pub use services::{Dashboard, ViewSession};
