pub mod client;
pub mod types;

pub use crate::shared::errors::ApiError;
pub use client::RestClient;
