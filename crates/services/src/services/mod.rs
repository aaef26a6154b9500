pub mod access;
pub mod admin;
pub mod ai_gateway;
pub mod appearance;
pub mod assistant;
pub mod config;
pub mod database_validator;
pub mod gemini_api;
pub mod history;
pub mod session;
pub mod sheets;
