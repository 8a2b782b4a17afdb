pub mod account_service;
pub mod auth;
pub mod clock;
pub mod store;
pub mod token_service;
