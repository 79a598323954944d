//! Shared test support: mock service implementations and fixture builders

pub mod mocks;
pub mod utils;
