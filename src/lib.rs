mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod import;
    pub mod memory;
    pub mod pagination;
    pub mod pool;
    pub mod schema;
    pub mod store;
    pub mod validation;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod services {
    pub mod aggregator;
    pub mod composer;
    pub mod document;
    pub mod membership;
    pub mod recipes;
}
pub mod config;
mod constants;

mod cache {
    pub mod cache;
}

pub use authentication::*;
pub use cache::cache::*;
pub use constants::*;
pub use database::*;
pub use services::*;
