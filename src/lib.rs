mod database {
    pub mod actions;
    pub mod catalog;
    pub mod error;
    pub mod form;
    pub mod membership;
    pub mod schema;
}
mod authentication {
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod api {
    pub mod handlers;
    pub mod routes;
    pub mod server;
}
mod constants;

pub mod cache {
    #[allow(clippy::module_inception)]
    mod cache;

    pub use self::cache::*;
}
pub mod config;
pub mod media;
pub mod shopping;
pub mod state;

pub use api::*;
pub use authentication::*;
pub use constants::*;
pub use database::*;
