//! Client-side state engine for the SWGBuddy resource tracker.
//!
//! Keeps a local resource cache consistent with the tracker server, validates
//! writes against the resource taxonomy and resolves per-server roles.

pub mod app;

pub mod shared {
    pub mod error;
    pub mod types {
        pub mod account;
        pub mod app;
    }
    pub mod util {
        pub mod config;
        pub mod handler;
        pub mod store;
    }
    pub mod handlers {
        pub mod debug_handler;
        pub mod http_handler;
    }
}

pub mod taxonomy {
    pub mod index;
    pub mod types;
}

pub mod resource {
    pub mod app;
    pub mod types;
    pub mod validation;
}

pub mod auth {
    pub mod permission;
}

pub mod sync {
    pub mod engine;
    pub mod poller;
}

pub mod query {
    pub mod pipeline;
    pub mod sort;
}

pub mod mutation {
    pub mod gateway;
    pub mod transaction;
}

pub mod admin {
    pub mod app;
    pub mod types;
}

pub use shared::error::{Error, Result};
