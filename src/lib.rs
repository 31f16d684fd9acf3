// Library surface shared by the `lingo` binary and the integration tests.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod import;
pub mod model;
pub mod practice;
pub mod runtime;
pub mod services;
pub mod stats;
pub mod store;
pub mod ui;
pub mod util;

pub use error::{Error, Result};
