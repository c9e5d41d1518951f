//! # Clubhouse
//!
//! An athlete-management server: rosters, schedules, medical and
//! performance reports, coach notes and a file-access audit log.
//! Usable as a standalone binary or as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! clubhouse = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use clubhouse::auth::TokenIssuer;
//! use clubhouse::config::ServerConfig;
//! use clubhouse::server::{AppState, create_router};
//! use clubhouse::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(&config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let tokens = TokenIssuer::from_secret_file(&config.secret_path()).unwrap();
//! let state = Arc::new(AppState::new(Arc::new(store), config, tokens).unwrap());
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): builds the `clubhouse` binary. Disable with `default-features = false`.

pub mod access;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
pub mod uploads;
pub mod wellness;
