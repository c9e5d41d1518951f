mod access;
mod audit;
mod calendar;
pub mod dto;
mod files;
mod library;
pub mod response;
mod roster;
mod router;
mod session;
pub mod validation;

pub use router::{AppState, create_router};
