//! Authorization decisions.
//!
//! [`resolve`] answers "what may this actor do with this item" from explicit
//! grant rows; [`allows`] answers "may this actor perform this kind of action
//! at all" from role and staff capability flags. Both are pure.

mod gate;
mod resolver;

pub use gate::{Action, allows};
pub use resolver::{resolve, resolve_note_access, resolve_report_access};
