#![allow(missing_docs)]

//! Authentication state shared across the front-end.

mod profile;
mod state;

pub use profile::UserProfile;
pub use state::{SessionSettings, SessionState};
