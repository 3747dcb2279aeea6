#![warn(clippy::all, missing_docs)]

//! Core logic for the Portal terminal client.
//!
//! This crate hosts the session state shared by every screen, the debounced
//! search trigger, navigation and routing rules, form validation and the
//! small HTTP client used by the front-end.

pub mod api;
pub mod config;
pub mod debounce;
pub mod error;
pub mod forms;
pub mod nav;
pub mod router;
pub mod search;
pub mod session;
pub mod store;

pub use config::AppConfig;
pub use debounce::Debouncer;
pub use error::{PortalError, ValidationErrors};
pub use nav::NavLink;
pub use router::{Page, Router};
pub use search::SearchBox;
pub use session::{SessionState, UserProfile};
pub use store::{CookieJar, TokenStore};
