//! Hover-driven summarization
//!
//! [`HoverSession`] holds the state of the single active hover and its epoch;
//! [`Orchestrator`] reacts to pointer events and runs the
//! resolve → extract → summarize → render cycle.

pub mod orchestrator;
pub mod session;

pub use orchestrator::{anchor_slug, in_page_key, Collaborators, Orchestrator};
pub use session::{Epoch, HoverSession, SessionState};
