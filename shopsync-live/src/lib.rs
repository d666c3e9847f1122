//! Live sync: push the theme once, then upload local edits as they happen.

mod error;
mod runtime;

pub use error::LiveError;
pub use runtime::{run, ContentIndex, Debouncer, LiveSession, DEBOUNCE_WINDOW};
