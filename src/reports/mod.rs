//! Read-side reports computed on request from the document feeds

pub mod aging;
pub mod cash_events;
pub mod cash_position;

pub use aging::*;
pub use cash_events::*;
pub use cash_position::*;
