//! Stream primitives not covered by `futures-util`.

pub mod hold;

pub use hold::{Hold, HoldSink, HoldSubscription};
