//! Response side of the driver.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor
//!     → stream.rs (ResponseStream: one call, replayed to every subscriber)
//!     → Transport::execute
//!     → message.rs (Response) | ResponseError
//! ```

pub mod message;
pub mod stream;

pub use message::Response;
pub use stream::{ResponseState, ResponseStream, ResponseSubscription};
