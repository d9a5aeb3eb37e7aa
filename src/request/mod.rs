//! Request side of the driver.
//!
//! # Data Flow
//! ```text
//! producer emits URL / options / arbitrary JSON
//!     → descriptor.rs (RequestDescriptor, namespace tagging)
//!     → translate.rs (validation, defaults, shorthand expansion)
//!     → call.rs (HttpCall handed to the transport)
//! ```

pub mod call;
pub mod descriptor;
pub mod options;
pub mod translate;

pub use call::{CallBody, Credentials, HttpCall};
pub use descriptor::RequestDescriptor;
pub use options::{Attachment, RequestOptions};
pub use translate::translate;
