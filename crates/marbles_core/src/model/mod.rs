//! Stored record types.

mod marble;
mod private;

pub use marble::Marble;
pub use private::MarblePrivateDetails;
