pub mod documents;
pub mod error;
pub mod source;

pub use documents::*;
pub use error::*;
pub use source::*;
