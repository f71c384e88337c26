pub mod document;
pub mod linkwatch;
pub mod session;

pub use document::*;
pub use linkwatch::*;
pub use session::*;
