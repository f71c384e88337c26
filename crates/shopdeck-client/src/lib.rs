pub mod error;
pub mod intercept;
pub mod ops;
pub mod poller;
pub mod slots;
pub mod token;
pub mod transport;

pub use error::*;
pub use intercept::*;
pub use ops::*;
pub use poller::*;
pub use slots::*;
pub use token::*;
pub use transport::*;
