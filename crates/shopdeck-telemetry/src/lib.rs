pub mod log;
pub mod logging;

pub use log::*;
pub use logging::*;
