pub mod clock;
pub mod types;

pub use clock::*;
pub use types::*;
