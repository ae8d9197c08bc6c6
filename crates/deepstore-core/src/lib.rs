pub mod capacity;
pub mod diagnostics;
pub mod entry;
pub mod error;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
pub mod item;
pub mod map;
pub mod priority;
pub mod telemetry;

pub use capacity::*;
pub use diagnostics::*;
pub use entry::*;
pub use error::*;
pub use item::*;
pub use map::*;
pub use priority::*;
