mod guard;
mod verdict;

pub use deepstore_core::{ENTRY_POINT_NAME, ENTRY_POINT_OWNER};
pub use guard::CapacityGuard;
pub use verdict::Verdict;
