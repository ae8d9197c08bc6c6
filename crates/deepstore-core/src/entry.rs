/// Call target the instrumented search routine is wired to. The capacity
/// guard exports it and the patcher's default landmarks call it.
pub const ENTRY_POINT_OWNER: &str = "capacity_guards::CapacityGuard";
pub const ENTRY_POINT_NAME: &str = "over_capacity";
