pub mod event_type;
pub mod registry;
pub mod trampoline;
