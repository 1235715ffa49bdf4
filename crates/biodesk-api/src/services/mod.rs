//! Service layer for business logic.

pub mod lifecycle;

pub use lifecycle::RecordLifecycle;
