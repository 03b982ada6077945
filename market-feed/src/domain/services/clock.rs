use crate::domain::value_objects::Timestamp;

/// Source of instrument timestamps
///
/// The generator stamps every inserted or requoted instrument with
/// `Clock::now()`. Tests inject a fixed clock to get stable records.
pub trait Clock: Send + Sync {
    /// Get current time from this clock's perspective
    fn now(&self) -> Timestamp;
}
