//! Interfaces to the collaborators this engine does not own.
//!
//! Persistence, service metadata and notification delivery live behind these
//! traits. Every method may be slow or fail; the engine wraps each call in a
//! timeout and only ever issues a single write per state transition.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::model::*;

/// Failure reported by a storage adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Failure reported by a notification channel. Never fails a transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Weekly hours and date overrides per service.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Weekly hours for a service; a service without stored hours is closed every day.
    async fn get_weekly(&self, service_id: ServiceId) -> Result<WeeklySchedule, StoreError>;

    /// Replace the whole weekly schedule. There are no partial edits.
    async fn replace_weekly(
        &self,
        service_id: ServiceId,
        schedule: &WeeklySchedule,
        caller: UserId,
    ) -> Result<(), StoreError>;

    async fn list_overrides(&self, service_id: ServiceId) -> Result<Vec<ScheduleOverride>, StoreError>;

    async fn get_override(&self, override_id: OverrideId) -> Result<Option<ScheduleOverride>, StoreError>;

    async fn add_override(
        &self,
        service_id: ServiceId,
        schedule_override: &ScheduleOverride,
        caller: UserId,
    ) -> Result<(), StoreError>;

    async fn delete_override(&self, override_id: OverrideId, caller: UserId) -> Result<(), StoreError>;
}

/// Booking persistence. Bookings are saved whole and never deleted.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Bookings on `date` whose status still occupies a slot.
    async fn get_active_bookings(
        &self,
        service_id: ServiceId,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError>;

    async fn get_by_id(&self, booking_id: BookingId) -> Result<Option<Booking>, StoreError>;

    /// Insert or overwrite by id.
    async fn save(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn list_by_customer(&self, customer_id: UserId) -> Result<Vec<Booking>, StoreError>;

    async fn list_by_service(&self, service_id: ServiceId) -> Result<Vec<Booking>, StoreError>;

    /// Confirmed bookings whose start is at or before `at`.
    async fn list_confirmed_started_before(&self, at: NaiveDateTime) -> Result<Vec<Booking>, StoreError>;
}

#[async_trait]
pub trait ServiceLookup: Send + Sync {
    async fn get_by_id(&self, service_id: ServiceId) -> Result<Option<ServiceInfo>, StoreError>;
}

/// Post-commit lifecycle hooks. Each receives the booking as committed.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tell both the customer and the provider about a new request.
    async fn on_created(&self, booking: &Booking) -> Result<(), NotifyError>;

    async fn on_confirmed(&self, booking: &Booking) -> Result<(), NotifyError>;

    async fn on_declined(&self, booking: &Booking) -> Result<(), NotifyError>;

    /// Notify the party that did *not* cancel.
    async fn on_cancelled(&self, booking: &Booking, by_provider: bool) -> Result<(), NotifyError>;

    async fn on_rescheduled(&self, booking: &Booking, old_start: NaiveDateTime) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_are_object_safe() {
        fn _schedules(_: &dyn ScheduleRepository) {}
        fn _bookings(_: &dyn BookingStore) {}
        fn _services(_: &dyn ServiceLookup) {}
        fn _notifier(_: &dyn Notifier) {}
    }
}
