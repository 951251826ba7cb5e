//! In-process implementation of every storage port. Used by the dev binary and
//! the test suites; a real deployment plugs in its own adapters.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use dashmap::DashMap;

use crate::model::*;
use crate::ports::{BookingStore, ScheduleRepository, ServiceLookup, StoreError};

pub struct InMemoryStore {
    services: DashMap<ServiceId, ServiceInfo>,
    weekly: DashMap<ServiceId, WeeklySchedule>,
    overrides: DashMap<OverrideId, ScheduleOverride>,
    bookings: DashMap<BookingId, Booking>,
    by_service: DashMap<ServiceId, Vec<BookingId>>,
    by_customer: DashMap<UserId, Vec<BookingId>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
            weekly: DashMap::new(),
            overrides: DashMap::new(),
            bookings: DashMap::new(),
            by_service: DashMap::new(),
            by_customer: DashMap::new(),
        }
    }

    // ── Services ─────────────────────────────────────────────

    /// Insert or replace a service record.
    pub fn register_service(&self, service: ServiceInfo) {
        self.services.insert(service.id, service);
    }

    pub fn set_active(&self, service_id: ServiceId, is_active: bool) {
        if let Some(mut svc) = self.services.get_mut(&service_id) {
            svc.is_active = is_active;
        }
    }

    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    fn collect(&self, ids: Option<Vec<BookingId>>) -> Vec<Booking> {
        ids.unwrap_or_default()
            .iter()
            .filter_map(|id| self.bookings.get(id).map(|b| b.value().clone()))
            .collect()
    }
}

#[async_trait]
impl ServiceLookup for InMemoryStore {
    async fn get_by_id(&self, service_id: ServiceId) -> Result<Option<ServiceInfo>, StoreError> {
        Ok(self.services.get(&service_id).map(|s| s.value().clone()))
    }
}

#[async_trait]
impl ScheduleRepository for InMemoryStore {
    async fn get_weekly(&self, service_id: ServiceId) -> Result<WeeklySchedule, StoreError> {
        Ok(self
            .weekly
            .get(&service_id)
            .map(|w| w.value().clone())
            .unwrap_or_default())
    }

    async fn replace_weekly(
        &self,
        service_id: ServiceId,
        schedule: &WeeklySchedule,
        _caller: UserId,
    ) -> Result<(), StoreError> {
        self.weekly.insert(service_id, schedule.clone());
        Ok(())
    }

    async fn list_overrides(&self, service_id: ServiceId) -> Result<Vec<ScheduleOverride>, StoreError> {
        Ok(self
            .overrides
            .iter()
            .filter(|o| o.service_id == service_id)
            .map(|o| o.value().clone())
            .collect())
    }

    async fn get_override(&self, override_id: OverrideId) -> Result<Option<ScheduleOverride>, StoreError> {
        Ok(self.overrides.get(&override_id).map(|o| o.value().clone()))
    }

    async fn add_override(
        &self,
        service_id: ServiceId,
        schedule_override: &ScheduleOverride,
        _caller: UserId,
    ) -> Result<(), StoreError> {
        // (service_id, date) is unique, like the constraint a database adapter would carry.
        let taken = self
            .overrides
            .iter()
            .any(|o| o.service_id == service_id && o.date == schedule_override.date);
        if taken {
            return Err(StoreError::new(format!(
                "override already exists for {}",
                schedule_override.date
            )));
        }
        self.overrides
            .insert(schedule_override.id, schedule_override.clone());
        Ok(())
    }

    async fn delete_override(&self, override_id: OverrideId, _caller: UserId) -> Result<(), StoreError> {
        self.overrides.remove(&override_id);
        Ok(())
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn get_active_bookings(
        &self,
        service_id: ServiceId,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        let ids = self.by_service.get(&service_id).map(|e| e.value().clone());
        Ok(self
            .collect(ids)
            .into_iter()
            .filter(|b| b.date() == date && b.status.occupies_slot())
            .collect())
    }

    async fn get_by_id(&self, booking_id: BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.get(&booking_id).map(|b| b.value().clone()))
    }

    async fn save(&self, booking: &Booking) -> Result<(), StoreError> {
        let previous = self.bookings.insert(booking.id, booking.clone());
        if previous.is_none() {
            self.by_service
                .entry(booking.service_id)
                .or_default()
                .push(booking.id);
            self.by_customer
                .entry(booking.customer_id)
                .or_default()
                .push(booking.id);
        }
        Ok(())
    }

    async fn list_by_customer(&self, customer_id: UserId) -> Result<Vec<Booking>, StoreError> {
        let ids = self.by_customer.get(&customer_id).map(|e| e.value().clone());
        Ok(self.collect(ids))
    }

    async fn list_by_service(&self, service_id: ServiceId) -> Result<Vec<Booking>, StoreError> {
        let ids = self.by_service.get(&service_id).map(|e| e.value().clone());
        Ok(self.collect(ids))
    }

    async fn list_confirmed_started_before(&self, at: NaiveDateTime) -> Result<Vec<Booking>, StoreError> {
        let mut due: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Confirmed && b.start <= at)
            .map(|b| b.value().clone())
            .collect();
        due.sort_by_key(|b| b.start);
        Ok(due)
    }
}
