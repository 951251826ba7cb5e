use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::availability::{available_slots, slot_is_available};
use super::conflict::truncate_to_minute;
use super::error::Entity;
use super::{BookingEngine, EngineError};

impl BookingEngine {
    /// Free slot starts on `date`, in chronological order. A closed day or an
    /// inactive service yields an empty list, never an error.
    pub async fn get_available_slots(
        &self,
        service_id: ServiceId,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<TimeOfDay>, EngineError> {
        metrics::counter!(observability::SLOT_QUERIES_TOTAL, "query" => "day").increment(1);
        let service = self.load_service(service_id).await?;
        if !service.is_active {
            return Ok(Vec::new());
        }
        let snapshot = self.load_snapshot(service_id, date, date).await?;
        let occupied = self.occupied_on(&service, date, None).await?;
        let slots = available_slots(&snapshot, date, service.duration_minutes, &occupied, now);
        debug!("{} free slots on service {service_id} for {date}", slots.len());
        Ok(slots)
    }

    /// Whether `[start, start + duration)` could be booked right now. Seconds are
    /// dropped from `start` the same way `create_booking` drops them.
    pub async fn is_slot_available(
        &self,
        service_id: ServiceId,
        start: NaiveDateTime,
        duration_minutes: u32,
        now: NaiveDateTime,
    ) -> Result<bool, EngineError> {
        metrics::counter!(observability::SLOT_QUERIES_TOTAL, "query" => "check").increment(1);
        let service = self.load_service(service_id).await?;
        if !service.is_active {
            return Ok(false);
        }
        let start = truncate_to_minute(start);
        let date = start.date();
        let snapshot = self.load_snapshot(service_id, date, date).await?;
        let occupied = self.occupied_on(&service, date, None).await?;
        Ok(slot_is_available(&snapshot, start, duration_minutes, &occupied, now))
    }

    /// Free slots for every date in `[from, to]`. Dates without any free slot are omitted.
    pub async fn get_available_slots_range(
        &self,
        service_id: ServiceId,
        from: NaiveDate,
        to: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<BTreeMap<NaiveDate, Vec<TimeOfDay>>, EngineError> {
        if to < from || (to - from).num_days() >= MAX_QUERY_DAYS {
            return Err(EngineError::LimitExceeded("query window too wide"));
        }
        metrics::counter!(observability::SLOT_QUERIES_TOTAL, "query" => "range").increment(1);
        let service = self.load_service(service_id).await?;
        let mut out = BTreeMap::new();
        if !service.is_active {
            return Ok(out);
        }

        let snapshot = self.load_snapshot(service_id, from, to).await?;
        for date in from.iter_days().take_while(|d| *d <= to) {
            if now.date() > date {
                continue;
            }
            let occupied = self.occupied_on(&service, date, None).await?;
            let slots = available_slots(&snapshot, date, service.duration_minutes, &occupied, now);
            if !slots.is_empty() {
                out.insert(date, slots);
            }
        }
        Ok(out)
    }

    /// True iff the customer has at least one completed booking with the service.
    pub async fn has_completed_booking(
        &self,
        customer_id: UserId,
        service_id: ServiceId,
    ) -> Result<bool, EngineError> {
        let bookings = self
            .call("customer bookings", self.bookings.list_by_customer(customer_id))
            .await?;
        Ok(bookings
            .iter()
            .any(|b| b.service_id == service_id && b.status == BookingStatus::Completed))
    }

    /// A booking, visible only to its customer and the service's provider.
    pub async fn get_booking(&self, caller: UserId, booking_id: BookingId) -> Result<Booking, EngineError> {
        let booking = self.load_booking(booking_id).await?;
        if booking.customer_id == caller {
            return Ok(booking);
        }
        let service = self.load_service(booking.service_id).await?;
        if service.owner_id == caller {
            return Ok(booking);
        }
        Err(EngineError::Unauthorized {
            entity: Entity::Booking,
            id: booking_id,
        })
    }

    /// The caller's own bookings, ordered by start.
    pub async fn list_customer_bookings(&self, caller: UserId) -> Result<Vec<Booking>, EngineError> {
        let mut bookings = self
            .call("customer bookings", self.bookings.list_by_customer(caller))
            .await?;
        bookings.sort_by_key(|b| (b.start, b.id));
        Ok(bookings)
    }

    /// All bookings on a service, ordered by start. Provider only.
    pub async fn list_service_bookings(
        &self,
        caller: UserId,
        service_id: ServiceId,
    ) -> Result<Vec<Booking>, EngineError> {
        let service = self.load_service(service_id).await?;
        if service.owner_id != caller {
            return Err(EngineError::Unauthorized {
                entity: Entity::Service,
                id: service_id,
            });
        }
        let mut bookings = self
            .call("service bookings", self.bookings.list_by_service(service_id))
            .await?;
        bookings.sort_by_key(|b| (b.start, b.id));
        Ok(bookings)
    }

    pub async fn get_weekly_schedule(&self, service_id: ServiceId) -> Result<WeeklySchedule, EngineError> {
        self.load_service(service_id).await?;
        self.call("weekly schedule", self.schedules.get_weekly(service_id))
            .await
    }

    /// Overrides ordered by date.
    pub async fn list_overrides(&self, service_id: ServiceId) -> Result<Vec<ScheduleOverride>, EngineError> {
        self.load_service(service_id).await?;
        let mut overrides = self
            .call("overrides", self.schedules.list_overrides(service_id))
            .await?;
        overrides.sort_by_key(|o| o.date);
        Ok(overrides)
    }
}
