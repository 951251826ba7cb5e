use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::availability::slot_is_available;
use super::conflict::{truncate_to_minute, validate_notes, validate_segment_count};
use super::error::Entity;
use super::transitions::{self, authorize, BookingAction, Party};
use super::{BookingEngine, EngineError};

impl BookingEngine {
    // ── Booking lifecycle ────────────────────────────────────

    /// Request a slot. The booking starts out `Pending`.
    pub async fn create_booking(
        &self,
        customer: UserId,
        service_id: ServiceId,
        start: NaiveDateTime,
        notes: Option<String>,
    ) -> Result<Booking, EngineError> {
        validate_notes(notes.as_deref())?;
        let start = truncate_to_minute(start);

        let lock = self.service_lock(service_id);
        let _guard = lock.lock().await;

        let service = self.load_service(service_id).await?;
        if !service.is_active {
            return Err(EngineError::ServiceInactive(service_id));
        }
        let now = self.now();
        self.ensure_slot_free(&service, start, None, now).await?;

        let booking = Booking::new(service_id, customer, start, notes, now);
        self.call("booking save", self.bookings.save(&booking)).await?;
        drop(_guard);

        record_transition("create", booking.status);
        info!("booking {} created on service {service_id} at {start}", booking.id);
        self.dispatch(BookingEvent::Created {
            booking: booking.clone(),
        })
        .await;
        Ok(booking)
    }

    /// Move a booking to a new start. Only the booking's customer may do this.
    pub async fn reschedule_booking(
        &self,
        caller: UserId,
        booking_id: BookingId,
        new_start: NaiveDateTime,
        notes: Option<String>,
    ) -> Result<Booking, EngineError> {
        validate_notes(notes.as_deref())?;
        let new_start = truncate_to_minute(new_start);

        let service_id = self.load_booking(booking_id).await?.service_id;
        let lock = self.service_lock(service_id);
        let _guard = lock.lock().await;

        let booking = self.load_booking(booking_id).await?;
        let service = self.load_service(booking.service_id).await?;
        authorize(BookingAction::Reschedule, Actor::User(caller), &booking, &service)?;
        let now = self.now();
        let moved = transitions::reschedule(&booking, new_start, notes, now)?;
        if !service.is_active {
            return Err(EngineError::ServiceInactive(service.id));
        }
        self.ensure_slot_free(&service, new_start, Some(booking.id), now)
            .await?;

        self.call("booking save", self.bookings.save(&moved)).await?;
        drop(_guard);

        record_transition(BookingAction::Reschedule.as_str(), moved.status);
        info!(
            "booking {booking_id} rescheduled from {} to {}",
            booking.start, moved.start
        );
        self.dispatch(BookingEvent::Rescheduled {
            booking: moved.clone(),
            old_start: booking.start,
        })
        .await;
        Ok(moved)
    }

    pub async fn confirm_booking(&self, caller: UserId, booking_id: BookingId) -> Result<Booking, EngineError> {
        let (booking, _) = self
            .transition(Actor::User(caller), booking_id, BookingAction::Confirm, transitions::confirm)
            .await?;
        self.dispatch(BookingEvent::Confirmed {
            booking: booking.clone(),
        })
        .await;
        Ok(booking)
    }

    pub async fn decline_booking(&self, caller: UserId, booking_id: BookingId) -> Result<Booking, EngineError> {
        let (booking, _) = self
            .transition(Actor::User(caller), booking_id, BookingAction::Decline, transitions::decline)
            .await?;
        self.dispatch(BookingEvent::Declined {
            booking: booking.clone(),
        })
        .await;
        Ok(booking)
    }

    /// Cancel as either side. Only the other side is notified.
    pub async fn cancel_booking(&self, caller: UserId, booking_id: BookingId) -> Result<Booking, EngineError> {
        let (booking, party) = self
            .transition(Actor::User(caller), booking_id, BookingAction::Cancel, transitions::cancel)
            .await?;
        self.dispatch(BookingEvent::Cancelled {
            booking: booking.clone(),
            by_provider: party == Party::Provider,
        })
        .await;
        Ok(booking)
    }

    /// Mark a confirmed, started booking as completed. No notification is sent.
    pub async fn complete_booking(&self, actor: Actor, booking_id: BookingId) -> Result<Booking, EngineError> {
        let (booking, _) = self
            .transition(actor, booking_id, BookingAction::Complete, transitions::complete)
            .await?;
        Ok(booking)
    }

    /// Complete every confirmed booking whose start has passed, acting as the system.
    /// Bookings that fail (e.g. cancelled in the meantime) are skipped.
    pub async fn complete_elapsed(&self) -> Result<Vec<BookingId>, EngineError> {
        let now = self.now();
        let due = self
            .call("due bookings", self.bookings.list_confirmed_started_before(now))
            .await?;
        let mut completed = Vec::with_capacity(due.len());
        for booking in due {
            match self.complete_booking(Actor::System, booking.id).await {
                Ok(b) => completed.push(b.id),
                Err(e) => debug!("completion skip {}: {e}", booking.id),
            }
        }
        metrics::counter!(observability::COMPLETIONS_SWEPT_TOTAL).increment(completed.len() as u64);
        Ok(completed)
    }

    /// Status-only transitions: load fresh under the service lock, authorize
    /// `action`, then save what `apply` produces.
    async fn transition(
        &self,
        actor: Actor,
        booking_id: BookingId,
        action: BookingAction,
        apply: StatusTransition,
    ) -> Result<(Booking, Party), EngineError> {
        let service_id = self.load_booking(booking_id).await?.service_id;
        let lock = self.service_lock(service_id);
        let _guard = lock.lock().await;

        let booking = self.load_booking(booking_id).await?;
        let service = self.load_service(booking.service_id).await?;
        let party = authorize(action, actor, &booking, &service)?;
        let now = self.now();
        let next = apply(&booking, now)?;

        self.call("booking save", self.bookings.save(&next)).await?;
        record_transition(action.as_str(), next.status);
        info!(
            "booking {booking_id}: {} -> {} ({action} by {party:?})",
            booking.status, next.status
        );
        Ok((next, party))
    }

    async fn ensure_slot_free(
        &self,
        service: &ServiceInfo,
        start: NaiveDateTime,
        exclude: Option<BookingId>,
        now: NaiveDateTime,
    ) -> Result<(), EngineError> {
        let date = start.date();
        let snapshot = self.load_snapshot(service.id, date, date).await?;
        let occupied = self.occupied_on(service, date, exclude).await?;
        if slot_is_available(&snapshot, start, service.duration_minutes, &occupied, now) {
            return Ok(());
        }
        metrics::counter!(observability::SLOT_CONFLICTS_TOTAL).increment(1);
        debug!("slot {start} on service {} rejected", service.id);
        Err(EngineError::SlotUnavailable {
            service_id: service.id,
            start,
        })
    }

    // ── Schedule administration ──────────────────────────────

    async fn owned_service(&self, caller: UserId, service_id: ServiceId) -> Result<ServiceInfo, EngineError> {
        let service = self.load_service(service_id).await?;
        if service.owner_id != caller {
            return Err(EngineError::Unauthorized {
                entity: Entity::Service,
                id: service_id,
            });
        }
        Ok(service)
    }

    /// Replace the weekly hours wholesale.
    pub async fn replace_weekly_schedule(
        &self,
        caller: UserId,
        service_id: ServiceId,
        schedule: WeeklySchedule,
    ) -> Result<(), EngineError> {
        self.owned_service(caller, service_id).await?;
        for day in schedule.days() {
            validate_segment_count(day)?;
        }
        self.call(
            "replace weekly schedule",
            self.schedules.replace_weekly(service_id, &schedule, caller),
        )
        .await?;
        info!("weekly schedule replaced on service {service_id}");
        Ok(())
    }

    /// Add a date override. At most one override may exist per date.
    pub async fn add_override(
        &self,
        caller: UserId,
        schedule_override: ScheduleOverride,
    ) -> Result<ScheduleOverride, EngineError> {
        let service_id = schedule_override.service_id;
        self.owned_service(caller, service_id).await?;
        validate_segment_count(schedule_override.segments())?;

        let lock = self.service_lock(service_id);
        let _guard = lock.lock().await;
        let existing = self
            .call("overrides", self.schedules.list_overrides(service_id))
            .await?;
        if existing.iter().any(|o| o.date == schedule_override.date) {
            return Err(EngineError::OverrideExists {
                service_id,
                date: schedule_override.date,
            });
        }
        if existing.len() >= MAX_OVERRIDES_PER_SERVICE {
            return Err(EngineError::LimitExceeded("too many overrides on service"));
        }

        self.call(
            "add override",
            self.schedules.add_override(service_id, &schedule_override, caller),
        )
        .await?;
        info!(
            "override {} added on service {service_id} for {}",
            schedule_override.id, schedule_override.date
        );
        Ok(schedule_override)
    }

    /// Remove an override; its date falls back to the weekly hours.
    pub async fn delete_override(&self, caller: UserId, override_id: OverrideId) -> Result<(), EngineError> {
        let existing = self
            .call("override lookup", self.schedules.get_override(override_id))
            .await?
            .ok_or(EngineError::NotFound(Entity::Override, override_id))?;
        self.owned_service(caller, existing.service_id).await?;
        self.call("delete override", self.schedules.delete_override(override_id, caller))
            .await?;
        info!("override {override_id} removed from service {}", existing.service_id);
        Ok(())
    }
}

type StatusTransition = fn(&Booking, NaiveDateTime) -> Result<Booking, EngineError>;

fn record_transition(action: &'static str, status: BookingStatus) {
    metrics::counter!(
        observability::TRANSITIONS_TOTAL,
        "action" => action,
        "status" => status.as_str()
    )
    .increment(1);
}
