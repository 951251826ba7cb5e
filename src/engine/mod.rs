mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;
mod transitions;

pub use availability::{
    available_slots, day_windows, enumerate_slot_starts, merge_overlapping, resolve_day_windows,
    slot_is_available, SlotStarts,
};
pub use error::{EngineError, Entity, ErrorKind};
pub use transitions::{legal_actions, BookingAction, Party};

use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::warn;

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::model::*;
use crate::ports::{BookingStore, Notifier, ScheduleRepository, ServiceLookup, StoreError};

/// The booking lifecycle manager. Stateless apart from per-service write locks;
/// every decision is made against freshly loaded records.
pub struct BookingEngine {
    schedules: Arc<dyn ScheduleRepository>,
    bookings: Arc<dyn BookingStore>,
    services: Arc<dyn ServiceLookup>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    /// Serializes check-then-save per service inside this process.
    write_locks: DashMap<ServiceId, Arc<Mutex<()>>>,
}

impl BookingEngine {
    pub fn new(
        schedules: Arc<dyn ScheduleRepository>,
        bookings: Arc<dyn BookingStore>,
        services: Arc<dyn ServiceLookup>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            schedules,
            bookings,
            services,
            notifier,
            clock: Arc::new(SystemClock),
            config,
            write_locks: DashMap::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Run one adapter call under the configured timeout. Dropping the future on
    /// timeout is safe: each transition issues its only write last.
    pub(super) async fn call<T>(
        &self,
        what: &'static str,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, EngineError> {
        match tokio::time::timeout(self.config.adapter_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(EngineError::Timeout(what)),
        }
    }

    pub(super) fn service_lock(&self, service_id: ServiceId) -> Arc<Mutex<()>> {
        self.write_locks.entry(service_id).or_default().clone()
    }

    pub(super) async fn load_service(&self, service_id: ServiceId) -> Result<ServiceInfo, EngineError> {
        self.call("service lookup", self.services.get_by_id(service_id))
            .await?
            .ok_or(EngineError::NotFound(Entity::Service, service_id))
    }

    pub(super) async fn load_booking(&self, booking_id: BookingId) -> Result<Booking, EngineError> {
        self.call("booking lookup", self.bookings.get_by_id(booking_id))
            .await?
            .ok_or(EngineError::NotFound(Entity::Booking, booking_id))
    }

    /// Weekly hours plus the overrides dated within `[from, to]`.
    pub(super) async fn load_snapshot(
        &self,
        service_id: ServiceId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ScheduleSnapshot, EngineError> {
        let weekly = self
            .call("weekly schedule", self.schedules.get_weekly(service_id))
            .await?;
        let mut overrides = self
            .call("overrides", self.schedules.list_overrides(service_id))
            .await?;
        overrides.retain(|o| o.date >= from && o.date <= to);
        Ok(ScheduleSnapshot::new(weekly, overrides))
    }

    pub(super) async fn occupied_on(
        &self,
        service: &ServiceInfo,
        date: NaiveDate,
        exclude: Option<BookingId>,
    ) -> Result<Vec<Span>, EngineError> {
        let bookings = self
            .call("active bookings", self.bookings.get_active_bookings(service.id, date))
            .await?;
        Ok(conflict::occupied_spans(&bookings, service.duration_minutes, exclude))
    }

    /// Post-commit notification. Failures are logged and swallowed.
    pub(super) async fn dispatch(&self, event: BookingEvent) {
        let result = tokio::time::timeout(self.config.adapter_timeout, async {
            match &event {
                BookingEvent::Created { booking } => self.notifier.on_created(booking).await,
                BookingEvent::Confirmed { booking } => self.notifier.on_confirmed(booking).await,
                BookingEvent::Declined { booking } => self.notifier.on_declined(booking).await,
                BookingEvent::Cancelled { booking, by_provider } => {
                    self.notifier.on_cancelled(booking, *by_provider).await
                }
                BookingEvent::Rescheduled { booking, old_start } => {
                    self.notifier.on_rescheduled(booking, *old_start).await
                }
            }
        })
        .await;
        let failure = match result {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(_) => "notifier timed out".to_string(),
        };
        metrics::counter!(crate::observability::NOTIFY_FAILURES_TOTAL).increment(1);
        warn!(
            booking_id = %event.booking().id,
            "notification dropped: {failure}"
        );
    }
}
