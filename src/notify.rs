use async_trait::async_trait;
use chrono::NaiveDateTime;
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::*;
use crate::ports::{Notifier, NotifyError};

/// Broadcast hub: publishes every committed lifecycle event on a per-service channel.
pub struct NotifyHub {
    channels: DashMap<ServiceId, broadcast::Sender<BookingEvent>>,
    capacity: usize,
}

impl NotifyHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to events for a service. Creates the channel if needed.
    pub fn subscribe(&self, service_id: ServiceId) -> broadcast::Receiver<BookingEvent> {
        let sender = self
            .channels
            .entry(service_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        sender.subscribe()
    }

    /// Send an event. No-op if nobody is listening.
    pub fn send(&self, event: BookingEvent) {
        if let Some(sender) = self.channels.get(&event.booking().service_id) {
            let _ = sender.send(event);
        }
    }
}

#[async_trait]
impl Notifier for NotifyHub {
    async fn on_created(&self, booking: &Booking) -> Result<(), NotifyError> {
        self.send(BookingEvent::Created {
            booking: booking.clone(),
        });
        Ok(())
    }

    async fn on_confirmed(&self, booking: &Booking) -> Result<(), NotifyError> {
        self.send(BookingEvent::Confirmed {
            booking: booking.clone(),
        });
        Ok(())
    }

    async fn on_declined(&self, booking: &Booking) -> Result<(), NotifyError> {
        self.send(BookingEvent::Declined {
            booking: booking.clone(),
        });
        Ok(())
    }

    async fn on_cancelled(&self, booking: &Booking, by_provider: bool) -> Result<(), NotifyError> {
        self.send(BookingEvent::Cancelled {
            booking: booking.clone(),
            by_provider,
        });
        Ok(())
    }

    async fn on_rescheduled(&self, booking: &Booking, old_start: NaiveDateTime) -> Result<(), NotifyError> {
        self.send(BookingEvent::Rescheduled {
            booking: booking.clone(),
            old_start,
        });
        Ok(())
    }
}
