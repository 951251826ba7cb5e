use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use ulid::Ulid;

use crate::model::{BookingId, BookingStatus, ScheduleError, ServiceId};
use crate::ports::StoreError;

use super::transitions::BookingAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Service,
    Booking,
    Override,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Service => "service",
            Entity::Booking => "booking",
            Entity::Override => "schedule override",
        })
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not found: {1}")]
    NotFound(Entity, Ulid),
    #[error("caller is not an owner of {entity} {id}")]
    Unauthorized { entity: Entity, id: Ulid },
    #[error("cannot {action} booking {booking_id}: status is {current}")]
    InvalidState {
        booking_id: BookingId,
        current: BookingStatus,
        action: BookingAction,
    },
    #[error("slot at {start} is not available on service {service_id}")]
    SlotUnavailable {
        service_id: ServiceId,
        start: NaiveDateTime,
    },
    #[error("booking {booking_id} starts at {start}; not yet elapsed at {now}")]
    BookingTime {
        booking_id: BookingId,
        start: NaiveDateTime,
        now: NaiveDateTime,
    },
    #[error("invalid schedule: {0}")]
    InvalidSchedule(#[from] ScheduleError),
    #[error("service {0} is not accepting bookings")]
    ServiceInactive(ServiceId),
    #[error("service {service_id} already has an override on {date}")]
    OverrideExists {
        service_id: ServiceId,
        date: NaiveDate,
    },
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}

/// Coarse classification the boundary layer maps onto its transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Authorization,
    InvalidState,
    SlotUnavailable,
    BookingTime,
    InvalidSchedule,
    LimitExceeded,
    Conflict,
    Unavailable,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound(..) => ErrorKind::NotFound,
            EngineError::Unauthorized { .. } => ErrorKind::Authorization,
            EngineError::InvalidState { .. } => ErrorKind::InvalidState,
            EngineError::SlotUnavailable { .. } | EngineError::ServiceInactive(_) => {
                ErrorKind::SlotUnavailable
            }
            EngineError::BookingTime { .. } => ErrorKind::BookingTime,
            EngineError::InvalidSchedule(_) => ErrorKind::InvalidSchedule,
            EngineError::LimitExceeded(_) => ErrorKind::LimitExceeded,
            EngineError::OverrideExists { .. } => ErrorKind::Conflict,
            EngineError::Store(_) | EngineError::Timeout(_) => ErrorKind::Unavailable,
        }
    }
}
