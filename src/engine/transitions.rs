//! Booking state machine.
//!
//! ```text
//! Pending ──confirm──▶ Confirmed ──complete──▶ Completed
//!    │ └──decline──▶ Declined        │
//!    └─────cancel─────▶ Cancelled ◀──┘ cancel
//! ```
//!
//! Every transition is a pure function from the current booking to the next
//! one. Persistence and notification happen in the caller, after the fact.

use std::fmt;

use chrono::NaiveDateTime;

use crate::model::*;

use super::error::Entity;
use super::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingAction {
    Reschedule,
    Confirm,
    Decline,
    Cancel,
    Complete,
}

impl BookingAction {
    pub const ALL: [BookingAction; 5] = [
        BookingAction::Reschedule,
        BookingAction::Confirm,
        BookingAction::Decline,
        BookingAction::Cancel,
        BookingAction::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::Reschedule => "reschedule",
            BookingAction::Confirm => "confirm",
            BookingAction::Decline => "decline",
            BookingAction::Cancel => "cancel",
            BookingAction::Complete => "complete",
        }
    }

    /// Statuses this action may start from.
    pub fn allowed_from(&self) -> &'static [BookingStatus] {
        use BookingStatus::*;
        match self {
            BookingAction::Reschedule | BookingAction::Cancel => &[Pending, Confirmed],
            BookingAction::Confirm | BookingAction::Decline => &[Pending],
            BookingAction::Complete => &[Confirmed],
        }
    }
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions legal from `status`. Empty for terminal statuses.
pub fn legal_actions(status: BookingStatus) -> Vec<BookingAction> {
    BookingAction::ALL
        .into_iter()
        .filter(|a| a.allowed_from().contains(&status))
        .collect()
}

/// The side of the booking an actor is acting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Customer,
    Provider,
    System,
}

/// Resolve which party `actor` acts as for `action`, or refuse.
/// For cancel, a caller who is the booking's customer always acts as the customer.
pub fn authorize(
    action: BookingAction,
    actor: Actor,
    booking: &Booking,
    service: &ServiceInfo,
) -> Result<Party, EngineError> {
    let is_customer = actor == Actor::User(booking.customer_id);
    let is_provider = actor == Actor::User(service.owner_id);
    let party = match action {
        BookingAction::Reschedule if is_customer => Some(Party::Customer),
        BookingAction::Confirm | BookingAction::Decline if is_provider => Some(Party::Provider),
        BookingAction::Cancel if is_customer => Some(Party::Customer),
        BookingAction::Cancel if is_provider => Some(Party::Provider),
        BookingAction::Complete if is_provider => Some(Party::Provider),
        BookingAction::Complete if actor == Actor::System => Some(Party::System),
        _ => None,
    };
    party.ok_or(EngineError::Unauthorized {
        entity: Entity::Booking,
        id: booking.id,
    })
}

fn require(booking: &Booking, action: BookingAction) -> Result<(), EngineError> {
    if action.allowed_from().contains(&booking.status) {
        Ok(())
    } else {
        Err(EngineError::InvalidState {
            booking_id: booking.id,
            current: booking.status,
            action,
        })
    }
}

fn with_status(booking: &Booking, status: BookingStatus, now: NaiveDateTime) -> Booking {
    Booking {
        status,
        updated_at: now,
        ..booking.clone()
    }
}

pub fn confirm(booking: &Booking, now: NaiveDateTime) -> Result<Booking, EngineError> {
    require(booking, BookingAction::Confirm)?;
    Ok(with_status(booking, BookingStatus::Confirmed, now))
}

pub fn decline(booking: &Booking, now: NaiveDateTime) -> Result<Booking, EngineError> {
    require(booking, BookingAction::Decline)?;
    Ok(with_status(booking, BookingStatus::Declined, now))
}

pub fn cancel(booking: &Booking, now: NaiveDateTime) -> Result<Booking, EngineError> {
    require(booking, BookingAction::Cancel)?;
    Ok(with_status(booking, BookingStatus::Cancelled, now))
}

/// Confirmed and started. Status is checked before time.
pub fn complete(booking: &Booking, now: NaiveDateTime) -> Result<Booking, EngineError> {
    require(booking, BookingAction::Complete)?;
    if now < booking.start {
        return Err(EngineError::BookingTime {
            booking_id: booking.id,
            start: booking.start,
            now,
        });
    }
    Ok(with_status(booking, BookingStatus::Completed, now))
}

/// Move to `new_start`, keeping the status. `notes: None` keeps the existing notes.
/// Slot availability is the caller's concern.
pub fn reschedule(
    booking: &Booking,
    new_start: NaiveDateTime,
    notes: Option<String>,
    now: NaiveDateTime,
) -> Result<Booking, EngineError> {
    require(booking, BookingAction::Reschedule)?;
    Ok(Booking {
        start: new_start,
        notes: notes.or_else(|| booking.notes.clone()),
        updated_at: now,
        ..booking.clone()
    })
}
