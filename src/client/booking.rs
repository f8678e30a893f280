//! Two-phase transport booking.
//!
//! [`BookingState::begin`] shows the booking immediately as
//! [`BookingPhase::PendingConfirmation`]. Once the server answers, either
//! [`BookingState::confirm`] swaps in the server record or
//! [`BookingState::rollback`] puts back whatever was active before.

use thiserror::Error;
use uuid::Uuid;

use super::logistics::Transport;
use crate::models::{LogisticsRequest, LogisticsStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingPhase {
    PendingConfirmation,
    Confirmed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("a booking is already awaiting confirmation")]
    AlreadyPending,
    #[error("no booking is awaiting confirmation")]
    NothingPending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveBooking {
    pub transport: Transport,
    pub pickup: String,
    pub delivery: String,
    pub phase: BookingPhase,
    /// Set once the server has accepted the booking.
    pub request_id: Option<Uuid>,
    pub status: Option<LogisticsStatus>,
}

impl ActiveBooking {
    pub fn pending(transport: Transport, pickup: impl Into<String>, delivery: impl Into<String>) -> Self {
        Self {
            transport,
            pickup: pickup.into(),
            delivery: delivery.into(),
            phase: BookingPhase::PendingConfirmation,
            request_id: None,
            status: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.phase == BookingPhase::Confirmed
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookingState {
    active: Option<ActiveBooking>,
    previous: Option<ActiveBooking>,
}

impl BookingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&ActiveBooking> {
        self.active.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        matches!(
            &self.active,
            Some(booking) if booking.phase == BookingPhase::PendingConfirmation
        )
    }

    pub fn begin(&mut self, booking: ActiveBooking) -> Result<(), BookingError> {
        if self.is_pending() {
            return Err(BookingError::AlreadyPending);
        }
        self.previous = self.active.replace(ActiveBooking {
            phase: BookingPhase::PendingConfirmation,
            ..booking
        });
        Ok(())
    }

    pub fn confirm(&mut self, request: &LogisticsRequest) -> Result<&ActiveBooking, BookingError> {
        if !self.is_pending() {
            return Err(BookingError::NothingPending);
        }
        self.previous = None;
        let booking = self.active.as_mut().ok_or(BookingError::NothingPending)?;
        booking.phase = BookingPhase::Confirmed;
        booking.request_id = Some(request.id);
        booking.status = Some(request.status);
        booking.transport.id = request.id.to_string();
        booking.transport.price = request.price;
        Ok(booking)
    }

    /// Returns `false` when nothing was pending.
    pub fn rollback(&mut self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.active = self.previous.take();
        true
    }

    pub fn clear(&mut self) {
        self.active = None;
        self.previous = None;
    }
}
