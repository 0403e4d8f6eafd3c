// SPDX-License-Identifier: Apache-2.0
//! Render-ready command results.
//!
//! The core hands the dispatcher structured values; turning them into the
//! protocol's text lines is the CLI's job.

use crate::time::Moment;

/// A user profile, as echoed by `query_profile` / `modify_profile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Login name.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Privilege level.
    pub privilege: i32,
}

/// One station row of a `query_train` answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    /// Station name.
    pub station: String,
    /// Arrival time; absent at the first station.
    pub arrive: Option<Moment>,
    /// Departure time; absent at the last station.
    pub depart: Option<Moment>,
    /// Cumulative price from the first station.
    pub price: i64,
    /// Seats remaining on the outgoing edge; absent at the last station.
    pub seats: Option<i32>,
}

/// A whole `query_train` answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainSchedule {
    /// Public train identifier.
    pub train_id: String,
    /// Train class letter.
    pub kind: char,
    /// One row per station, in travel order.
    pub rows: Vec<ScheduleRow>,
}

/// One bookable journey leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    /// Public train identifier.
    pub train_id: String,
    /// Departure station.
    pub from: String,
    /// Arrival station.
    pub to: String,
    /// Departure moment at `from`.
    pub depart: Moment,
    /// Arrival moment at `to`.
    pub arrive: Moment,
    /// Price over the leg (per seat, or a subtotal in order listings).
    pub price: i64,
    /// Seats: remaining in searches, purchased in order listings.
    pub seats: i32,
}

/// Outcome of `buy_ticket`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receipt {
    /// Seats were granted; total price of the order.
    Paid(i64),
    /// The order was enqueued pending seat returns.
    Enqueued,
}

/// One `query_order` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    /// `success`, `pending` or `refunded`.
    pub status: &'static str,
    /// The ordered leg; `price` carries the order subtotal and `seats` the
    /// purchased count.
    pub ticket: Ticket,
}

/// Structured result of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Success with no payload (`0`).
    Unit,
    /// A user profile line.
    Profile(Profile),
    /// A train timetable.
    Schedule(Box<TrainSchedule>),
    /// Direct journeys, already sorted.
    Tickets(Vec<Ticket>),
    /// Best one-transfer journey, if any.
    Transfer(Option<(Ticket, Ticket)>),
    /// Purchase outcome.
    Receipt(Receipt),
    /// The caller's orders, newest first.
    Orders(Vec<OrderSummary>),
    /// `exit` acknowledgement.
    Farewell,
}
