// SPDX-License-Identifier: Apache-2.0
//! Parsed command payloads.
//!
//! The tokenizer in the CLI crate produces these; the core validates the
//! domain constraints (lengths, character sets, calendar bounds on derived
//! dates) itself, so the payloads carry plain strings and value types.

use crate::time::{Date, Duration, Instant};

/// Result ordering for journey queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Shortest journey first.
    #[default]
    Time,
    /// Cheapest journey first.
    Cost,
}

/// `add_user` payload.
#[derive(Debug, Clone)]
pub struct AddUser {
    /// Acting user (`-c`); absent only for the bootstrap user.
    pub current_user: Option<String>,
    /// New login name (`-u`).
    pub username: String,
    /// New password (`-p`).
    pub password: String,
    /// New display name (`-n`).
    pub name: String,
    /// New contact address (`-m`).
    pub email: String,
    /// Privilege to grant (`-g`); required except for the bootstrap user.
    pub privilege: Option<i32>,
}

/// `login` payload.
#[derive(Debug, Clone)]
pub struct Login {
    /// Login name (`-u`).
    pub username: String,
    /// Password (`-p`).
    pub password: String,
}

/// `logout` payload.
#[derive(Debug, Clone)]
pub struct Logout {
    /// Login name (`-u`).
    pub username: String,
}

/// `query_profile` payload.
#[derive(Debug, Clone)]
pub struct QueryProfile {
    /// Acting user (`-c`).
    pub current_user: String,
    /// Profile to read (`-u`).
    pub username: String,
}

/// `modify_profile` payload.
#[derive(Debug, Clone)]
pub struct ModifyProfile {
    /// Acting user (`-c`).
    pub current_user: String,
    /// Profile to mutate (`-u`).
    pub username: String,
    /// Replacement password (`-p`).
    pub password: Option<String>,
    /// Replacement display name (`-n`).
    pub name: Option<String>,
    /// Replacement contact address (`-m`).
    pub email: Option<String>,
    /// Replacement privilege (`-g`).
    pub privilege: Option<i32>,
}

/// `add_train` payload.
#[derive(Debug, Clone)]
pub struct AddTrain {
    /// Public train identifier (`-i`).
    pub train_id: String,
    /// Declared station count (`-n`).
    pub stop_count: usize,
    /// Per-edge seat capacity (`-m`).
    pub seats: i32,
    /// Station names in travel order (`-s`).
    pub stations: Vec<String>,
    /// Per-edge prices (`-p`), one fewer than stations.
    pub prices: Vec<i32>,
    /// Daily departure time at the first station (`-x`).
    pub departure: Instant,
    /// Per-edge travel times (`-t`), one fewer than stations.
    pub travel_times: Vec<Duration>,
    /// Per-intermediate-stop dwell times (`-o`); empty for two-stop trains.
    pub stopover_times: Vec<Duration>,
    /// First and last operating date (`-d`).
    pub dates: (Date, Date),
    /// Train class letter (`-y`).
    pub kind: char,
}

/// `delete_train` payload.
#[derive(Debug, Clone)]
pub struct DeleteTrain {
    /// Public train identifier (`-i`).
    pub train_id: String,
}

/// `release_train` payload.
#[derive(Debug, Clone)]
pub struct ReleaseTrain {
    /// Public train identifier (`-i`).
    pub train_id: String,
}

/// `query_train` payload.
#[derive(Debug, Clone)]
pub struct QueryTrain {
    /// Public train identifier (`-i`).
    pub train_id: String,
    /// Origin departure date (`-d`).
    pub date: Date,
}

/// `query_ticket` payload.
#[derive(Debug, Clone)]
pub struct QueryTicket {
    /// Departure station (`-s`).
    pub from: String,
    /// Arrival station (`-t`).
    pub to: String,
    /// Departure date at the departure station (`-d`).
    pub date: Date,
    /// Result ordering (`-p`).
    pub sort: SortKey,
}

/// `query_transfer` payload.
#[derive(Debug, Clone)]
pub struct QueryTransfer {
    /// Departure station (`-s`).
    pub from: String,
    /// Arrival station (`-t`).
    pub to: String,
    /// Departure date at the departure station (`-d`).
    pub date: Date,
    /// Result ordering (`-p`).
    pub sort: SortKey,
}

/// `buy_ticket` payload.
#[derive(Debug, Clone)]
pub struct BuyTicket {
    /// Acting user (`-u`).
    pub current_user: String,
    /// Public train identifier (`-i`).
    pub train_id: String,
    /// Departure date at the departure station (`-d`).
    pub date: Date,
    /// Seats requested (`-n`).
    pub seats: i32,
    /// Departure station (`-f`).
    pub from: String,
    /// Arrival station (`-t`).
    pub to: String,
    /// Whether to queue when seats are short (`-q`).
    pub queue: bool,
}

/// `query_order` payload.
#[derive(Debug, Clone)]
pub struct QueryOrder {
    /// Acting user (`-u`).
    pub current_user: String,
}

/// `refund_ticket` payload.
#[derive(Debug, Clone)]
pub struct RefundTicket {
    /// Acting user (`-u`).
    pub current_user: String,
    /// 1-based index among the user's orders, newest first (`-n`).
    pub index: usize,
}

/// `rollback` payload.
#[derive(Debug, Clone)]
pub struct Rollback {
    /// Undo every command with a timestamp strictly greater than this.
    pub timestamp: i32,
}

/// A fully parsed command line.
#[derive(Debug, Clone)]
pub enum Command {
    /// Create a user.
    AddUser(AddUser),
    /// Open a session.
    Login(Login),
    /// Close a session.
    Logout(Logout),
    /// Read a profile.
    QueryProfile(QueryProfile),
    /// Mutate a profile.
    ModifyProfile(ModifyProfile),
    /// Create a train.
    AddTrain(AddTrain),
    /// Soft-delete an unreleased train.
    DeleteTrain(DeleteTrain),
    /// Release a train and materialize its rides.
    ReleaseTrain(ReleaseTrain),
    /// Read one ride of a train.
    QueryTrain(QueryTrain),
    /// Search direct journeys.
    QueryTicket(QueryTicket),
    /// Search one-transfer journeys.
    QueryTransfer(QueryTransfer),
    /// Place an order.
    BuyTicket(BuyTicket),
    /// List the caller's orders, newest first.
    QueryOrder(QueryOrder),
    /// Refund the caller's Nth-newest order.
    RefundTicket(RefundTicket),
    /// Undo commands newer than a timestamp.
    Rollback(Rollback),
    /// Truncate all persistent and session state.
    Clean,
    /// Stop the process.
    Exit,
}
