// SPDX-License-Identifier: Apache-2.0
//! Transactional core of the switchyard reservation backend.
//!
//! A [`System`] owns every backing file (primary tables, secondary indexes,
//! the rollback log) plus the in-memory session table, and executes parsed
//! [`Command`]s one at a time. Each mutating command appends the inverse
//! information needed to undo it to the rollback log; `rollback` destroys
//! the log tail backwards, re-applying those inverses.
//!
//! The crate is strictly single-threaded and synchronous: effects of one
//! command are fully visible to the next, and log appends happen after the
//! mutation they invert has reached the page store.

mod command;
mod error;
mod order;
mod query;
mod response;
mod rollback;
mod session;
mod system;
mod time;
mod train;
mod user;

pub use command::{
    AddTrain, AddUser, BuyTicket, Command, DeleteTrain, Login, Logout, ModifyProfile, QueryOrder,
    QueryProfile, QueryTicket, QueryTrain, QueryTransfer, RefundTicket, ReleaseTrain, Rollback,
    SortKey,
};
pub use error::CommandError;
pub use response::{OrderSummary, Profile, Receipt, Response, ScheduleRow, Ticket, TrainSchedule};
pub use system::System;
pub use time::{Date, Duration, Instant, Moment};

/// Login name, at most 20 bytes.
pub type Username = switchyard_store::Varchar<20>;
/// Account password, at most 30 bytes.
pub type Password = switchyard_store::Varchar<30>;
/// Display name, at most 15 bytes.
pub type DisplayName = switchyard_store::Varchar<15>;
/// Contact address, at most 30 bytes.
pub type Email = switchyard_store::Varchar<30>;
/// Public train identifier, at most 20 bytes.
pub type TrainId = switchyard_store::Varchar<20>;
/// Station name, at most 30 bytes.
pub type StationName = switchyard_store::Varchar<30>;

/// Most stations a train may serve.
pub const MAX_STOPS: usize = 100;
/// Most edges (consecutive-station segments) a train may have.
pub const MAX_EDGES: usize = MAX_STOPS - 1;
/// Highest privilege a user can hold; the bootstrap user gets exactly this.
pub const MAX_PRIVILEGE: i32 = 10;
