// SPDX-License-Identifier: Apache-2.0
//! The system facade: every backing file plus the session table.

use std::path::Path;

use switchyard_btree::{index_order, leaf_order, Index, StrIndex};
use switchyard_store::{Record, StoreError, Table};
use tracing::{debug, info};

use crate::command::{Command, Rollback};
use crate::error::CommandError;
use crate::order::Order;
use crate::response::Response;
use crate::rollback::{InverseOp, RollbackLog};
use crate::session::SessionTable;
use crate::train::{Ride, RideSeats, Train};
use crate::user::User;

const RIDE_ENTRY: usize = Ride::BYTES + 4;
const RIDE_M: usize = index_order(RIDE_ENTRY);
const RIDE_L: usize = leaf_order(RIDE_ENTRY);

/// A secondary index keyed by [`Ride`].
pub(crate) type RideIndex = Index<Ride, RIDE_M, RIDE_L>;

/// The whole reservation system: one instance per data directory.
///
/// Single-threaded by construction; every command runs to completion
/// against `&mut self` before the next is accepted.
#[derive(Debug)]
pub struct System {
    pub(crate) users: Table<User>,
    pub(crate) ix_username: StrIndex,
    pub(crate) trains: Table<Train>,
    pub(crate) ix_train_id: StrIndex,
    /// Stop-name hash → train record id; populated only on release.
    pub(crate) ix_stop: StrIndex,
    pub(crate) ride_seats: Table<RideSeats>,
    pub(crate) ix_ride: RideIndex,
    pub(crate) orders: Table<Order>,
    pub(crate) ix_order_user: StrIndex,
    /// Orders currently in Pending state, keyed by their ride.
    pub(crate) ix_pending: RideIndex,
    pub(crate) log: RollbackLog,
    pub(crate) sessions: SessionTable,
    now: i32,
}

impl System {
    /// Open (or create) every backing file under `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        info!(dir = %dir.display(), "opening switchyard data directory");
        Ok(Self {
            users: Table::open(&dir.join("users"))?,
            ix_username: StrIndex::open(&dir.join("users.username.ix"))?,
            trains: Table::open(&dir.join("trains"))?,
            ix_train_id: StrIndex::open(&dir.join("trains.train-id.ix"))?,
            ix_stop: StrIndex::open(&dir.join("trains.stop.ix"))?,
            ride_seats: Table::open(&dir.join("ride-seats"))?,
            ix_ride: RideIndex::open(&dir.join("ride-seats.ride.ix"))?,
            orders: Table::open(&dir.join("orders"))?,
            ix_order_user: StrIndex::open(&dir.join("orders.user.ix"))?,
            ix_pending: RideIndex::open(&dir.join("orders-pending.ride.ix"))?,
            log: RollbackLog::open(&dir.join("rollback-log"))?,
            sessions: SessionTable::default(),
            now: 0,
        })
    }

    /// Execute one command stamped `timestamp`.
    ///
    /// Recoverable failures leave state untouched (the transactions
    /// pre-check before mutating); a [`CommandError::Store`] failure is
    /// fatal to the process.
    pub fn execute(&mut self, timestamp: i32, cmd: &Command) -> Result<Response, CommandError> {
        self.now = timestamp;
        match cmd {
            Command::AddUser(cmd) => self.run_add_user(cmd),
            Command::Login(cmd) => self.run_login(cmd),
            Command::Logout(cmd) => self.run_logout(cmd),
            Command::QueryProfile(cmd) => self.run_query_profile(cmd),
            Command::ModifyProfile(cmd) => self.run_modify_profile(cmd),
            Command::AddTrain(cmd) => self.run_add_train(cmd),
            Command::DeleteTrain(cmd) => self.run_delete_train(cmd),
            Command::ReleaseTrain(cmd) => self.run_release_train(cmd),
            Command::QueryTrain(cmd) => self.run_query_train(cmd),
            Command::QueryTicket(cmd) => self.run_query_ticket(cmd),
            Command::QueryTransfer(cmd) => self.run_query_transfer(cmd),
            Command::BuyTicket(cmd) => self.run_buy_ticket(cmd),
            Command::QueryOrder(cmd) => self.run_query_order(cmd),
            Command::RefundTicket(cmd) => self.run_refund_ticket(cmd),
            Command::Rollback(cmd) => self.run_rollback(cmd),
            Command::Clean => self.run_clean(),
            Command::Exit => Ok(Response::Farewell),
        }
    }

    /// Append one inverse to the rollback log, stamped with the current
    /// command's timestamp.
    pub(crate) fn log_entry(&mut self, op: InverseOp) -> Result<(), StoreError> {
        self.log.append(self.now, op)
    }

    fn run_rollback(&mut self, cmd: &Rollback) -> Result<Response, CommandError> {
        if cmd.timestamp > self.now {
            return Err(CommandError::InvalidField("timestamp"));
        }
        // Sessions do not survive time travel.
        self.sessions.clear();

        let mut cursor = self.log.last_id()?;
        let mut undone = 0_u32;
        while let Some(id) = cursor {
            let entry = self.log.entry(id)?;
            if entry.timestamp <= cmd.timestamp {
                break;
            }
            self.undo(entry.op)?;
            self.log.discard(id)?;
            undone += 1;
            cursor = id.checked_sub(1);
        }
        self.log.set_last(cursor)?;
        debug!(undone, through = cmd.timestamp, "rollback complete");
        Ok(Response::Unit)
    }

    fn undo(&mut self, op: InverseOp) -> Result<(), StoreError> {
        match op {
            InverseOp::AddUser { id } => self.undo_add_user(id),
            InverseOp::ModifyProfile {
                id,
                password,
                name,
                email,
                privilege,
            } => self.undo_modify_profile(id, password, name, email, privilege),
            InverseOp::AddTrain { id } => self.undo_add_train(id),
            InverseOp::DeleteTrain { id } => self.undo_delete_train(id),
            InverseOp::ReleaseTrain { id } => self.undo_release_train(id),
            InverseOp::BuyTicket { order } => self.undo_buy_ticket(order),
            InverseOp::RefundTicket { order, status } => self.undo_refund_ticket(order, status),
            InverseOp::FulfillOrder { order } => self.undo_fulfill_order(order),
        }
    }

    /// Truncate every file and flush sessions. The log is truncated too,
    /// so rollback never reaches past a clean.
    fn run_clean(&mut self) -> Result<Response, CommandError> {
        info!("clean: truncating all state");
        self.users.truncate()?;
        self.ix_username.truncate()?;
        self.trains.truncate()?;
        self.ix_train_id.truncate()?;
        self.ix_stop.truncate()?;
        self.ride_seats.truncate()?;
        self.ix_ride.truncate()?;
        self.orders.truncate()?;
        self.ix_order_user.truncate()?;
        self.ix_pending.truncate()?;
        self.log.truncate()?;
        self.sessions.clear();
        Ok(Response::Unit)
    }
}
