// SPDX-License-Identifier: Apache-2.0
//! Orders: model, ticket lifecycle commands, and their inverses.

use switchyard_store::codec::{ByteReader, ByteWriter, CodecError, Record};
use switchyard_store::{Managed, RecordId, StoreError};

use crate::command::{BuyTicket, QueryOrder, RefundTicket};
use crate::error::CommandError;
use crate::response::{OrderSummary, Receipt, Response, Ticket};
use crate::rollback::InverseOp;
use crate::system::System;
use crate::time::{Instant, Moment};
use crate::train::Ride;
use crate::{StationName, TrainId, Username};

/// Order state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderStatus {
    /// Seats are held.
    #[default]
    Success,
    /// Waiting in the ride's queue for returned seats.
    Pending,
    /// Given up, by refund.
    Refunded,
}

impl OrderStatus {
    /// Protocol label, as printed by `query_order`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Pending => "pending",
            Self::Refunded => "refunded",
        }
    }
}

impl Record for OrderStatus {
    const BYTES: usize = 1;

    fn store(&self, out: &mut ByteWriter<'_>) {
        out.put_u8(match self {
            Self::Success => 0,
            Self::Pending => 1,
            Self::Refunded => 2,
        });
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        match input.u8()? {
            0 => Ok(Self::Success),
            1 => Ok(Self::Pending),
            2 => Ok(Self::Refunded),
            _ => Err(CodecError::InvalidEnum),
        }
    }
}

/// Display fields frozen at purchase time so `query_order` never has to
/// re-load the train.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderCache {
    pub train_id: TrainId,
    pub from: StationName,
    pub to: StationName,
    pub departure: Instant,
    pub arrival: Instant,
}

impl Record for OrderCache {
    const BYTES: usize =
        TrainId::BYTES + StationName::BYTES + StationName::BYTES + Instant::BYTES + Instant::BYTES;

    fn store(&self, out: &mut ByteWriter<'_>) {
        self.train_id.store(out);
        self.from.store(out);
        self.to.store(out);
        self.departure.store(out);
        self.arrival.store(out);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            train_id: TrainId::load(input)?,
            from: StationName::load(input)?,
            to: StationName::load(input)?,
            departure: Instant::load(input)?,
            arrival: Instant::load(input)?,
        })
    }
}

/// One ticket order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Order {
    pub user: Username,
    pub ride: Ride,
    pub ix_from: u32,
    pub ix_to: u32,
    pub seats: i32,
    /// Per-seat price over the booked range.
    pub price: i32,
    pub status: OrderStatus,
    pub cache: OrderCache,
}

impl Record for Order {
    const BYTES: usize =
        Username::BYTES + Ride::BYTES + 4 + 4 + 4 + 4 + OrderStatus::BYTES + OrderCache::BYTES;

    fn store(&self, out: &mut ByteWriter<'_>) {
        self.user.store(out);
        self.ride.store(out);
        out.put_u32(self.ix_from);
        out.put_u32(self.ix_to);
        out.put_i32(self.seats);
        out.put_i32(self.price);
        self.status.store(out);
        self.cache.store(out);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            user: Username::load(input)?,
            ride: Ride::load(input)?,
            ix_from: input.u32()?,
            ix_to: input.u32()?,
            seats: input.i32()?,
            price: input.i32()?,
            status: OrderStatus::load(input)?,
            cache: OrderCache::load(input)?,
        })
    }
}

impl Order {
    /// Total charged for the order.
    pub fn subtotal(&self) -> i64 {
        i64::from(self.price) * i64::from(self.seats)
    }

    fn summary(&self) -> OrderSummary {
        OrderSummary {
            status: self.status.label(),
            ticket: Ticket {
                train_id: self.cache.train_id.to_string(),
                from: self.cache.from.to_string(),
                to: self.cache.to.to_string(),
                depart: Moment::new(self.ride.date, self.cache.departure),
                arrive: Moment::new(self.ride.date, self.cache.arrival),
                price: self.subtotal(),
                seats: self.seats,
            },
        }
    }
}

impl System {
    /// The caller's orders, oldest first, with the hash-bucket re-check.
    fn orders_of(&mut self, user: &Username) -> Result<Vec<RecordId>, StoreError> {
        let mut out = Vec::new();
        for id in self.ix_order_user.find_many(user)? {
            if self.orders.get(id)?.user == *user {
                out.push(id);
            }
        }
        Ok(out)
    }

    pub(crate) fn run_buy_ticket(&mut self, cmd: &BuyTicket) -> Result<Response, CommandError> {
        let user = Username::new(&cmd.current_user).map_err(|_| CommandError::NotLoggedIn)?;
        if !self.sessions.is_logged_in(&user) {
            return Err(CommandError::NotLoggedIn);
        }
        let train_id =
            TrainId::new(&cmd.train_id).map_err(|_| CommandError::NotFound("train"))?;
        let train = self
            .find_train(&train_id)?
            .ok_or(CommandError::NotFound("train"))?;
        if !train.released || train.deleted {
            return Err(CommandError::NotReleased);
        }
        if cmd.seats < 1 || cmd.seats > train.seats {
            return Err(CommandError::InvalidField("seat count"));
        }
        let from = StationName::new(&cmd.from).map_err(|_| CommandError::BadRoute)?;
        let to = StationName::new(&cmd.to).map_err(|_| CommandError::BadRoute)?;
        let (Some(ix_from), Some(ix_to)) =
            (train.index_of_stop(&from), train.index_of_stop(&to))
        else {
            return Err(CommandError::BadRoute);
        };
        if ix_from >= ix_to {
            return Err(CommandError::BadRoute);
        }
        let origin = train.origin_for(cmd.date, ix_from);
        if !train.runs_on(origin) {
            return Err(CommandError::OutsideWindow);
        }
        let ride = Ride {
            train: train.saved_id()?,
            date: origin,
        };
        let mut seats = self
            .find_ride_seats(ride)?
            .ok_or(StoreError::Corrupt("released train lacks a ride record"))?;

        let price = train.total_price(ix_from, ix_to) as i32;
        let mut order = Managed::fresh(Order {
            user,
            ride,
            ix_from: ix_from as u32,
            ix_to: ix_to as u32,
            seats: cmd.seats,
            price,
            status: OrderStatus::Success,
            cache: OrderCache {
                train_id,
                from,
                to,
                departure: train.edges[ix_from].departure,
                arrival: train.edges[ix_to - 1].arrival,
            },
        });

        let receipt = if seats.available(ix_from, ix_to) >= cmd.seats {
            seats.adjust(-cmd.seats, ix_from, ix_to);
            seats.update(&mut self.ride_seats)?;
            let id = order.save(&mut self.orders)?;
            self.ix_order_user.insert(&user, id)?;
            self.log_entry(InverseOp::BuyTicket { order: id })?;
            Receipt::Paid(order.subtotal())
        } else if cmd.queue {
            order.status = OrderStatus::Pending;
            let id = order.save(&mut self.orders)?;
            self.ix_order_user.insert(&user, id)?;
            self.ix_pending.insert(ride, id)?;
            self.log_entry(InverseOp::BuyTicket { order: id })?;
            Receipt::Enqueued
        } else {
            return Err(CommandError::SoldOut);
        };
        Ok(Response::Receipt(receipt))
    }

    pub(crate) fn run_query_order(&mut self, cmd: &QueryOrder) -> Result<Response, CommandError> {
        let user = Username::new(&cmd.current_user).map_err(|_| CommandError::NotLoggedIn)?;
        if !self.sessions.is_logged_in(&user) {
            return Err(CommandError::NotLoggedIn);
        }
        let ids = self.orders_of(&user)?;
        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids.into_iter().rev() {
            summaries.push(self.orders.get(id)?.summary());
        }
        Ok(Response::Orders(summaries))
    }

    pub(crate) fn run_refund_ticket(
        &mut self,
        cmd: &RefundTicket,
    ) -> Result<Response, CommandError> {
        let user = Username::new(&cmd.current_user).map_err(|_| CommandError::NotLoggedIn)?;
        if !self.sessions.is_logged_in(&user) {
            return Err(CommandError::NotLoggedIn);
        }
        let ids = self.orders_of(&user)?;
        if cmd.index == 0 || cmd.index > ids.len() {
            return Err(CommandError::NotFound("order"));
        }
        let id = ids[ids.len() - cmd.index];
        let mut order = self.orders.get(id)?;
        let previous = order.status;
        if previous == OrderStatus::Refunded {
            return Err(CommandError::AlreadyRefunded);
        }

        order.status = OrderStatus::Refunded;
        order.update(&mut self.orders)?;
        if previous == OrderStatus::Pending {
            self.ix_pending.remove(order.ride, id)?;
            self.log_entry(InverseOp::RefundTicket {
                order: id,
                status: previous,
            })?;
            return Ok(Response::Unit);
        }

        // Seats go back to the ride, then the queue drains oldest-first:
        // every pending order that now fits is promoted.
        let mut seats = self
            .find_ride_seats(order.ride)?
            .ok_or(StoreError::Corrupt("order without a ride record"))?;
        seats.adjust(order.seats, order.ix_from as usize, order.ix_to as usize);
        seats.update(&mut self.ride_seats)?;
        self.log_entry(InverseOp::RefundTicket {
            order: id,
            status: previous,
        })?;

        let queued = self.ix_pending.find_many(&order.ride)?;
        for pending_id in queued {
            let mut pending = self.orders.get(pending_id)?;
            debug_assert_eq!(pending.status, OrderStatus::Pending);
            let (from, to) = (pending.ix_from as usize, pending.ix_to as usize);
            if seats.available(from, to) < pending.seats {
                continue;
            }
            seats.adjust(-pending.seats, from, to);
            seats.update(&mut self.ride_seats)?;
            pending.status = OrderStatus::Success;
            pending.update(&mut self.orders)?;
            self.ix_pending.remove(pending.ride, pending_id)?;
            self.log_entry(InverseOp::FulfillOrder { order: pending_id })?;
        }
        Ok(Response::Unit)
    }

    pub(crate) fn undo_buy_ticket(&mut self, id: RecordId) -> Result<(), StoreError> {
        let mut order = self.orders.get(id)?;
        let user = order.user;
        self.ix_order_user.remove(&user, id)?;
        match order.status {
            OrderStatus::Pending => {
                self.ix_pending.remove(order.ride, id)?;
            }
            OrderStatus::Success => {
                // The purchase held seats; hand them back.
                let mut seats = self
                    .find_ride_seats(order.ride)?
                    .ok_or(StoreError::Corrupt("order without a ride record"))?;
                seats.adjust(order.seats, order.ix_from as usize, order.ix_to as usize);
                seats.update(&mut self.ride_seats)?;
            }
            OrderStatus::Refunded => {}
        }
        order.destroy(&mut self.orders)
    }

    pub(crate) fn undo_refund_ticket(
        &mut self,
        id: RecordId,
        status: OrderStatus,
    ) -> Result<(), StoreError> {
        let mut order = self.orders.get(id)?;
        order.status = status;
        order.update(&mut self.orders)?;
        match status {
            OrderStatus::Success => {
                let mut seats = self
                    .find_ride_seats(order.ride)?
                    .ok_or(StoreError::Corrupt("order without a ride record"))?;
                seats.adjust(-order.seats, order.ix_from as usize, order.ix_to as usize);
                seats.update(&mut self.ride_seats)?;
            }
            OrderStatus::Pending => {
                self.ix_pending.insert(order.ride, id)?;
            }
            OrderStatus::Refunded => {}
        }
        Ok(())
    }

    pub(crate) fn undo_fulfill_order(&mut self, id: RecordId) -> Result<(), StoreError> {
        let mut order = self.orders.get(id)?;
        order.status = OrderStatus::Pending;
        order.update(&mut self.orders)?;
        let mut seats = self
            .find_ride_seats(order.ride)?
            .ok_or(StoreError::Corrupt("order without a ride record"))?;
        seats.adjust(order.seats, order.ix_from as usize, order.ix_to as usize);
        seats.update(&mut self.ride_seats)?;
        self.ix_pending.insert(order.ride, id)
    }
}
