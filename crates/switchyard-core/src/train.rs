// SPDX-License-Identifier: Apache-2.0
//! Trains and rides: models, lifecycle commands, and their inverses.

use switchyard_store::codec::{ByteReader, ByteWriter, CodecError, Record};
use switchyard_store::{InlineVec, Managed, RecordId, StoreError};

use crate::command::{AddTrain, DeleteTrain, QueryTrain, ReleaseTrain};
use crate::error::CommandError;
use crate::response::{Response, ScheduleRow, TrainSchedule};
use crate::rollback::InverseOp;
use crate::system::System;
use crate::time::{Date, Instant, Moment};
use crate::user::valid_username;
use crate::{StationName, TrainId, MAX_EDGES, MAX_STOPS};

/// One segment between consecutive stops.
///
/// Instants are relative to the origin date's midnight and accumulate day
/// overflow along the route.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainEdge {
    pub price: i32,
    pub departure: Instant,
    pub arrival: Instant,
}

impl Record for TrainEdge {
    const BYTES: usize = 4 + Instant::BYTES + Instant::BYTES;

    fn store(&self, out: &mut ByteWriter<'_>) {
        out.put_i32(self.price);
        self.departure.store(out);
        self.arrival.store(out);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            price: input.i32()?,
            departure: Instant::load(input)?,
            arrival: Instant::load(input)?,
        })
    }
}

/// A train: its route, pricing, capacity and operating window.
#[derive(Debug, Clone, Copy, Default)]
pub struct Train {
    pub train_id: TrainId,
    pub stops: InlineVec<StationName, MAX_STOPS>,
    pub edges: InlineVec<TrainEdge, MAX_EDGES>,
    pub seats: i32,
    pub begin: Date,
    pub end: Date,
    pub kind: u8,
    pub released: bool,
    pub deleted: bool,
}

impl Record for Train {
    const BYTES: usize = TrainId::BYTES
        + InlineVec::<StationName, MAX_STOPS>::BYTES
        + InlineVec::<TrainEdge, MAX_EDGES>::BYTES
        + 4
        + Date::BYTES
        + Date::BYTES
        + 1
        + 1
        + 1;

    fn store(&self, out: &mut ByteWriter<'_>) {
        self.train_id.store(out);
        self.stops.store(out);
        self.edges.store(out);
        out.put_i32(self.seats);
        self.begin.store(out);
        self.end.store(out);
        out.put_u8(self.kind);
        out.put_bool(self.released);
        out.put_bool(self.deleted);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            train_id: TrainId::load(input)?,
            stops: InlineVec::load(input)?,
            edges: InlineVec::load(input)?,
            seats: input.i32()?,
            begin: Date::load(input)?,
            end: Date::load(input)?,
            kind: input.u8()?,
            released: input.bool()?,
            deleted: input.bool()?,
        })
    }
}

impl Train {
    /// Position of the stop named `name` along the route.
    pub fn index_of_stop(&self, name: &StationName) -> Option<usize> {
        self.stops.iter().position(|stop| stop == name)
    }

    /// Total price over the half-open edge range `[from, to)`.
    pub fn total_price(&self, from: usize, to: usize) -> i64 {
        debug_assert!(from < to);
        self.edges.as_slice()[from..to]
            .iter()
            .map(|edge| i64::from(edge.price))
            .sum()
    }

    /// Origin date of the ride that departs stop `at` on `date`.
    ///
    /// A stop reached after midnight belongs to a ride that left the first
    /// station one or more days earlier.
    pub fn origin_for(&self, date: Date, at: usize) -> Date {
        date.minus(self.edges[at].departure.days_overflow())
    }

    /// Whether a ride departs the first station on `origin`.
    pub fn runs_on(&self, origin: Date) -> bool {
        origin.in_range(self.begin, self.end)
    }
}

/// A (train, origin date) pair naming one materialized ride.
///
/// Ordered by date first so one train's rides sit adjacent per day in the
/// ride index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Ride {
    pub train: RecordId,
    pub date: Date,
}

impl PartialOrd for Ride {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ride {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| self.train.cmp(&other.train))
    }
}

impl Record for Ride {
    const BYTES: usize = 4 + Date::BYTES;

    fn store(&self, out: &mut ByteWriter<'_>) {
        out.put_u32(self.train);
        self.date.store(out);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            train: input.u32()?,
            date: Date::load(input)?,
        })
    }
}

/// Mutable seats-remaining vector of one ride, one slot per edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct RideSeats {
    pub ride: Ride,
    pub remaining: InlineVec<i32, MAX_EDGES>,
}

impl Record for RideSeats {
    const BYTES: usize = Ride::BYTES + InlineVec::<i32, MAX_EDGES>::BYTES;

    fn store(&self, out: &mut ByteWriter<'_>) {
        self.ride.store(out);
        self.remaining.store(out);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            ride: Ride::load(input)?,
            remaining: InlineVec::load(input)?,
        })
    }
}

impl RideSeats {
    /// Seats still bookable over the half-open edge range `[from, to)`.
    pub fn available(&self, from: usize, to: usize) -> i32 {
        debug_assert!(from < to);
        self.remaining.as_slice()[from..to]
            .iter()
            .copied()
            .min()
            .unwrap_or(0)
    }

    /// Add `delta` seats on every edge in `[from, to)` (negative to book).
    pub fn adjust(&mut self, delta: i32, from: usize, to: usize) {
        debug_assert!(from < to);
        for edge in from..to {
            self.remaining[edge] += delta;
        }
    }
}

fn valid_train_id(text: &str) -> bool {
    text.len() <= TrainId::BYTES && valid_username(text)
}

fn valid_station(text: &str) -> bool {
    (1..=StationName::BYTES).contains(&text.len())
}

impl System {
    /// Load the train publicly named `id`, going through the hash-keyed
    /// index with a name re-check.
    pub(crate) fn find_train(
        &mut self,
        id: &TrainId,
    ) -> Result<Option<Managed<Train>>, StoreError> {
        for record in self.ix_train_id.find_many(id)? {
            let train = self.trains.get(record)?;
            if train.train_id == *id {
                return Ok(Some(train));
            }
        }
        Ok(None)
    }

    /// Load the seats record of `ride`, if one was materialized.
    pub(crate) fn find_ride_seats(
        &mut self,
        ride: Ride,
    ) -> Result<Option<Managed<RideSeats>>, StoreError> {
        match self.ix_ride.find_one(&ride)? {
            Some(id) => Ok(Some(self.ride_seats.get(id)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn run_add_train(&mut self, cmd: &AddTrain) -> Result<Response, CommandError> {
        let stop_count = cmd.stop_count;
        if !valid_train_id(&cmd.train_id)
            || !(2..=MAX_STOPS).contains(&stop_count)
            || cmd.stations.len() != stop_count
            || cmd.prices.len() != stop_count - 1
            || cmd.travel_times.len() != stop_count - 1
            || cmd.stopover_times.len() != stop_count.saturating_sub(2)
            || cmd.seats < 1
            || cmd.prices.iter().any(|price| *price < 0)
            || cmd.stations.iter().any(|s| !valid_station(s))
            || !cmd.kind.is_ascii_alphabetic()
            || cmd.dates.0 > cmd.dates.1
        {
            return Err(CommandError::InvalidField("train field"));
        }
        let train_id = TrainId::new(&cmd.train_id)?;
        if self.find_train(&train_id)?.is_some() {
            return Err(CommandError::Duplicate("train id"));
        }

        let mut train = Train {
            train_id,
            seats: cmd.seats,
            begin: cmd.dates.0,
            end: cmd.dates.1,
            kind: cmd.kind as u8,
            released: false,
            deleted: false,
            ..Train::default()
        };
        for station in &cmd.stations {
            train.stops.push(StationName::new(station)?)?;
        }
        // Walk the route accumulating clock time: each edge departs where
        // the previous one arrived plus the dwell time.
        let mut departure = cmd.departure;
        for edge in 0..stop_count - 1 {
            let arrival = departure.plus(cmd.travel_times[edge]);
            train.edges.push(TrainEdge {
                price: cmd.prices[edge],
                departure,
                arrival,
            })?;
            if edge + 1 < stop_count - 1 {
                departure = arrival.plus(cmd.stopover_times[edge]);
            }
        }

        let mut train = Managed::fresh(train);
        let id = train.save(&mut self.trains)?;
        self.ix_train_id.insert(&train_id, id)?;
        self.log_entry(InverseOp::AddTrain { id })?;
        Ok(Response::Unit)
    }

    pub(crate) fn run_delete_train(&mut self, cmd: &DeleteTrain) -> Result<Response, CommandError> {
        let train_id =
            TrainId::new(&cmd.train_id).map_err(|_| CommandError::NotFound("train"))?;
        let mut train = self
            .find_train(&train_id)?
            .ok_or(CommandError::NotFound("train"))?;
        if train.released {
            return Err(CommandError::AlreadyReleased);
        }
        let id = train.saved_id()?;
        train.deleted = true;
        train.update(&mut self.trains)?;
        self.ix_train_id.remove(&train_id, id)?;
        self.log_entry(InverseOp::DeleteTrain { id })?;
        Ok(Response::Unit)
    }

    pub(crate) fn run_release_train(
        &mut self,
        cmd: &ReleaseTrain,
    ) -> Result<Response, CommandError> {
        let train_id =
            TrainId::new(&cmd.train_id).map_err(|_| CommandError::NotFound("train"))?;
        let mut train = self
            .find_train(&train_id)?
            .ok_or(CommandError::NotFound("train"))?;
        if train.released {
            return Err(CommandError::AlreadyReleased);
        }
        let id = train.saved_id()?;
        train.released = true;
        train.update(&mut self.trains)?;

        // A route visiting the same station twice indexes it once; the
        // stop index must not hold duplicate (hash, id) pairs.
        for at in 0..train.stops.len() {
            let stop = train.stops[at];
            if train.index_of_stop(&stop) == Some(at) {
                self.ix_stop.insert(&stop, id)?;
            }
        }
        // One seats record per operating day, all edges at full capacity.
        let mut remaining = InlineVec::new();
        for _ in 0..train.edges.len() {
            remaining.push(train.seats)?;
        }
        let mut day = train.begin;
        while day <= train.end {
            let ride = Ride {
                train: id,
                date: day,
            };
            let mut seats = Managed::fresh(RideSeats { ride, remaining });
            let seats_id = seats.save(&mut self.ride_seats)?;
            self.ix_ride.insert(ride, seats_id)?;
            day = day.plus(1);
        }
        self.log_entry(InverseOp::ReleaseTrain { id })?;
        Ok(Response::Unit)
    }

    pub(crate) fn run_query_train(&mut self, cmd: &QueryTrain) -> Result<Response, CommandError> {
        let train_id =
            TrainId::new(&cmd.train_id).map_err(|_| CommandError::NotFound("train"))?;
        let train = self
            .find_train(&train_id)?
            .ok_or(CommandError::NotFound("train"))?;
        if !train.runs_on(cmd.date) {
            return Err(CommandError::OutsideWindow);
        }
        let id = train.saved_id()?;
        // Released trains report live seat counts; unreleased ones report a
        // synthetic full ride.
        let remaining: Vec<i32> = if train.released {
            let seats = self
                .find_ride_seats(Ride {
                    train: id,
                    date: cmd.date,
                })?
                .ok_or(StoreError::Corrupt("released train lacks a ride record"))?;
            seats.remaining.iter().copied().collect()
        } else {
            vec![train.seats; train.edges.len()]
        };

        let mut rows = Vec::with_capacity(train.stops.len());
        let mut price: i64 = 0;
        for at in 0..train.stops.len() {
            let arrive = (at > 0).then(|| Moment::new(cmd.date, train.edges[at - 1].arrival));
            let depart =
                (at < train.edges.len()).then(|| Moment::new(cmd.date, train.edges[at].departure));
            rows.push(ScheduleRow {
                station: train.stops[at].to_string(),
                arrive,
                depart,
                price,
                seats: (at < train.edges.len()).then(|| remaining[at]),
            });
            if at < train.edges.len() {
                price += i64::from(train.edges[at].price);
            }
        }
        Ok(Response::Schedule(Box::new(TrainSchedule {
            train_id: train.train_id.to_string(),
            kind: char::from(train.kind),
            rows,
        })))
    }

    pub(crate) fn undo_add_train(&mut self, id: RecordId) -> Result<(), StoreError> {
        let mut train = self.trains.get(id)?;
        let train_id = train.train_id;
        self.ix_train_id.remove(&train_id, id)?;
        train.destroy(&mut self.trains)
    }

    pub(crate) fn undo_delete_train(&mut self, id: RecordId) -> Result<(), StoreError> {
        let mut train = self.trains.get(id)?;
        train.deleted = false;
        train.update(&mut self.trains)?;
        let train_id = train.train_id;
        self.ix_train_id.insert(&train_id, id)
    }

    pub(crate) fn undo_release_train(&mut self, id: RecordId) -> Result<(), StoreError> {
        let mut train = self.trains.get(id)?;
        train.released = false;
        train.update(&mut self.trains)?;
        let stops: Vec<StationName> = train.stops.iter().copied().collect();
        for (at, stop) in stops.iter().enumerate() {
            if train.index_of_stop(stop) == Some(at) {
                self.ix_stop.remove(stop, id)?;
            }
        }
        let mut day = train.begin;
        while day <= train.end {
            let ride = Ride {
                train: id,
                date: day,
            };
            let seats_id = self
                .ix_ride
                .find_one(&ride)?
                .ok_or(StoreError::Corrupt("ride record missing on rollback"))?;
            let mut seats = self.ride_seats.get(seats_id)?;
            self.ix_ride.remove(ride, seats_id)?;
            seats.destroy(&mut self.ride_seats)?;
            day = day.plus(1);
        }
        Ok(())
    }
}
