// SPDX-License-Identifier: Apache-2.0
//! Journey searches: direct tickets and one-transfer plans.

use switchyard_store::codec;
use switchyard_store::{LruCache, Managed, RecordId, StoreError};

use crate::command::{QueryTicket, QueryTransfer, SortKey};
use crate::error::CommandError;
use crate::response::{Response, Ticket};
use crate::system::System;
use crate::time::Moment;
use crate::train::{Ride, RideSeats, Train};
use crate::StationName;

/// How many ride-seats lookups the transfer sweep keeps warm. The second
/// leg re-probes the same (train, date) rides once per shared station.
const TRANSFER_SEAT_CACHE: usize = 64;

/// A direct-journey candidate before rendering.
struct Leg {
    train_id: String,
    depart: Moment,
    arrive: Moment,
    price: i64,
    seats: i32,
    minutes: i32,
}

impl Leg {
    fn ticket(&self, from: &StationName, to: &StationName) -> Ticket {
        Ticket {
            train_id: self.train_id.clone(),
            from: from.to_string(),
            to: to.to_string(),
            depart: self.depart,
            arrive: self.arrive,
            price: self.price,
            seats: self.seats,
        }
    }
}

impl System {
    /// Trains that visit `station`, loaded and re-checked by name (the stop
    /// index is hash-keyed).
    fn trains_calling_at(
        &mut self,
        station: &StationName,
    ) -> Result<Vec<(RecordId, Managed<Train>)>, StoreError> {
        let mut out = Vec::new();
        for id in self.ix_stop.find_many(station)? {
            let train = self.trains.get(id)?;
            if train.index_of_stop(station).is_some() {
                out.push((id, train));
            }
        }
        Ok(out)
    }

    pub(crate) fn run_query_ticket(&mut self, cmd: &QueryTicket) -> Result<Response, CommandError> {
        let from = match StationName::new(&cmd.from) {
            Ok(name) => name,
            Err(_) => return Ok(Response::Tickets(Vec::new())),
        };
        let to = match StationName::new(&cmd.to) {
            Ok(name) => name,
            Err(_) => return Ok(Response::Tickets(Vec::new())),
        };

        let mut legs: Vec<(Leg, StationName, StationName)> = Vec::new();
        for (id, train) in self.trains_calling_at(&from)? {
            let Some(leg) = self.direct_leg(id, &train, &from, &to, cmd.date)? else {
                continue;
            };
            legs.push((leg, from, to));
        }
        legs.sort_by(|(a, _, _), (b, _, _)| match cmd.sort {
            SortKey::Time => (a.minutes, &a.train_id).cmp(&(b.minutes, &b.train_id)),
            SortKey::Cost => (a.price, &a.train_id).cmp(&(b.price, &b.train_id)),
        });
        Ok(Response::Tickets(
            legs.iter()
                .map(|(leg, from, to)| leg.ticket(from, to))
                .collect(),
        ))
    }

    /// The bookable leg of `train` from `from` to `to` departing `date`,
    /// if the route and calendar admit one.
    fn direct_leg(
        &mut self,
        id: RecordId,
        train: &Train,
        from: &StationName,
        to: &StationName,
        date: crate::time::Date,
    ) -> Result<Option<Leg>, CommandError> {
        let (Some(ix_from), Some(ix_to)) = (train.index_of_stop(from), train.index_of_stop(to))
        else {
            return Ok(None);
        };
        if ix_from >= ix_to {
            return Ok(None);
        }
        let origin = train.origin_for(date, ix_from);
        if !train.runs_on(origin) {
            return Ok(None);
        }
        let ride = Ride {
            train: id,
            date: origin,
        };
        let Some(seats) = self.find_ride_seats(ride)? else {
            return Ok(None);
        };
        let depart = Moment::new(origin, train.edges[ix_from].departure);
        let arrive = Moment::new(origin, train.edges[ix_to - 1].arrival);
        Ok(Some(Leg {
            train_id: train.train_id.to_string(),
            depart,
            arrive,
            price: train.total_price(ix_from, ix_to),
            seats: seats.available(ix_from, ix_to),
            minutes: arrive.minutes_since(depart),
        }))
    }

    pub(crate) fn run_query_transfer(
        &mut self,
        cmd: &QueryTransfer,
    ) -> Result<Response, CommandError> {
        let from = match StationName::new(&cmd.from) {
            Ok(name) => name,
            Err(_) => return Ok(Response::Transfer(None)),
        };
        let to = match StationName::new(&cmd.to) {
            Ok(name) => name,
            Err(_) => return Ok(Response::Transfer(None)),
        };

        let first_legs = self.trains_calling_at(&from)?;
        let second_legs = self.trains_calling_at(&to)?;
        let mut seat_cache: LruCache<Ride> = LruCache::new(TRANSFER_SEAT_CACHE);

        // (sort key, first leg, second leg); the key is the full
        // lexicographic tie-break so "best" is unique.
        let mut best: Option<((i64, i64, String, String), (Ticket, Ticket))> = None;

        for (fid, f) in &first_legs {
            let Some(ix_from) = f.index_of_stop(&from) else {
                continue;
            };
            if ix_from + 1 >= f.stops.len() {
                continue;
            }
            let origin_f = f.origin_for(cmd.date, ix_from);
            if !f.runs_on(origin_f) {
                continue;
            }
            let Some(seats_f) = self.find_ride_seats(Ride {
                train: *fid,
                date: origin_f,
            })?
            else {
                continue;
            };
            let depart = Moment::new(origin_f, f.edges[ix_from].departure);

            for mid in ix_from + 1..f.stops.len() {
                let station = f.stops[mid];
                let reach = Moment::new(origin_f, f.edges[mid - 1].arrival);

                for (tid, t) in &second_legs {
                    if tid == fid {
                        continue;
                    }
                    let Some(ix_to) = t.index_of_stop(&to) else {
                        continue;
                    };
                    let Some(join) = t.index_of_stop(&station) else {
                        continue;
                    };
                    if join >= ix_to {
                        continue;
                    }
                    // Earliest origin date whose departure at the shared
                    // station is not before our arrival there, clamped into
                    // the second train's window.
                    let hop = t.edges[join].departure;
                    let mut day = reach.date().minus(hop.days_overflow());
                    if hop.minute_of_day() < reach.minute_of_day() {
                        day = day.plus(1);
                    }
                    if day < t.begin {
                        day = t.begin;
                    }
                    if day > t.end {
                        continue;
                    }
                    let ride_t = Ride {
                        train: *tid,
                        date: day,
                    };
                    let Some(seats_t) = self.cached_ride_seats(&mut seat_cache, ride_t)? else {
                        continue;
                    };

                    let arrive = Moment::new(day, t.edges[ix_to - 1].arrival);
                    let price_f = f.total_price(ix_from, mid);
                    let price_t = t.total_price(join, ix_to);
                    let minutes = arrive.minutes_since(depart);
                    let key = match cmd.sort {
                        SortKey::Time => (
                            i64::from(minutes),
                            price_f + price_t,
                            f.train_id.to_string(),
                            t.train_id.to_string(),
                        ),
                        SortKey::Cost => (
                            price_f + price_t,
                            i64::from(minutes),
                            f.train_id.to_string(),
                            t.train_id.to_string(),
                        ),
                    };
                    if best.as_ref().is_some_and(|(incumbent, _)| *incumbent <= key) {
                        continue;
                    }
                    let first = Ticket {
                        train_id: f.train_id.to_string(),
                        from: from.to_string(),
                        to: station.to_string(),
                        depart,
                        arrive: reach,
                        price: price_f,
                        seats: seats_f.available(ix_from, mid),
                    };
                    let second = Ticket {
                        train_id: t.train_id.to_string(),
                        from: station.to_string(),
                        to: to.to_string(),
                        depart: Moment::new(day, hop),
                        arrive,
                        price: price_t,
                        seats: seats_t.available(join, ix_to),
                    };
                    best = Some((key, (first, second)));
                }
            }
        }
        Ok(Response::Transfer(best.map(|(_, pair)| pair)))
    }

    /// Ride-seats lookup through a per-query LRU cache; absence is cached
    /// as an empty value.
    fn cached_ride_seats(
        &mut self,
        cache: &mut LruCache<Ride>,
        ride: Ride,
    ) -> Result<Option<RideSeats>, StoreError> {
        if let Some(bytes) = cache.get(&ride) {
            if bytes.is_empty() {
                return Ok(None);
            }
            return Ok(Some(codec::decode(bytes)?));
        }
        match self.find_ride_seats(ride)? {
            Some(seats) => {
                cache.upsert(&ride, &codec::encode::<RideSeats>(&seats), false);
                Ok(Some(*seats))
            }
            None => {
                cache.upsert(&ride, &[], false);
                Ok(None)
            }
        }
    }
}
