// SPDX-License-Identifier: Apache-2.0
//! Response rendering.
//!
//! Each command answers with one block of text whose first line carries the
//! `[T] ` timestamp prefix; follow-up lines of multi-line answers are bare.

use std::fmt::Write as _;

use switchyard_core::{OrderSummary, Receipt, Response, ScheduleRow, Ticket};

/// Render a response block, newline-terminated.
#[must_use]
pub fn render(timestamp: i32, response: &Response) -> String {
    let mut out = String::new();
    let _ = write!(out, "[{timestamp}] ");
    match response {
        Response::Unit => out.push('0'),
        Response::Farewell => out.push_str("bye"),
        Response::Profile(profile) => {
            let _ = write!(
                out,
                "{} {} {} {}",
                profile.username, profile.name, profile.email, profile.privilege
            );
        }
        Response::Schedule(schedule) => {
            let _ = write!(out, "{} {}", schedule.train_id, schedule.kind);
            for row in &schedule.rows {
                out.push('\n');
                push_schedule_row(&mut out, row);
            }
        }
        Response::Tickets(tickets) => {
            let _ = write!(out, "{}", tickets.len());
            for ticket in tickets {
                out.push('\n');
                push_ticket(&mut out, ticket);
            }
        }
        Response::Transfer(plan) => match plan {
            Some((first, second)) => {
                push_ticket(&mut out, first);
                out.push('\n');
                push_ticket(&mut out, second);
            }
            None => out.push('0'),
        },
        Response::Receipt(receipt) => match receipt {
            Receipt::Paid(total) => {
                let _ = write!(out, "{total}");
            }
            Receipt::Enqueued => out.push_str("queue"),
        },
        Response::Orders(orders) => {
            let _ = write!(out, "{}", orders.len());
            for order in orders {
                out.push('\n');
                push_order(&mut out, order);
            }
        }
    }
    out.push('\n');
    out
}

/// The `-1` failure line.
#[must_use]
pub fn render_failure(timestamp: i32) -> String {
    format!("[{timestamp}] -1\n")
}

fn push_ticket(out: &mut String, ticket: &Ticket) {
    let _ = write!(
        out,
        "{} {} {} -> {} {} {} {}",
        ticket.train_id, ticket.from, ticket.depart, ticket.to, ticket.arrive, ticket.price,
        ticket.seats
    );
}

fn push_order(out: &mut String, order: &OrderSummary) {
    let _ = write!(out, "[{}] ", order.status);
    push_ticket(out, &order.ticket);
}

fn push_schedule_row(out: &mut String, row: &ScheduleRow) {
    let _ = write!(out, "{} ", row.station);
    match row.arrive {
        Some(moment) => {
            let _ = write!(out, "{moment}");
        }
        None => out.push_str("xx-xx xx:xx"),
    }
    out.push_str(" -> ");
    match row.depart {
        Some(moment) => {
            let _ = write!(out, "{moment}");
        }
        None => out.push_str("xx-xx xx:xx"),
    }
    let _ = write!(out, " {} ", row.price);
    match row.seats {
        Some(seats) => {
            let _ = write!(out, "{seats}");
        }
        None => out.push('x'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::{Date, Instant, Moment, Profile};

    fn moment(date: &str, time: &str) -> Moment {
        Moment::new(Date::parse(date).unwrap(), Instant::parse(time).unwrap())
    }

    #[test]
    fn unit_and_failure_lines() {
        assert_eq!(render(7, &Response::Unit), "[7] 0\n");
        assert_eq!(render_failure(8), "[8] -1\n");
        assert_eq!(render(9, &Response::Farewell), "[9] bye\n");
    }

    #[test]
    fn profile_line() {
        let response = Response::Profile(Profile {
            username: "alice".into(),
            name: "Alice".into(),
            email: "a@x".into(),
            privilege: 5,
        });
        assert_eq!(render(3, &response), "[3] alice Alice a@x 5\n");
    }

    #[test]
    fn ticket_listing_counts_then_lines() {
        let response = Response::Tickets(vec![Ticket {
            train_id: "T1".into(),
            from: "A".into(),
            to: "C".into(),
            depart: moment("06-02", "08:00"),
            arrive: moment("06-02", "13:10"),
            price: 120,
            seats: 100,
        }]);
        assert_eq!(
            render(5, &response),
            "[5] 1\nT1 A 06-02 08:00 -> C 06-02 13:10 120 100\n"
        );
    }

    #[test]
    fn empty_transfer_is_zero() {
        assert_eq!(render(5, &Response::Transfer(None)), "[5] 0\n");
    }

    #[test]
    fn order_lines_carry_status_brackets() {
        let response = Response::Orders(vec![OrderSummary {
            status: "pending",
            ticket: Ticket {
                train_id: "T1".into(),
                from: "A".into(),
                to: "C".into(),
                depart: moment("06-02", "08:00"),
                arrive: moment("06-02", "13:10"),
                price: 600,
                seats: 5,
            },
        }]);
        assert_eq!(
            render(5, &response),
            "[5] 1\n[pending] T1 A 06-02 08:00 -> C 06-02 13:10 600 5\n"
        );
    }
}
