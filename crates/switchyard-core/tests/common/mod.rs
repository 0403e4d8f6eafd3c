// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs, dead_code)]

use switchyard_core::{
    AddTrain, AddUser, BuyTicket, Command, Date, Duration, Instant, Login, QueryOrder,
    QueryTicket, QueryTransfer, RefundTicket, Response, SortKey, System,
};

/// Run a command, requiring success.
pub fn ok(system: &mut System, ts: i32, cmd: Command) -> Response {
    system
        .execute(ts, &cmd)
        .unwrap_or_else(|err| panic!("command at [{ts}] failed: {err}"))
}

/// Run a command, requiring a recoverable failure.
pub fn fails(system: &mut System, ts: i32, cmd: Command) {
    let result = system.execute(ts, &cmd);
    match result {
        Ok(response) => panic!("command at [{ts}] unexpectedly succeeded: {response:?}"),
        Err(err) => assert!(!err.is_fatal(), "fatal error at [{ts}]: {err}"),
    }
}

pub fn add_user(current: Option<&str>, username: &str, privilege: Option<i32>) -> Command {
    Command::AddUser(AddUser {
        current_user: current.map(str::to_owned),
        username: username.to_owned(),
        password: format!("pw-{username}"),
        name: format!("N{username}"),
        email: format!("{username}@x"),
        privilege,
    })
}

pub fn login(username: &str) -> Command {
    Command::Login(Login {
        username: username.to_owned(),
        password: format!("pw-{username}"),
    })
}

/// The three-stop sample train used across scenarios: A -> B -> C departing
/// 08:00, 100 seats, running 06-01 through 06-03.
pub fn sample_train(id: &str) -> Command {
    Command::AddTrain(AddTrain {
        train_id: id.to_owned(),
        stop_count: 3,
        seats: 100,
        stations: vec!["A".into(), "B".into(), "C".into()],
        prices: vec![50, 70],
        departure: Instant::parse("08:00").unwrap(),
        travel_times: vec![
            Duration::parse("02:00").unwrap(),
            Duration::parse("03:00").unwrap(),
        ],
        stopover_times: vec![Duration::parse("00:10").unwrap()],
        dates: (Date::parse("06-01").unwrap(), Date::parse("06-03").unwrap()),
        kind: 'G',
    })
}

pub fn buy(user: &str, train: &str, date: &str, seats: i32, from: &str, to: &str, queue: bool) -> Command {
    Command::BuyTicket(BuyTicket {
        current_user: user.to_owned(),
        train_id: train.to_owned(),
        date: Date::parse(date).unwrap(),
        seats,
        from: from.to_owned(),
        to: to.to_owned(),
        queue,
    })
}

pub fn query_ticket(from: &str, to: &str, date: &str, sort: SortKey) -> Command {
    Command::QueryTicket(QueryTicket {
        from: from.to_owned(),
        to: to.to_owned(),
        date: Date::parse(date).unwrap(),
        sort,
    })
}

pub fn query_transfer(from: &str, to: &str, date: &str, sort: SortKey) -> Command {
    Command::QueryTransfer(QueryTransfer {
        from: from.to_owned(),
        to: to.to_owned(),
        date: Date::parse(date).unwrap(),
        sort,
    })
}

pub fn query_order(user: &str) -> Command {
    Command::QueryOrder(QueryOrder {
        current_user: user.to_owned(),
    })
}

pub fn refund(user: &str, index: usize) -> Command {
    Command::RefundTicket(RefundTicket {
        current_user: user.to_owned(),
        index,
    })
}

pub fn rollback(timestamp: i32) -> Command {
    Command::Rollback(switchyard_core::Rollback { timestamp })
}
