// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

mod common;

use common::{add_user, buy, fails, login, ok, query_order, query_ticket, refund, rollback,
    sample_train};
use switchyard_core::{
    Command, ModifyProfile, QueryProfile, QueryTrain, Receipt, ReleaseTrain, Response, SortKey,
    System,
};
use tempfile::TempDir;

fn fresh() -> (TempDir, System) {
    let dir = TempDir::new().unwrap();
    let system = System::open(dir.path()).unwrap();
    (dir, system)
}

fn release(id: &str) -> Command {
    Command::ReleaseTrain(ReleaseTrain {
        train_id: id.to_owned(),
    })
}

fn query_profile(current: &str, target: &str) -> Command {
    Command::QueryProfile(QueryProfile {
        current_user: current.to_owned(),
        username: target.to_owned(),
    })
}

#[test]
fn rollback_undoes_add_user() {
    let (_dir, mut system) = fresh();
    ok(&mut system, 1, add_user(None, "root", None));
    ok(&mut system, 2, login("root"));
    ok(&mut system, 3, add_user(Some("root"), "alice", Some(1)));

    ok(&mut system, 4, rollback(2));

    // Alice is gone; sessions were flushed too.
    fails(&mut system, 5, login("alice"));
    ok(&mut system, 6, login("root"));
    fails(&mut system, 7, query_profile("root", "alice"));
}

#[test]
fn rollback_restores_modified_profile_fields() {
    let (_dir, mut system) = fresh();
    ok(&mut system, 1, add_user(None, "root", None));
    ok(&mut system, 2, login("root"));
    ok(
        &mut system,
        3,
        Command::ModifyProfile(ModifyProfile {
            current_user: "root".into(),
            username: "root".into(),
            password: None,
            name: Some("Renamed".into()),
            email: Some("new@x".into()),
            privilege: None,
        }),
    );

    ok(&mut system, 4, rollback(2));
    ok(&mut system, 5, login("root"));
    let Response::Profile(profile) = ok(&mut system, 6, query_profile("root", "root")) else {
        panic!("expected profile");
    };
    assert_eq!(profile.name, "Nroot");
    assert_eq!(profile.email, "root@x");
}

#[test]
fn rollback_undoes_train_lifecycle() {
    let (_dir, mut system) = fresh();
    ok(&mut system, 1, add_user(None, "root", None));
    ok(&mut system, 2, login("root"));
    ok(&mut system, 3, sample_train("T1"));
    ok(&mut system, 4, release("T1"));

    // Release rolled back: the train exists again unreleased, its rides and
    // stop-index entries are gone.
    ok(&mut system, 5, rollback(3));
    let Response::Tickets(tickets) = ok(
        &mut system,
        6,
        query_ticket("A", "C", "06-02", SortKey::Time),
    ) else {
        panic!("expected tickets");
    };
    assert!(tickets.is_empty());
    // query_train still answers (synthetic full ride for unreleased trains).
    let Response::Schedule(schedule) = ok(
        &mut system,
        7,
        Command::QueryTrain(QueryTrain {
            train_id: "T1".into(),
            date: switchyard_core::Date::parse("06-02").unwrap(),
        }),
    ) else {
        panic!("expected schedule");
    };
    assert_eq!(schedule.train_id, "T1");
    assert_eq!(schedule.rows.len(), 3);
    assert_eq!(schedule.rows[0].seats, Some(100));

    // Creation rolled back: the train is gone entirely.
    ok(&mut system, 8, rollback(2));
    fails(
        &mut system,
        9,
        Command::QueryTrain(QueryTrain {
            train_id: "T1".into(),
            date: switchyard_core::Date::parse("06-02").unwrap(),
        }),
    );
}

#[test]
fn rollback_restores_seats_taken_by_a_purchase() {
    let (_dir, mut system) = fresh();
    ok(&mut system, 1, add_user(None, "root", None));
    ok(&mut system, 2, login("root"));
    ok(&mut system, 3, sample_train("T1"));
    ok(&mut system, 4, release("T1"));
    let response = ok(&mut system, 5, buy("root", "T1", "06-02", 40, "A", "C", false));
    assert_eq!(response, Response::Receipt(Receipt::Paid(40 * 120)));

    ok(&mut system, 6, rollback(4));
    ok(&mut system, 7, login("root"));
    let Response::Tickets(tickets) = ok(
        &mut system,
        8,
        query_ticket("A", "C", "06-02", SortKey::Time),
    ) else {
        panic!("expected tickets");
    };
    assert_eq!(tickets[0].seats, 100);
    // The order itself is gone.
    let Response::Orders(orders) = ok(&mut system, 9, query_order("root")) else {
        panic!("expected orders");
    };
    assert!(orders.is_empty());
}

#[test]
fn rollback_undoes_refund_and_requeues_fulfilled_orders() {
    let (_dir, mut system) = fresh();
    ok(&mut system, 1, add_user(None, "root", None));
    ok(&mut system, 2, login("root"));
    ok(&mut system, 3, sample_train("T1"));
    ok(&mut system, 4, release("T1"));
    ok(&mut system, 5, add_user(Some("root"), "alice", Some(1)));
    ok(&mut system, 6, add_user(Some("root"), "bob", Some(1)));
    ok(&mut system, 7, login("alice"));
    ok(&mut system, 8, login("bob"));
    ok(&mut system, 9, buy("alice", "T1", "06-02", 95, "A", "C", false));
    ok(&mut system, 10, buy("bob", "T1", "06-02", 10, "A", "C", true));
    ok(&mut system, 11, refund("alice", 1));

    // After the refund Bob's order was promoted. Rolling the refund back
    // must demote it to pending again and restore Alice's order.
    ok(&mut system, 12, rollback(10));
    ok(&mut system, 13, login("alice"));
    ok(&mut system, 14, login("bob"));
    let Response::Orders(orders) = ok(&mut system, 15, query_order("bob")) else {
        panic!("expected orders");
    };
    assert_eq!(orders[0].status, "pending");
    let Response::Orders(orders) = ok(&mut system, 16, query_order("alice")) else {
        panic!("expected orders");
    };
    assert_eq!(orders[0].status, "success");
    let Response::Tickets(tickets) = ok(
        &mut system,
        17,
        query_ticket("A", "C", "06-02", SortKey::Time),
    ) else {
        panic!("expected tickets");
    };
    assert_eq!(tickets[0].seats, 5);

    // A refund after the rollback promotes Bob exactly as the original did.
    ok(&mut system, 18, refund("alice", 1));
    let Response::Orders(orders) = ok(&mut system, 19, query_order("bob")) else {
        panic!("expected orders");
    };
    assert_eq!(orders[0].status, "success");
}

#[test]
fn rollback_to_the_future_is_rejected() {
    let (_dir, mut system) = fresh();
    ok(&mut system, 1, add_user(None, "root", None));
    fails(&mut system, 2, rollback(10));
}

#[test]
fn rollback_is_idempotent_at_the_same_barrier() {
    let (_dir, mut system) = fresh();
    ok(&mut system, 1, add_user(None, "root", None));
    ok(&mut system, 2, login("root"));
    ok(&mut system, 3, sample_train("T1"));
    ok(&mut system, 4, rollback(1));
    ok(&mut system, 5, rollback(1));
    ok(&mut system, 6, login("root"));
    fails(
        &mut system,
        7,
        Command::QueryTrain(QueryTrain {
            train_id: "T1".into(),
            date: switchyard_core::Date::parse("06-02").unwrap(),
        }),
    );
}

#[test]
fn state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mut system = System::open(dir.path()).unwrap();
        ok(&mut system, 1, add_user(None, "root", None));
        ok(&mut system, 2, login("root"));
        ok(&mut system, 3, sample_train("T1"));
        ok(&mut system, 4, release("T1"));
        ok(&mut system, 5, buy("root", "T1", "06-02", 5, "A", "C", false));
    }
    let mut system = System::open(dir.path()).unwrap();
    // Sessions are memory-only; everything else persisted.
    fails(&mut system, 6, query_order("root"));
    ok(&mut system, 7, login("root"));
    let Response::Orders(orders) = ok(&mut system, 8, query_order("root")) else {
        panic!("expected orders");
    };
    assert_eq!(orders.len(), 1);
    // Rollback still works across the restart.
    ok(&mut system, 9, rollback(4));
    ok(&mut system, 10, login("root"));
    let Response::Orders(orders) = ok(&mut system, 11, query_order("root")) else {
        panic!("expected orders");
    };
    assert!(orders.is_empty());
}
