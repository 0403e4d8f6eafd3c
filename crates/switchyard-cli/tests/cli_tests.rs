// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn switchyard(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("switchyard").unwrap();
    cmd.arg("--data-dir").arg(dir.path());
    cmd
}

#[test]
fn exit_says_bye_and_succeeds() {
    let dir = TempDir::new().unwrap();
    switchyard(&dir)
        .write_stdin("[1] exit\n")
        .assert()
        .success()
        .stdout("[1] bye\n");
}

#[test]
fn bootstrap_journey_end_to_end() {
    let dir = TempDir::new().unwrap();
    let script = "\
[1] add_user -c root -u root -p pw -n Root -m r@x -g 10
[2] login -u root -p pw
[3] add_train -i T1 -n 3 -m 100 -s A|B|C -p 50|70 -x 08:00 -t 02:00|03:00 -o 00:10 -d 06-01|06-03 -y G
[4] release_train -i T1
[5] query_ticket -s A -t C -d 06-02
[6] add_user -c root -u alice -p pw2 -n Alice -m a@x -g 1
[7] login -u alice -p pw2
[8] buy_ticket -u alice -i T1 -d 06-02 -n 5 -f A -t C
[9] exit
";
    let expected = "\
[1] 0
[2] 0
[3] 0
[4] 0
[5] 1
T1 A 06-02 08:00 -> C 06-02 13:10 120 100
[6] 0
[7] 0
[8] 600
[9] bye
";
    switchyard(&dir)
        .write_stdin(script)
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn domain_failures_answer_minus_one() {
    let dir = TempDir::new().unwrap();
    let script = "\
[1] add_user -c root -u root -p pw -n Root -m r@x -g 10
[2] login -u root -p wrong
[3] logout -u nobody
[4] exit
";
    let expected = "\
[1] 0
[2] -1
[3] -1
[4] bye
";
    switchyard(&dir)
        .write_stdin(script)
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn malformed_commands_answer_minus_one() {
    let dir = TempDir::new().unwrap();
    let script = "\
[1] teleport -u root
[2] login -u root
[3] exit
";
    switchyard(&dir)
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::contains("[1] -1").and(predicate::str::contains("[2] -1")));
}

#[test]
fn state_persists_between_invocations() {
    let dir = TempDir::new().unwrap();
    switchyard(&dir)
        .write_stdin("[1] add_user -c root -u root -p pw -n Root -m r@x -g 10\n[2] exit\n")
        .assert()
        .success();
    // A second process sees the user (duplicate bootstrap rejected, login works).
    switchyard(&dir)
        .write_stdin("[3] login -u root -p pw\n[4] query_profile -c root -u root\n[5] exit\n")
        .assert()
        .success()
        .stdout("[3] 0\n[4] root Root r@x 10\n[5] bye\n");
}

#[test]
fn queue_and_refund_flow_through_the_binary() {
    let dir = TempDir::new().unwrap();
    let script = "\
[1] add_user -c root -u root -p pw -n Root -m r@x -g 10
[2] login -u root -p pw
[3] add_train -i T1 -n 3 -m 100 -s A|B|C -p 50|70 -x 08:00 -t 02:00|03:00 -o 00:10 -d 06-01|06-03 -y G
[4] release_train -i T1
[5] add_user -c root -u bob -p pw3 -n Bobby -m b@x -g 1
[6] login -u bob -p pw3
[7] buy_ticket -u root -i T1 -d 06-02 -n 95 -f A -t C
[8] buy_ticket -u bob -i T1 -d 06-02 -n 10 -f A -t C -q true
[9] refund_ticket -u root
[10] query_order -u bob
[11] exit
";
    let expected = "\
[1] 0
[2] 0
[3] 0
[4] 0
[5] 0
[6] 0
[7] 11400
[8] queue
[9] 0
[10] 1
[success] T1 A 06-02 08:00 -> C 06-02 13:10 1200 10
[11] bye
";
    switchyard(&dir)
        .write_stdin(script)
        .assert()
        .success()
        .stdout(expected);
}
