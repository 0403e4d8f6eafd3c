// SPDX-License-Identifier: Apache-2.0
//! Command-line tokenizer and parser.
//!
//! Every input line is `[T] verb -f value -g value ...`; list-valued flags
//! separate items with `|`. Parsing is strictly non-panicking: anything
//! malformed surfaces as a [`ParseError`] and becomes a `-1` response.

use switchyard_core::{
    AddTrain, AddUser, BuyTicket, Command, Date, DeleteTrain, Duration, Instant, Login, Logout,
    ModifyProfile, QueryOrder, QueryProfile, QueryTicket, QueryTrain, QueryTransfer, RefundTicket,
    ReleaseTrain, Rollback, SortKey,
};
/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The `[T]` timestamp prefix is missing or malformed.
    #[error("malformed timestamp prefix")]
    BadTimestamp,
    /// The verb is not one of the recognized commands.
    #[error("unknown verb: {0}")]
    UnknownVerb(String),
    /// A `-f value` pair is malformed or repeated.
    #[error("malformed flag: {0}")]
    BadFlag(String),
    /// A required flag is absent.
    #[error("missing required flag -{0}")]
    MissingFlag(char),
    /// A value failed to parse (number, date, time, list shape).
    #[error("malformed value for {0}")]
    BadValue(&'static str),
}

/// Split the `[T]` prefix off a line, returning the timestamp and the rest.
pub fn parse_timestamp(line: &str) -> Result<(i32, &str), Error> {
    let rest = line.trim_start();
    let rest = rest.strip_prefix('[').ok_or(Error::BadTimestamp)?;
    let close = rest.find(']').ok_or(Error::BadTimestamp)?;
    let timestamp: i32 = rest[..close].parse().map_err(|_| Error::BadTimestamp)?;
    Ok((timestamp, &rest[close + 1..]))
}

/// Flag table: single-letter keys, each at most once.
struct Flags<'a> {
    verb: &'a str,
    pairs: Vec<(char, &'a str)>,
}

impl<'a> Flags<'a> {
    fn parse(body: &'a str) -> Result<Self, Error> {
        let mut tokens = body.split_whitespace();
        let verb = tokens.next().ok_or_else(|| Error::UnknownVerb(String::new()))?;
        let mut pairs = Vec::new();
        while let Some(token) = tokens.next() {
            let key = token
                .strip_prefix('-')
                .filter(|k| k.len() == 1)
                .and_then(|k| k.chars().next())
                .ok_or_else(|| Error::BadFlag(token.to_owned()))?;
            let value = tokens.next().ok_or_else(|| Error::BadFlag(token.to_owned()))?;
            if pairs.iter().any(|(seen, _)| *seen == key) {
                return Err(Error::BadFlag(token.to_owned()));
            }
            pairs.push((key, value));
        }
        Ok(Self { verb, pairs })
    }

    fn get(&self, key: char) -> Option<&'a str> {
        self.pairs
            .iter()
            .find(|(flag, _)| *flag == key)
            .map(|(_, value)| *value)
    }

    fn required(&self, key: char) -> Result<&'a str, Error> {
        self.get(key).ok_or(Error::MissingFlag(key))
    }
}

fn parse_i32(value: &str, what: &'static str) -> Result<i32, Error> {
    value.parse().map_err(|_| Error::BadValue(what))
}

fn parse_usize(value: &str, what: &'static str) -> Result<usize, Error> {
    value.parse().map_err(|_| Error::BadValue(what))
}

fn parse_date(value: &str) -> Result<Date, Error> {
    Date::parse(value).ok_or(Error::BadValue("date"))
}

fn parse_sort(value: Option<&str>) -> Result<SortKey, Error> {
    match value {
        None | Some("time") => Ok(SortKey::Time),
        Some("cost") => Ok(SortKey::Cost),
        Some(_) => Err(Error::BadValue("sort key")),
    }
}

fn parse_bool(value: Option<&str>) -> Result<bool, Error> {
    match value {
        None | Some("false") => Ok(false),
        Some("true") => Ok(true),
        Some(_) => Err(Error::BadValue("boolean")),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value.split('|').map(str::to_owned).collect()
}

/// Parse the body of a command line (everything after the `[T]` prefix).
pub fn parse_command(body: &str) -> Result<Command, Error> {
    let flags = Flags::parse(body)?;
    match flags.verb {
        "add_user" => Ok(Command::AddUser(AddUser {
            current_user: flags.get('c').map(str::to_owned),
            username: flags.required('u')?.to_owned(),
            password: flags.required('p')?.to_owned(),
            name: flags.required('n')?.to_owned(),
            email: flags.required('m')?.to_owned(),
            privilege: flags
                .get('g')
                .map(|g| parse_i32(g, "privilege"))
                .transpose()?,
        })),
        "login" => Ok(Command::Login(Login {
            username: flags.required('u')?.to_owned(),
            password: flags.required('p')?.to_owned(),
        })),
        "logout" => Ok(Command::Logout(Logout {
            username: flags.required('u')?.to_owned(),
        })),
        "query_profile" => Ok(Command::QueryProfile(QueryProfile {
            current_user: flags.required('c')?.to_owned(),
            username: flags.required('u')?.to_owned(),
        })),
        "modify_profile" => Ok(Command::ModifyProfile(ModifyProfile {
            current_user: flags.required('c')?.to_owned(),
            username: flags.required('u')?.to_owned(),
            password: flags.get('p').map(str::to_owned),
            name: flags.get('n').map(str::to_owned),
            email: flags.get('m').map(str::to_owned),
            privilege: flags
                .get('g')
                .map(|g| parse_i32(g, "privilege"))
                .transpose()?,
        })),
        "add_train" => parse_add_train(&flags),
        "delete_train" => Ok(Command::DeleteTrain(DeleteTrain {
            train_id: flags.required('i')?.to_owned(),
        })),
        "release_train" => Ok(Command::ReleaseTrain(ReleaseTrain {
            train_id: flags.required('i')?.to_owned(),
        })),
        "query_train" => Ok(Command::QueryTrain(QueryTrain {
            train_id: flags.required('i')?.to_owned(),
            date: parse_date(flags.required('d')?)?,
        })),
        "query_ticket" => Ok(Command::QueryTicket(QueryTicket {
            from: flags.required('s')?.to_owned(),
            to: flags.required('t')?.to_owned(),
            date: parse_date(flags.required('d')?)?,
            sort: parse_sort(flags.get('p'))?,
        })),
        "query_transfer" => Ok(Command::QueryTransfer(QueryTransfer {
            from: flags.required('s')?.to_owned(),
            to: flags.required('t')?.to_owned(),
            date: parse_date(flags.required('d')?)?,
            sort: parse_sort(flags.get('p'))?,
        })),
        "buy_ticket" => Ok(Command::BuyTicket(BuyTicket {
            current_user: flags.required('u')?.to_owned(),
            train_id: flags.required('i')?.to_owned(),
            date: parse_date(flags.required('d')?)?,
            seats: parse_i32(flags.required('n')?, "seat count")?,
            from: flags.required('f')?.to_owned(),
            to: flags.required('t')?.to_owned(),
            queue: parse_bool(flags.get('q'))?,
        })),
        "query_order" => Ok(Command::QueryOrder(QueryOrder {
            current_user: flags.required('u')?.to_owned(),
        })),
        "refund_ticket" => Ok(Command::RefundTicket(RefundTicket {
            current_user: flags.required('u')?.to_owned(),
            index: flags
                .get('n')
                .map_or(Ok(1), |n| parse_usize(n, "order index"))?,
        })),
        "rollback" => Ok(Command::Rollback(Rollback {
            timestamp: parse_i32(flags.required('t')?, "timestamp")?,
        })),
        "clean" => Ok(Command::Clean),
        "exit" => Ok(Command::Exit),
        other => Err(Error::UnknownVerb(other.to_owned())),
    }
}

fn parse_add_train(flags: &Flags<'_>) -> Result<Command, Error> {
    let stop_count = parse_usize(flags.required('n')?, "station count")?;
    let stations = split_list(flags.required('s')?);
    let prices = split_list(flags.required('p')?)
        .iter()
        .map(|p| parse_i32(p, "price"))
        .collect::<Result<Vec<_>, _>>()?;
    let travel_times = split_list(flags.required('t')?)
        .iter()
        .map(|t| Duration::parse(t).ok_or(Error::BadValue("travel time")))
        .collect::<Result<Vec<_>, _>>()?;
    // Two-stop trains have no intermediate stop; the flag carries `_`.
    let stopover_raw = flags.required('o')?;
    let stopover_times = if stopover_raw == "_" {
        Vec::new()
    } else {
        split_list(stopover_raw)
            .iter()
            .map(|o| Duration::parse(o).ok_or(Error::BadValue("stopover time")))
            .collect::<Result<Vec<_>, _>>()?
    };
    let dates = split_list(flags.required('d')?);
    let [begin, end] = dates.as_slice() else {
        return Err(Error::BadValue("date range"));
    };
    let kind = flags.required('y')?;
    let mut kind_chars = kind.chars();
    let (Some(kind), None) = (kind_chars.next(), kind_chars.next()) else {
        return Err(Error::BadValue("train type"));
    };
    Ok(Command::AddTrain(AddTrain {
        train_id: flags.required('i')?.to_owned(),
        stop_count,
        seats: parse_i32(flags.required('m')?, "seat capacity")?,
        stations,
        prices,
        departure: Instant::parse(flags.required('x')?).ok_or(Error::BadValue("departure"))?,
        travel_times,
        stopover_times,
        dates: (parse_date(begin)?, parse_date(end)?),
        kind,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_prefix_parses() {
        let (ts, rest) = parse_timestamp("[42] query_order -u alice").unwrap();
        assert_eq!(ts, 42);
        assert_eq!(rest.trim(), "query_order -u alice");
        assert!(parse_timestamp("no-brackets").is_err());
        assert!(parse_timestamp("[x] verb").is_err());
    }

    #[test]
    fn add_user_with_optional_flags() {
        let cmd = parse_command("add_user -u root -p pw -n Root -m r@x -g 10").unwrap();
        let Command::AddUser(cmd) = cmd else {
            panic!("wrong command");
        };
        assert_eq!(cmd.username, "root");
        assert_eq!(cmd.privilege, Some(10));
        assert_eq!(cmd.current_user, None);
    }

    #[test]
    fn add_train_lists_split_on_pipe() {
        let cmd = parse_command(
            "add_train -i T1 -n 3 -m 100 -s A|B|C -p 50|70 -x 08:00 \
             -t 02:00|03:00 -o 00:10 -d 06-01|06-03 -y G",
        )
        .unwrap();
        let Command::AddTrain(cmd) = cmd else {
            panic!("wrong command");
        };
        assert_eq!(cmd.stop_count, 3);
        assert_eq!(cmd.stations, vec!["A", "B", "C"]);
        assert_eq!(cmd.prices, vec![50, 70]);
        assert_eq!(cmd.stopover_times.len(), 1);
        assert_eq!(cmd.kind, 'G');
    }

    #[test]
    fn two_stop_train_uses_placeholder_stopovers() {
        let cmd = parse_command(
            "add_train -i T2 -n 2 -m 10 -s A|B -p 5 -x 10:00 -t 01:00 -o _ -d 06-01|06-02 -y K",
        )
        .unwrap();
        let Command::AddTrain(cmd) = cmd else {
            panic!("wrong command");
        };
        assert!(cmd.stopover_times.is_empty());
    }

    #[test]
    fn missing_required_flag_is_an_error() {
        assert!(matches!(
            parse_command("login -u alice"),
            Err(Error::MissingFlag('p'))
        ));
    }

    #[test]
    fn unknown_verb_is_an_error() {
        assert!(matches!(
            parse_command("teleport -u alice"),
            Err(Error::UnknownVerb(_))
        ));
    }

    #[test]
    fn out_of_calendar_dates_are_rejected() {
        assert!(matches!(
            parse_command("query_ticket -s A -t B -d 09-01"),
            Err(Error::BadValue("date"))
        ));
    }

    #[test]
    fn refund_index_defaults_to_one() {
        let Command::RefundTicket(cmd) = parse_command("refund_ticket -u alice").unwrap() else {
            panic!("wrong command");
        };
        assert_eq!(cmd.index, 1);
    }

    #[test]
    fn queue_flag_parses() {
        let Command::BuyTicket(cmd) =
            parse_command("buy_ticket -u a -i T1 -d 06-01 -n 1 -f A -t B -q true").unwrap()
        else {
            panic!("wrong command");
        };
        assert!(cmd.queue);
    }
}
