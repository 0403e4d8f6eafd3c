// SPDX-License-Identifier: Apache-2.0
//! The timestamped rollback log.
//!
//! Every mutating command appends one entry per elementary effect, carrying
//! exactly the inverse information that effect needs. `rollback T` walks the
//! log tail backwards, dispatching each inverse and destroying the entry.
//!
//! Entries are managed records in their own file; the file's user-metadata
//! slot remembers the id of the last appended entry. Identifiers are handed
//! out sequentially and the log only ever destroys its own tail, so the
//! freelist returns them in exactly the order the backwards walk needs:
//! stepping `id - 1` visits entries in reverse insertion order.

use switchyard_store::codec::{ByteReader, ByteWriter, CodecError, Record};
use switchyard_store::{Managed, RecordId, StoreError, Table};

use crate::order::OrderStatus;
use crate::{DisplayName, Email, Password};

/// Tagged inverse of one elementary effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InverseOp {
    /// Undo a user creation.
    AddUser { id: RecordId },
    /// Restore the overwritten profile fields.
    ModifyProfile {
        id: RecordId,
        password: Option<Password>,
        name: Option<DisplayName>,
        email: Option<Email>,
        privilege: Option<i32>,
    },
    /// Undo a train creation.
    AddTrain { id: RecordId },
    /// Undo a soft-delete.
    DeleteTrain { id: RecordId },
    /// Undo a release (stop index entries and ride records included).
    ReleaseTrain { id: RecordId },
    /// Undo a purchase.
    BuyTicket { order: RecordId },
    /// Undo a refund, restoring the prior status.
    RefundTicket { order: RecordId, status: OrderStatus },
    /// Undo a queue promotion performed during someone else's refund.
    FulfillOrder { order: RecordId },
}

const TAG_ADD_USER: u8 = 0;
const TAG_MODIFY_PROFILE: u8 = 1;
const TAG_ADD_TRAIN: u8 = 2;
const TAG_DELETE_TRAIN: u8 = 3;
const TAG_RELEASE_TRAIN: u8 = 4;
const TAG_BUY_TICKET: u8 = 5;
const TAG_REFUND_TICKET: u8 = 6;
const TAG_FULFILL_ORDER: u8 = 7;

fn store_opt<T: Record>(value: &Option<T>, out: &mut ByteWriter<'_>) {
    let end = out.pos() + 1 + T::BYTES;
    match value {
        Some(inner) => {
            out.put_bool(true);
            inner.store(out);
        }
        None => out.put_bool(false),
    }
    out.zero_until(end);
}

fn load_opt<T: Record>(input: &mut ByteReader<'_>) -> Result<Option<T>, CodecError> {
    let end = input.pos() + 1 + T::BYTES;
    let present = input.bool()?;
    let value = if present { Some(T::load(input)?) } else { None };
    input.skip_until(end)?;
    Ok(value)
}

impl Record for InverseOp {
    // Tag byte plus the widest variant (the profile restore).
    const BYTES: usize = 1
        + 4
        + (1 + Password::BYTES)
        + (1 + DisplayName::BYTES)
        + (1 + Email::BYTES)
        + (1 + 4);

    fn store(&self, out: &mut ByteWriter<'_>) {
        let end = out.pos() + Self::BYTES;
        match self {
            Self::AddUser { id } => {
                out.put_u8(TAG_ADD_USER);
                out.put_u32(*id);
            }
            Self::ModifyProfile {
                id,
                password,
                name,
                email,
                privilege,
            } => {
                out.put_u8(TAG_MODIFY_PROFILE);
                out.put_u32(*id);
                store_opt(password, out);
                store_opt(name, out);
                store_opt(email, out);
                store_opt(privilege, out);
            }
            Self::AddTrain { id } => {
                out.put_u8(TAG_ADD_TRAIN);
                out.put_u32(*id);
            }
            Self::DeleteTrain { id } => {
                out.put_u8(TAG_DELETE_TRAIN);
                out.put_u32(*id);
            }
            Self::ReleaseTrain { id } => {
                out.put_u8(TAG_RELEASE_TRAIN);
                out.put_u32(*id);
            }
            Self::BuyTicket { order } => {
                out.put_u8(TAG_BUY_TICKET);
                out.put_u32(*order);
            }
            Self::RefundTicket { order, status } => {
                out.put_u8(TAG_REFUND_TICKET);
                out.put_u32(*order);
                status.store(out);
            }
            Self::FulfillOrder { order } => {
                out.put_u8(TAG_FULFILL_ORDER);
                out.put_u32(*order);
            }
        }
        out.zero_until(end);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let end = input.pos() + Self::BYTES;
        let tag = input.u8()?;
        let op = match tag {
            TAG_ADD_USER => Self::AddUser { id: input.u32()? },
            TAG_MODIFY_PROFILE => Self::ModifyProfile {
                id: input.u32()?,
                password: load_opt(input)?,
                name: load_opt(input)?,
                email: load_opt(input)?,
                privilege: load_opt(input)?,
            },
            TAG_ADD_TRAIN => Self::AddTrain { id: input.u32()? },
            TAG_DELETE_TRAIN => Self::DeleteTrain { id: input.u32()? },
            TAG_RELEASE_TRAIN => Self::ReleaseTrain { id: input.u32()? },
            TAG_BUY_TICKET => Self::BuyTicket { order: input.u32()? },
            TAG_REFUND_TICKET => Self::RefundTicket {
                order: input.u32()?,
                status: OrderStatus::load(input)?,
            },
            TAG_FULFILL_ORDER => Self::FulfillOrder { order: input.u32()? },
            _ => return Err(CodecError::InvalidEnum),
        };
        input.skip_until(end)?;
        Ok(op)
    }
}

/// One appended inverse, stamped with its command's timestamp.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LogEntry {
    pub timestamp: i32,
    pub op: InverseOp,
}

impl Record for LogEntry {
    const BYTES: usize = 4 + InverseOp::BYTES;

    fn store(&self, out: &mut ByteWriter<'_>) {
        out.put_i32(self.timestamp);
        self.op.store(out);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            timestamp: input.i32()?,
            op: InverseOp::load(input)?,
        })
    }
}

/// File metadata of the log: the id of the last appended entry, or -1.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LogCursor {
    last: i64,
}

impl Default for LogCursor {
    fn default() -> Self {
        Self { last: -1 }
    }
}

impl Record for LogCursor {
    const BYTES: usize = 8;

    fn store(&self, out: &mut ByteWriter<'_>) {
        out.put_i64(self.last);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self { last: input.i64()? })
    }
}

/// The append-only, tail-destructive rollback log.
#[derive(Debug)]
pub(crate) struct RollbackLog {
    table: Table<LogEntry, LogCursor>,
}

impl RollbackLog {
    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        Ok(Self {
            table: Table::open(path)?,
        })
    }

    /// Append an inverse stamped `timestamp` and advance the cursor.
    pub fn append(&mut self, timestamp: i32, op: InverseOp) -> Result<(), StoreError> {
        let mut entry = Managed::fresh(LogEntry { timestamp, op });
        let id = entry.save(&mut self.table)?;
        self.table.set_meta(&LogCursor {
            last: i64::from(id),
        })
    }

    /// Id of the newest live entry.
    pub fn last_id(&mut self) -> Result<Option<RecordId>, StoreError> {
        let cursor = self.table.meta()?;
        Ok(u32::try_from(cursor.last).ok())
    }

    pub fn entry(&mut self, id: RecordId) -> Result<LogEntry, StoreError> {
        self.table.get(id).map(|entry| *entry)
    }

    /// Destroy the tail entry `id`; its chunk returns to the freelist so
    /// the next append reuses it.
    pub fn discard(&mut self, id: RecordId) -> Result<(), StoreError> {
        let mut entry = self.table.get(id)?;
        entry.destroy(&mut self.table)
    }

    /// Persist the cursor after a backwards walk.
    pub fn set_last(&mut self, id: Option<RecordId>) -> Result<(), StoreError> {
        self.table.set_meta(&LogCursor {
            last: id.map_or(-1, i64::from),
        })
    }

    pub fn truncate(&mut self) -> Result<(), StoreError> {
        self.table.truncate()
    }
}
