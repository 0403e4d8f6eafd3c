// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

use switchyard_store::codec::{ByteReader, ByteWriter, CodecError, Record};
use switchyard_store::{Managed, StoreError, Table, Varchar};
use tempfile::TempDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Waybill {
    code: Varchar<12>,
    weight: i32,
    sealed: bool,
}

impl Record for Waybill {
    const BYTES: usize = Varchar::<12>::BYTES + 4 + 1;

    fn store(&self, out: &mut ByteWriter<'_>) {
        self.code.store(out);
        out.put_i32(self.weight);
        out.put_bool(self.sealed);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            code: Varchar::load(input)?,
            weight: input.i32()?,
            sealed: input.bool()?,
        })
    }
}

fn waybill(code: &str, weight: i32) -> Waybill {
    Waybill {
        code: Varchar::new(code).unwrap(),
        weight,
        sealed: false,
    }
}

#[test]
fn save_then_get_returns_the_same_value() {
    let dir = TempDir::new().unwrap();
    let mut table: Table<Waybill> = Table::open(&dir.path().join("waybills")).unwrap();
    let mut row = Managed::fresh(waybill("WB-001", 120));
    let id = row.save(&mut table).unwrap();
    let loaded = table.get(id).unwrap();
    assert_eq!(*loaded, *row);
    assert_eq!(loaded.id(), Some(id));
}

#[test]
fn save_twice_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut table: Table<Waybill> = Table::open(&dir.path().join("waybills")).unwrap();
    let mut row = Managed::fresh(waybill("WB-002", 1));
    row.save(&mut table).unwrap();
    assert!(matches!(
        row.save(&mut table),
        Err(StoreError::AlreadySaved)
    ));
}

#[test]
fn update_requires_a_saved_record() {
    let dir = TempDir::new().unwrap();
    let mut table: Table<Waybill> = Table::open(&dir.path().join("waybills")).unwrap();
    let row = Managed::fresh(waybill("WB-003", 2));
    assert!(matches!(row.update(&mut table), Err(StoreError::NotSaved)));
}

#[test]
fn update_rewrites_in_place() {
    let dir = TempDir::new().unwrap();
    let mut table: Table<Waybill> = Table::open(&dir.path().join("waybills")).unwrap();
    let mut row = Managed::fresh(waybill("WB-004", 10));
    let id = row.save(&mut table).unwrap();
    row.weight = 99;
    row.sealed = true;
    row.update(&mut table).unwrap();
    let loaded = table.get(id).unwrap();
    assert_eq!(loaded.weight, 99);
    assert!(loaded.sealed);
}

#[test]
fn destroy_releases_the_id_for_reuse() {
    let dir = TempDir::new().unwrap();
    let mut table: Table<Waybill> = Table::open(&dir.path().join("waybills")).unwrap();
    let mut first = Managed::fresh(waybill("WB-005", 5));
    let id = first.save(&mut table).unwrap();
    first.destroy(&mut table).unwrap();
    assert_eq!(first.id(), None);

    let mut second = Managed::fresh(waybill("WB-006", 6));
    assert_eq!(second.save(&mut table).unwrap(), id);
}
