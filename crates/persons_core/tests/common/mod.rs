#![allow(dead_code)]

use chrono::NaiveDate;
use persons_core::db::open_db;
use persons_core::model::{Gender, PhoneNumberType};
use persons_core::service::{CreatePerson, NewPhoneNumber};
use persons_core::{dispatch, AppResult, HandlerContext, LocalFileStorage, Request, Store};
use rusqlite::Connection;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Store with the seeded cities, persons, phone numbers and relationships.
pub fn seeded_store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("persons.sqlite3")).unwrap();
    (dir, store)
}

/// Store keeping only the seeded cities.
pub fn store_without_persons() -> (TempDir, Store) {
    let (dir, store) = seeded_store();
    raw(&store)
        .execute_batch("DELETE FROM relationships; DELETE FROM phone_numbers; DELETE FROM persons;")
        .unwrap();
    (dir, store)
}

/// Side connection for assertions outside any unit of work.
pub fn raw(store: &Store) -> Connection {
    open_db(store.path()).unwrap()
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

/// Appends `count` persons named "Bulk", each owning one phone number.
pub fn bulk_persons(conn: &Connection, count: i64) {
    conn.execute(
        "INSERT INTO persons (
            name, surname, gender, personal_number, date_of_birth, city_id, created_at, updated_at
         )
         WITH RECURSIVE seq(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM seq WHERE i < ?1)
         SELECT 'Bulk', 'Person', 'other', printf('%011d', 50000000000 + i), '1990-01-01',
                1 + i % 4, 0, 0
         FROM seq;",
        [count],
    )
    .unwrap();
    conn.execute_batch(
        "INSERT INTO phone_numbers (number_type, number, person_id, created_at, updated_at)
         SELECT 'home', printf('%07d', id), id, 0, 0 FROM persons WHERE name = 'Bulk';",
    )
    .unwrap();
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn create_alex(personal_number: &str) -> CreatePerson {
    CreatePerson {
        name: "Alex".to_string(),
        surname: "Johnson".to_string(),
        gender: Gender::Male,
        personal_number: personal_number.to_string(),
        date_of_birth: date(1990, 1, 1),
        city_id: 1,
        phone_numbers: vec![NewPhoneNumber {
            number_type: PhoneNumberType::Mobile,
            number: "5551234".to_string(),
        }],
        related_individuals: Vec::new(),
    }
}

/// Runs each request through `dispatch` on a fresh unit of work.
pub struct Harness {
    pub store: Store,
    pub files: LocalFileStorage,
    pub cancel: CancellationToken,
    _dir: TempDir,
}

impl Harness {
    pub fn seeded() -> Self {
        Self::from_store(seeded_store())
    }

    pub fn without_persons() -> Self {
        Self::from_store(store_without_persons())
    }

    fn from_store((dir, store): (TempDir, Store)) -> Self {
        let files = LocalFileStorage::new(dir.path().join("images"));
        Self {
            store,
            files,
            cancel: CancellationToken::new(),
            _dir: dir,
        }
    }

    pub fn run<R: Request>(&self, request: R) -> AppResult<R::Response> {
        let mut uow = self.store.unit_of_work().unwrap();
        dispatch(request, &mut uow, &HandlerContext::new(&self.cancel, &self.files))
    }

    pub fn count(&self, table: &str) -> i64 {
        count(&raw(&self.store), table)
    }
}
