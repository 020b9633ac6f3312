#![allow(dead_code)]

use chrono::NaiveDate;
use joinery_core::Schema;
use joinery_derive::Table;
use joinery_orm::{Connection, Dsl};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

#[derive(Debug, Clone, PartialEq, Table)]
pub struct Organization {
    #[column(primary_key, generated)]
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Table)]
pub struct Club {
    #[column(primary_key, generated)]
    pub id: i64,
    pub name: String,
    #[column(references = Organization)]
    pub organization_id: i64,
}

#[derive(Debug, Clone, PartialEq, Table)]
pub struct Athlete {
    #[column(primary_key, generated)]
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub year_of_birth: i32,
    #[column(references = Club)]
    pub club_id: Option<i64>,
    #[column(references = Organization)]
    pub organization_id: i64,
}

#[derive(Debug, Clone, PartialEq, Table)]
pub struct Series {
    #[column(primary_key, generated)]
    pub id: i64,
    pub name: String,
    #[column(references = Organization)]
    pub organization_id: i64,
}

#[derive(Debug, Clone, PartialEq, Table)]
pub struct Competition {
    #[column(primary_key, generated)]
    pub id: i64,
    pub name: String,
    pub competition_date: NaiveDate,
    #[column(references = Series)]
    pub series_id: Option<i64>,
    #[column(references = Organization)]
    pub organization_id: i64,
}

#[derive(Debug, Clone, PartialEq, Table)]
pub struct Transfer {
    #[column(primary_key, generated)]
    pub id: i64,
    #[column(references = Athlete)]
    pub athlete_id: i64,
    #[column(references = Club)]
    pub from_club_id: i64,
    #[column(references = Club)]
    pub to_club_id: i64,
}

const DDL: &[&str] = &[
    "CREATE TABLE organization (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
    "CREATE TABLE club (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        organization_id INTEGER NOT NULL REFERENCES organization (id)
    )",
    "CREATE TABLE athlete (
        id INTEGER PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        gender TEXT NOT NULL,
        year_of_birth INTEGER NOT NULL,
        club_id INTEGER REFERENCES club (id),
        organization_id INTEGER NOT NULL REFERENCES organization (id)
    )",
    "CREATE TABLE series (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        organization_id INTEGER NOT NULL REFERENCES organization (id)
    )",
    "CREATE TABLE competition (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        competition_date DATE NOT NULL,
        series_id INTEGER REFERENCES series (id),
        organization_id INTEGER NOT NULL REFERENCES organization (id)
    )",
    "CREATE TABLE transfer (
        id INTEGER PRIMARY KEY,
        athlete_id INTEGER NOT NULL REFERENCES athlete (id),
        from_club_id INTEGER NOT NULL REFERENCES club (id),
        to_club_id INTEGER NOT NULL REFERENCES club (id)
    )",
];

const SEED: &[&str] = &[
    "INSERT INTO organization (id, name) VALUES (1, 'Swiss Athletics')",
    "INSERT INTO club (id, name, organization_id) VALUES (1, 'Louisiana State University', 1)",
    "INSERT INTO club (id, name, organization_id) VALUES (2, 'LC Zürich', 1)",
    "INSERT INTO athlete (id, first_name, last_name, gender, year_of_birth, club_id, organization_id)
        VALUES (1000, 'Armand', 'Duplantis', 'M', 1999, 1, 1)",
    "INSERT INTO series (id, name, organization_id) VALUES (1, 'Diamond League', 1)",
    "INSERT INTO series (id, name, organization_id) VALUES (2, 'Indoor Tour', 1)",
    "INSERT INTO competition (id, name, competition_date, series_id, organization_id)
        VALUES (1, 'Diamond League 2022', '2022-06-30', 1, 1)",
    "INSERT INTO transfer (id, athlete_id, from_club_id, to_club_id) VALUES (1, 1000, 2, 1)",
];

pub fn schema() -> Schema {
    Schema::builder()
        .table::<OrganizationTable>()
        .table::<ClubTable>()
        .table::<AthleteTable>()
        .table::<SeriesTable>()
        .table::<CompetitionTable>()
        .table::<TransferTable>()
        .build()
        .unwrap_or_else(|e| panic!("athletics schema is invalid: {e}"))
}

/// A fresh in-memory database with the athletics tables and seed rows.
pub async fn pool() -> SqlitePool {
    let mut pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("in-memory database");
    for statement in DDL.iter().chain(SEED) {
        pool.execute(statement, &[])
            .await
            .unwrap_or_else(|e| panic!("fixture statement failed: {e}"));
    }
    pool
}

pub async fn dsl() -> Dsl<SqlitePool> {
    Dsl::new(pool().await, schema())
}
