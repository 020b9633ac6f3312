//! The athletics database the demo commands run against.

use chrono::NaiveDate;
use joinery_core::Schema;
use joinery_derive::Table;
use joinery_orm::{Connection, Result};
use tracing::{debug, info};

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

/// Schema of the athletics tables.
///
/// # Errors
///
/// Fails only if the table definitions above are inconsistent.
pub fn athletics() -> Result<Schema> {
    Schema::builder()
        .table::<OrganizationTable>()
        .table::<ClubTable>()
        .table::<AthleteTable>()
        .table::<SeriesTable>()
        .table::<CompetitionTable>()
        .build()
}

const CREATE: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS organization (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS club (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        organization_id INTEGER NOT NULL REFERENCES organization (id)
    )",
    "CREATE TABLE IF NOT EXISTS athlete (
        id INTEGER PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        gender TEXT NOT NULL,
        year_of_birth INTEGER NOT NULL,
        club_id INTEGER REFERENCES club (id),
        organization_id INTEGER NOT NULL REFERENCES organization (id)
    )",
    "CREATE TABLE IF NOT EXISTS series (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        organization_id INTEGER NOT NULL REFERENCES organization (id)
    )",
    "CREATE TABLE IF NOT EXISTS competition (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        competition_date DATE NOT NULL,
        series_id INTEGER REFERENCES series (id),
        organization_id INTEGER NOT NULL REFERENCES organization (id)
    )",
];

const SEED: &[&str] = &[
    "INSERT OR IGNORE INTO organization (id, name) VALUES (1, 'Swiss Athletics')",
    "INSERT OR IGNORE INTO club (id, name, organization_id)
        VALUES (1, 'Louisiana State University', 1)",
    "INSERT OR IGNORE INTO athlete
        (id, first_name, last_name, gender, year_of_birth, club_id, organization_id)
        VALUES (1000, 'Armand', 'Duplantis', 'M', 1999, 1, 1)",
    "INSERT OR IGNORE INTO series (id, name, organization_id) VALUES (1, 'Diamond League', 1)",
    "INSERT OR IGNORE INTO competition (id, name, competition_date, series_id, organization_id)
        VALUES (1, 'Diamond League 2022', '2022-06-30', 1, 1)",
];

/// Creates the tables that do not exist yet, optionally with demo rows.
///
/// # Errors
///
/// Returns the first statement the database rejects.
pub async fn create(conn: &mut impl Connection, seed: bool) -> Result<()> {
    for statement in CREATE {
        conn.execute(statement, &[]).await?;
    }
    debug!(tables = CREATE.len(), "Tables ready");
    if seed {
        for statement in SEED {
            conn.execute(statement, &[]).await?;
        }
        info!("Demo rows inserted");
    }
    Ok(())
}
