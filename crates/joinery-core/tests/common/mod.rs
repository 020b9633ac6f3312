#![allow(dead_code)]

use chrono::NaiveDate;
use joinery_core::{BuildStatement, GenericDialect, Rendered, Schema};
use joinery_derive::Table;

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

pub fn render(statement: &impl BuildStatement) -> Rendered {
    statement
        .to_sql(&schema(), &GenericDialect)
        .unwrap_or_else(|e| panic!("failed to build statement: {e}"))
}
