//! Hand-written table handles for unit tests, shaped like the output of
//! `#[derive(Table)]`.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::expr::Field;
use crate::schema::{ColumnDef, ForeignKeyDef, Schema, Table, TableDef, TablePath, TableRow};
use crate::types::DataType;
use crate::value::{FromSqlValue, SqlValue, ToSqlValue};

macro_rules! fixture_table {
    (
        $handle:ident, $row:ident, $name:literal,
        columns: [$(($col:ident: $ty:ty, $data_type:ident, $pk:expr)),+ $(,)?],
        navigations: [$(($nav:ident, $fk_column:literal, $target:ident)),* $(,)?]
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $row {
            $(pub $col: $ty,)+
        }

        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $handle {
            path: TablePath,
        }

        impl Table for $handle {
            type Row = $row;

            const DEF: &'static TableDef = &TableDef {
                name: $name,
                columns: &[$(ColumnDef {
                    name: stringify!($col),
                    data_type: DataType::$data_type,
                    nullable: false,
                    primary_key: $pk,
                    generated: $pk,
                }),+],
                primary_key: &["id"],
                foreign_keys: &[$(ForeignKeyDef {
                    name: stringify!($nav),
                    columns: &[$fk_column],
                    target: || <$target as Table>::DEF,
                    target_columns: &[],
                }),*],
            };

            fn from_path(path: TablePath) -> Self {
                Self { path }
            }

            fn path(&self) -> &TablePath {
                &self.path
            }
        }

        impl TableRow for $row {
            type Table = $handle;

            fn from_values(values: Vec<SqlValue>) -> Result<Self> {
                let mut values = values.into_iter();
                Ok(Self {
                    $($col: <$ty>::from_sql_value(values.next().ok_or_else(|| {
                        Error::mapping("short row")
                    })?)?,)+
                })
            }

            fn into_values(self) -> Vec<SqlValue> {
                vec![$(self.$col.to_sql_value()),+]
            }
        }

        #[allow(dead_code)]
        impl $handle {
            $(
                pub fn $col(&self) -> Field<$handle, $ty> {
                    let column = Self::DEF
                        .column(stringify!($col))
                        .expect("fixture column");
                    Field::new(self.path.clone(), column)
                }
            )+

            $(
                pub fn $nav(&self) -> $target {
                    let fk = Self::DEF.foreign_key(stringify!($nav)).expect("fixture fk");
                    $target::from_path(self.path.navigate(fk.name, <$target as Table>::DEF.name))
                }
            )*
        }
    };
}

fixture_table!(
    OrganizationTable, Organization, "organization",
    columns: [(id: i64, Bigint, true), (name: String, Text, false)],
    navigations: []
);

fixture_table!(
    ClubTable, Club, "club",
    columns: [
        (id: i64, Bigint, true),
        (name: String, Text, false),
        (organization_id: i64, Bigint, false),
    ],
    navigations: [(organization, "organization_id", OrganizationTable)]
);

fixture_table!(
    AthleteTable, Athlete, "athlete",
    columns: [
        (id: i64, Bigint, true),
        (first_name: String, Text, false),
        (last_name: String, Text, false),
        (gender: String, Text, false),
        (year_of_birth: i32, Integer, false),
        (club_id: i64, Bigint, false),
        (organization_id: i64, Bigint, false),
    ],
    navigations: [
        (club, "club_id", ClubTable),
        (organization, "organization_id", OrganizationTable),
    ]
);

fixture_table!(
    SeriesTable, Series, "series",
    columns: [
        (id: i64, Bigint, true),
        (name: String, Text, false),
        (organization_id: i64, Bigint, false),
    ],
    navigations: [(organization, "organization_id", OrganizationTable)]
);

fixture_table!(
    CompetitionTable, Competition, "competition",
    columns: [
        (id: i64, Bigint, true),
        (name: String, Text, false),
        (competition_date: NaiveDate, Date, false),
        (series_id: i64, Bigint, false),
        (organization_id: i64, Bigint, false),
    ],
    navigations: [
        (series, "series_id", SeriesTable),
        (organization, "organization_id", OrganizationTable),
    ]
);

fixture_table!(
    TransferTable, Transfer, "transfer",
    columns: [
        (id: i64, Bigint, true),
        (athlete_id: i64, Bigint, false),
        (from_club_id: i64, Bigint, false),
        (to_club_id: i64, Bigint, false),
    ],
    navigations: [
        (athlete, "athlete_id", AthleteTable),
        (from_club, "from_club_id", ClubTable),
        (to_club, "to_club_id", ClubTable),
    ]
);

pub fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .table::<OrganizationTable>()
            .table::<ClubTable>()
            .table::<AthleteTable>()
            .table::<SeriesTable>()
            .table::<CompetitionTable>()
            .table::<TransferTable>()
            .build()
            .expect("fixture schema is valid"),
    )
}
