//! Tests for the `#[derive(Table)]` macro output.

mod common;

use common::{Athlete, AthleteTable, ClubTable, TransferTable};
use joinery_core::{DataType, Field, SqlValue, Table, TableRow};
use joinery_derive::Table;

#[derive(Debug, Clone, PartialEq, Table)]
#[table(name = "staff")]
pub struct Employee {
    #[column(primary_key, generated)]
    pub id: i64,
    #[column(name = "full_name")]
    pub name: String,
    #[column(references = Employee, navigation = "manager")]
    pub reports_to: Option<i64>,
    pub badge: Option<Vec<u8>>,
}

#[test]
fn test_table_name_defaults_to_snake_case() {
    assert_eq!(AthleteTable::DEF.name, "athlete");
    assert_eq!(EmployeeTable::DEF.name, "staff");
}

#[test]
fn test_column_metadata() {
    let def = AthleteTable::DEF;
    let names: Vec<&str> = def.columns.iter().map(|c| c.name).collect();
    assert_eq!(
        names,
        [
            "id",
            "first_name",
            "last_name",
            "gender",
            "year_of_birth",
            "club_id",
            "organization_id"
        ]
    );
    assert_eq!(def.primary_key, &["id"]);

    let id = def.column("id").unwrap();
    assert!(id.primary_key && id.generated && !id.nullable);
    assert_eq!(id.data_type, DataType::Bigint);

    let club_id = def.column("club_id").unwrap();
    assert!(club_id.nullable);
    assert_eq!(def.column("year_of_birth").unwrap().data_type, DataType::Integer);
}

#[test]
fn test_renamed_and_optional_columns() {
    let def = EmployeeTable::DEF;
    assert!(def.column("full_name").is_some());
    assert!(def.column("name").is_none());
    let badge = def.column("badge").unwrap();
    assert!(badge.nullable);
    assert_eq!(badge.data_type, DataType::Blob);
}

#[test]
fn test_foreign_keys_and_navigation_names() {
    let fks = AthleteTable::DEF.foreign_keys;
    let names: Vec<&str> = fks.iter().map(|fk| fk.name).collect();
    assert_eq!(names, ["club", "organization"]);
    assert_eq!(fks[0].columns, &["club_id"]);
    assert_eq!(fks[0].target_table().name, "club");

    let transfer: Vec<&str> = TransferTable::DEF
        .foreign_keys
        .iter()
        .map(|fk| fk.name)
        .collect();
    assert_eq!(transfer, ["athlete", "from_club", "to_club"]);
}

#[test]
fn test_self_reference() {
    let fk = EmployeeTable::DEF.foreign_key("manager").unwrap();
    assert_eq!(fk.target_table().name, "staff");

    let e = Employee::table();
    let boss = e.manager().manager();
    assert_eq!(boss.path().alias(), "staff__manager__manager");
}

#[test]
fn test_field_accessors_carry_paths() {
    let a = Athlete::table();
    let field: Field<AthleteTable, String> = a.first_name();
    assert_eq!(field.name(), "first_name");
    assert_eq!(field.path().alias(), "athlete");

    let club: ClubTable = a.club();
    assert_eq!(club.name().path().alias(), "athlete__club");
    assert_eq!(club.organization().path().alias(), "athlete__club__organization");
    assert_eq!(AthleteTable::default(), AthleteTable::root());
}

#[test]
fn test_row_conversion() {
    let row = Athlete {
        id: 1000,
        first_name: "Armand".into(),
        last_name: "Duplantis".into(),
        gender: "M".into(),
        year_of_birth: 1999,
        club_id: None,
        organization_id: 1,
    };
    let values = row.clone().into_values();
    assert_eq!(values[5], SqlValue::Null);
    assert_eq!(Athlete::from_values(values).unwrap(), row);
}

#[test]
fn test_row_conversion_reports_column() {
    let err = Athlete::from_values(vec![
        SqlValue::Int(1),
        SqlValue::Null,
        SqlValue::Text("Duplantis".into()),
        SqlValue::Text("M".into()),
        SqlValue::Int(1999),
        SqlValue::Null,
        SqlValue::Int(1),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("first_name"));

    let err = Athlete::from_values(vec![SqlValue::Int(1)]).unwrap_err();
    assert!(err.to_string().contains("7 column(s)"));
}
