//! Building and rendering statements over derived tables.

mod common;

use chrono::NaiveDate;
use common::{render, schema, Athlete, ClubTable, Competition, Series, Transfer};
use joinery_core::prelude::*;
use joinery_core::statement::Slot;
use joinery_core::Statement;

#[test]
fn test_competitions_after_date() {
    let c = Competition::table();
    let date = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let rendered = render(
        &select((c.name(), c.competition_date()))
            .from(&c)
            .where_clause(c.competition_date().gt(date))
            .order_by(c.competition_date()),
    );
    assert_eq!(
        rendered.sql,
        "SELECT \"competition\".\"name\", \"competition\".\"competition_date\" \
         FROM \"competition\" WHERE \"competition\".\"competition_date\" > ? \
         ORDER BY \"competition\".\"competition_date\" ASC"
    );
    assert_eq!(rendered.params, vec![SqlValue::Date(date)]);
}

#[test]
fn test_navigation_through_two_edges() {
    let a = Athlete::table();
    let rendered = render(
        &select((a.last_name(), a.club().organization().name()))
            .from(&a)
            .where_clause(a.club().name().eq("Louisiana State University")),
    );
    assert_eq!(
        rendered.sql,
        "SELECT \"athlete\".\"last_name\", \"athlete__club__organization\".\"name\" \
         FROM \"athlete\" \
         INNER JOIN \"club\" AS \"athlete__club\" \
         ON \"athlete__club\".\"id\" = \"athlete\".\"club_id\" \
         INNER JOIN \"organization\" AS \"athlete__club__organization\" \
         ON \"athlete__club__organization\".\"id\" = \"athlete__club\".\"organization_id\" \
         WHERE \"athlete__club\".\"name\" = ?"
    );
}

#[test]
fn test_each_edge_joins_once() {
    let a = Athlete::table();
    let statement = select((a.club().name(), a.club().id(), a.first_name()))
        .from(&a)
        .where_clause(a.club().name().like("%State%"))
        .order_by(a.club().name())
        .build(&schema())
        .unwrap();
    let Statement::Select(select) = statement else {
        panic!("expected a select");
    };
    assert_eq!(select.joins().len(), 1);
    assert!(select.joins()[0].implicit);
}

#[test]
fn test_ambiguous_navigation_fails_at_build() {
    let t = Transfer::table();
    let club: ClubTable = t.navigate_to();
    let err = select(club.name()).from(&t).build(&schema()).unwrap_err();
    match err {
        Error::Ambiguous {
            table, candidates, ..
        } => {
            assert_eq!(table, "transfer");
            assert_eq!(candidates, ["from_club", "to_club"]);
        }
        other => panic!("expected an ambiguity error, got {other}"),
    }

    // the named edges stay usable
    let rendered = render(&select((t.from_club().name(), t.to_club().name())).from(&t));
    assert!(rendered.sql.contains("AS \"transfer__from_club\""));
    assert!(rendered.sql.contains("AS \"transfer__to_club\""));
}

#[test]
fn test_unknown_table_fails_at_build() {
    #[derive(Debug, Clone, joinery_derive::Table)]
    pub struct Stadium {
        #[column(primary_key)]
        pub id: i64,
    }

    let s = Stadium::table();
    let err = select(s.id()).from(&s).build(&schema()).unwrap_err();
    assert!(matches!(err, Error::Metadata(_)));
}

#[test]
fn test_builders_are_reusable() {
    let a = Athlete::table();
    let base = select(a.last_name()).from(&a);
    let men = base.where_clause(a.gender().eq("M"));
    let women = base.where_clause(a.gender().eq("F"));
    assert!(!render(&base).sql.contains("WHERE"));
    assert_eq!(render(&men).params, vec![SqlValue::Text("M".into())]);
    assert_eq!(render(&women).params, vec![SqlValue::Text("F".into())]);
}

#[test]
fn test_multiset_layout() {
    let s = Series::table();
    let c = Competition::table();
    let statement = select((
        s.name(),
        multiset(
            select(c.name())
                .from(&c)
                .where_clause(c.series_id().eq(s.id())),
        )
        .into_multiset()
        .as_("competitions"),
    ))
    .from(&s)
    .build(&schema())
    .unwrap();
    let layout = statement.layout().unwrap();
    assert_eq!(layout.slots.len(), 2);
    assert!(matches!(&layout.slots[1], Slot::Multiset { label, .. } if label == "competitions"));
}

#[test]
fn test_update_through_navigation() {
    let a = Athlete::table();
    let rendered = render(
        &update(&a)
            .set(a.gender(), "F")
            .where_clause(a.organization().name().eq("World Athletics")),
    );
    assert_eq!(
        rendered.sql,
        "UPDATE \"athlete\" SET \"gender\" = ? WHERE \"athlete\".\"id\" IN \
         (SELECT \"athlete\".\"id\" FROM \"athlete\" \
         INNER JOIN \"organization\" AS \"athlete__organization\" \
         ON \"athlete__organization\".\"id\" = \"athlete\".\"organization_id\" \
         WHERE \"athlete__organization\".\"name\" = ?)"
    );
    assert_eq!(
        rendered.params,
        vec![
            SqlValue::Text("F".into()),
            SqlValue::Text("World Athletics".into())
        ]
    );
}

#[test]
fn test_insert_rejects_duplicate_column() {
    let a = Athlete::table();
    let err = insert_into(&a)
        .set(a.first_name(), "A")
        .set(a.first_name(), "B")
        .build(&schema())
        .unwrap_err();
    assert!(err.to_string().contains("assigned twice"));
}
