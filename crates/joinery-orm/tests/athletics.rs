//! End-to-end queries and records against an in-memory SQLite database.

mod common;

use chrono::NaiveDate;
use common::{dsl, Athlete, Club, ClubTable, Competition, Series, Transfer};
use joinery_core::prelude::*;
use joinery_orm::{Error, ReturningPolicy, Settings, UpdatableRecord};
use serde::Deserialize;

#[tokio::test]
async fn test_competitions_after_date() {
    let mut dsl = dsl().await;
    let c = Competition::table();

    let rows = dsl
        .fetch_all(
            &select((c.name(), c.competition_date()))
                .from(&c)
                .where_clause(c.competition_date().gt(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap())),
        )
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![(
            "Diamond League 2022".to_owned(),
            NaiveDate::from_ymd_opt(2022, 6, 30).unwrap()
        )]
    );
}

#[tokio::test]
async fn test_insert_returns_next_key() {
    let mut dsl = dsl().await;
    let a = Athlete::table();

    let id = dsl
        .fetch_one(
            &insert_into(&a)
                .set(a.first_name(), "Mujinga")
                .set(a.last_name(), "Kambundji")
                .set(a.gender(), "F")
                .set(a.year_of_birth(), 1992)
                .set(a.club_id(), 1_i64)
                .set(a.organization_id(), 1_i64)
                .returning(a.id()),
        )
        .await
        .unwrap();
    assert_eq!(id, 1001);

    let stored = dsl
        .fetch_one(
            &select((a.first_name(), a.last_name(), a.club_id()))
                .from(&a)
                .where_clause(a.id().eq(id)),
        )
        .await
        .unwrap();
    assert_eq!(stored, ("Mujinga".to_owned(), "Kambundji".to_owned(), 1));
}

#[tokio::test]
async fn test_insert_read_back_matches_native_returning() {
    let mut dsl = dsl()
        .await
        .with_settings(Settings::new().returning(ReturningPolicy::ReadBack));
    let a = Athlete::table();

    let (id, last_name) = dsl
        .fetch_one(
            &insert_into(&a)
                .set(a.first_name(), "Mujinga")
                .set(a.last_name(), "Kambundji")
                .set(a.gender(), "F")
                .set(a.year_of_birth(), 1992)
                .set(a.organization_id(), 1_i64)
                .returning((a.id(), a.last_name())),
        )
        .await
        .unwrap();

    assert_eq!(id, 1001);
    assert_eq!(last_name, "Kambundji");
}

#[tokio::test]
async fn test_implicit_join_matches_explicit_join() {
    let mut dsl = dsl().await;
    let a = Athlete::table();
    let c = Club::table();

    let implicit = dsl
        .fetch_all(
            &select((a.first_name(), a.last_name(), a.club().name()))
                .from(&a)
                .where_clause(a.club().name().eq("Louisiana State University"))
                .order_by(a.id()),
        )
        .await
        .unwrap();
    let explicit = dsl
        .fetch_all(
            &select((a.first_name(), a.last_name(), c.name()))
                .from(&a)
                .join(&c)
                .on(c.id().eq(a.club_id()))
                .where_clause(c.name().eq("Louisiana State University"))
                .order_by(a.id()),
        )
        .await
        .unwrap();

    assert_eq!(implicit, explicit);
    assert_eq!(
        implicit,
        vec![(
            "Armand".to_owned(),
            "Duplantis".to_owned(),
            "Louisiana State University".to_owned()
        )]
    );
}

#[derive(Debug, PartialEq)]
struct ClubName {
    name: String,
}

#[derive(Debug, PartialEq)]
struct AthleteWithClub {
    first_name: String,
    last_name: String,
    club: ClubName,
}

#[tokio::test]
async fn test_nested_row_maps_into_embedded_struct() {
    let mut dsl = dsl().await;
    let a = Athlete::table();

    let athletes = dsl
        .fetch_map(
            &select((
                a.first_name(),
                a.last_name(),
                row(a.club().name()).mapping(|name| ClubName { name }),
            ))
            .from(&a),
            |(first_name, last_name, club)| AthleteWithClub {
                first_name,
                last_name,
                club,
            },
        )
        .await
        .unwrap();

    assert_eq!(
        athletes,
        vec![AthleteWithClub {
            first_name: "Armand".into(),
            last_name: "Duplantis".into(),
            club: ClubName {
                name: "Louisiana State University".into()
            },
        }]
    );
}

#[tokio::test]
async fn test_asterisk_over_explicit_join_reads_fields_by_origin() {
    let mut dsl = dsl().await;
    let a = Athlete::table();
    let c = Club::table();

    let athletes = dsl
        .fetch_map(
            &select(asterisk())
                .from(&a)
                .join(&c)
                .on(c.id().eq(a.club_id())),
            |row| -> Result<AthleteWithClub> {
                Ok(AthleteWithClub {
                    first_name: row.get(&a.first_name())?,
                    last_name: row.get(&a.last_name())?,
                    club: ClubName {
                        name: row.get(&c.name())?,
                    },
                })
            },
        )
        .await
        .unwrap()
        .into_iter()
        .collect::<Result<Vec<_>>>()
        .unwrap();

    assert_eq!(
        athletes,
        vec![AthleteWithClub {
            first_name: "Armand".into(),
            last_name: "Duplantis".into(),
            club: ClubName {
                name: "Louisiana State University".into(),
            },
        }]
    );
}

#[tokio::test]
async fn test_multiset_of_competitions_per_series() {
    let mut dsl = dsl().await;
    let s = Series::table();
    let c = Competition::table();

    let series = dsl
        .fetch_all(
            &select((
                s.name(),
                multiset(
                    select(c.name())
                        .from(&c)
                        .where_clause(c.series_id().eq(s.id()))
                        .order_by(c.competition_date()),
                )
                .into_multiset()
                .as_("competitions"),
            ))
            .from(&s)
            .order_by(s.id()),
        )
        .await
        .unwrap();

    assert_eq!(
        series,
        vec![
            (
                "Diamond League".to_owned(),
                vec!["Diamond League 2022".to_owned()]
            ),
            ("Indoor Tour".to_owned(), Vec::new()),
        ]
    );
}

#[derive(Debug, Deserialize, PartialEq)]
struct SeriesDto {
    name: String,
    competitions: Vec<CompetitionDto>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct CompetitionDto {
    name: String,
    competition_date: NaiveDate,
}

#[tokio::test]
async fn test_fetch_into_follows_labels() {
    let mut dsl = dsl().await;
    let s = Series::table();
    let c = Competition::table();

    let series: Vec<SeriesDto> = dsl
        .fetch_into(
            &select((
                s.name(),
                multiset(
                    select((c.name(), c.competition_date()))
                        .from(&c)
                        .where_clause(c.series_id().eq(s.id())),
                )
                .into_multiset()
                .as_("competitions"),
            ))
            .from(&s)
            .where_clause(s.name().eq("Diamond League")),
        )
        .await
        .unwrap();

    assert_eq!(
        series,
        vec![SeriesDto {
            name: "Diamond League".into(),
            competitions: vec![CompetitionDto {
                name: "Diamond League 2022".into(),
                competition_date: NaiveDate::from_ymd_opt(2022, 6, 30).unwrap(),
            }],
        }]
    );
}

#[tokio::test]
async fn test_multiset_row_limit() {
    let mut dsl = dsl()
        .await
        .with_settings(Settings::new().max_multiset_rows(0));
    let s = Series::table();
    let c = Competition::table();

    let err = dsl
        .fetch_all(
            &select((
                s.name(),
                multiset(select(c.name()).from(&c).where_clause(c.series_id().eq(s.id())))
                    .into_multiset(),
            ))
            .from(&s),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cardinality { actual: 1, .. }));
}

#[tokio::test]
async fn test_delete_by_id() {
    let mut dsl = dsl().await;
    let a = Athlete::table();
    let t = Transfer::table();
    dsl.execute(&delete_from(&t).where_clause(t.athlete_id().eq(1000_i64)))
        .await
        .unwrap();

    let deleted = dsl
        .execute(&delete_from(&a).where_clause(a.id().eq(1000_i64)))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let found = dsl
        .fetch_optional(&select_from(&a).where_clause(a.id().eq(1000_i64)))
        .await
        .unwrap();
    assert!(found.is_none());

    let deleted = dsl
        .execute(&delete_from(&a).where_clause(a.id().eq(1000_i64)))
        .await
        .unwrap();
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn test_delete_through_navigation() {
    let mut dsl = dsl().await;
    let t = Transfer::table();

    let deleted = dsl
        .execute(&delete_from(&t).where_clause(t.athlete().last_name().eq("Duplantis")))
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(dsl.count(&t).await.unwrap(), 0);
}

#[tokio::test]
async fn test_fetch_one_cardinality() {
    let mut dsl = dsl().await;
    let c = Club::table();

    let err = dsl
        .fetch_one(&select(c.name()).from(&c))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cardinality { actual: 2, .. }));

    let err = dsl
        .fetch_one(&select(c.name()).from(&c).where_clause(c.id().eq(99_i64)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cardinality { actual: 0, .. }));

    let err = dsl
        .fetch_optional(&select(c.name()).from(&c))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cardinality { actual: 2, .. }));
}

#[tokio::test]
async fn test_fetch_is_consumed_once() {
    let mut dsl = dsl().await;
    let c = Club::table();

    let mut fetched = dsl
        .fetch(&select(c.name()).from(&c).order_by(c.id()))
        .await
        .unwrap();
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched.next().unwrap().unwrap(), "Louisiana State University");
    assert_eq!(fetched.collect_rows().unwrap(), vec!["LC Zürich".to_owned()]);
}

#[tokio::test]
async fn test_ambiguous_navigation_is_rejected_before_execution() {
    let mut dsl = dsl().await;
    let t = Transfer::table();
    let club = t.navigate_to::<ClubTable>();

    let err = dsl
        .fetch_all(&select(club.name()).from(&t))
        .await
        .unwrap_err();
    match err {
        Error::Ambiguous { candidates, .. } => {
            assert_eq!(candidates, vec!["from_club".to_owned(), "to_club".to_owned()]);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[tokio::test]
async fn test_count_where() {
    let mut dsl = dsl().await;
    let a = Athlete::table();

    assert_eq!(dsl.count(&a).await.unwrap(), 1);
    assert_eq!(
        dsl.count_where(&a, a.year_of_birth().lt(1990)).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_record_insert_then_select() {
    let mut dsl = dsl().await;
    let a = Athlete::table();

    let mut athlete = dsl.new_record(&a);
    athlete
        .set(&a.first_name(), "Mujinga")
        .set(&a.last_name(), "Kambundji")
        .set(&a.gender(), "F")
        .set(&a.year_of_birth(), 1992)
        .set(&a.club_id(), Some(1_i64))
        .set(&a.organization_id(), 1_i64);
    assert!(athlete.is_new());

    assert!(athlete.store(&mut dsl).await.unwrap());
    assert!(!athlete.is_new());
    assert!(!athlete.is_changed());
    assert_eq!(athlete.get(&a.id()).unwrap(), Some(1001));

    let stored = dsl
        .fetch_one(&select_from(&a).where_clause(a.id().eq(1001_i64)))
        .await
        .unwrap();
    assert_eq!(stored, athlete);
    assert_eq!(
        stored.into_row().unwrap(),
        Athlete {
            id: 1001,
            first_name: "Mujinga".into(),
            last_name: "Kambundji".into(),
            gender: "F".into(),
            year_of_birth: 1992,
            club_id: Some(1),
            organization_id: 1,
        }
    );
}

#[tokio::test]
async fn test_record_update_sets_only_changed_columns() {
    let mut dsl = dsl().await;
    let a = Athlete::table();

    let mut athlete = dsl
        .fetch_one(&select_from(&a).where_clause(a.id().eq(1000_i64)))
        .await
        .unwrap();
    athlete.set(&a.year_of_birth(), 2000);

    let update = athlete.update_statement().unwrap().unwrap();
    assert_eq!(
        dsl.render(&update).unwrap().sql,
        "UPDATE \"athlete\" SET \"year_of_birth\" = ? WHERE \"athlete\".\"id\" = ?"
    );

    assert!(athlete.store(&mut dsl).await.unwrap());
    assert!(!athlete.is_changed());
    assert!(!athlete.store(&mut dsl).await.unwrap());

    let year = dsl
        .fetch_one(
            &select(a.year_of_birth())
                .from(&a)
                .where_clause(a.id().eq(1000_i64)),
        )
        .await
        .unwrap();
    assert_eq!(year, 2000);
}

#[tokio::test]
async fn test_record_store_after_external_delete_fails() {
    let mut dsl = dsl().await;
    let a = Athlete::table();
    let t = Transfer::table();

    let mut athlete = dsl
        .fetch_one(&select_from(&a).where_clause(a.id().eq(1000_i64)))
        .await
        .unwrap();
    dsl.execute(&delete_from(&t)).await.unwrap();
    dsl.execute(&delete_from(&a)).await.unwrap();

    athlete.set(&a.last_name(), "Duplantis-Pole");
    let err = athlete.store(&mut dsl).await.unwrap_err();
    match err {
        Error::NotFound { table, sql } => {
            assert_eq!(table, "athlete");
            assert!(sql.starts_with("UPDATE \"athlete\""));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(athlete.is_changed());
}

#[tokio::test]
async fn test_record_delete_and_refresh() {
    let mut dsl = dsl().await;
    let a = Athlete::table();
    let t = Transfer::table();
    dsl.execute(&delete_from(&t)).await.unwrap();

    let mut athlete = dsl
        .fetch_one(&select_from(&a).where_clause(a.id().eq(1000_i64)))
        .await
        .unwrap();
    athlete.set(&a.first_name(), "Mondo");
    athlete.refresh(&mut dsl).await.unwrap();
    assert_eq!(athlete.get(&a.first_name()).unwrap(), Some("Armand".to_owned()));
    assert!(!athlete.is_changed());

    athlete.delete(&mut dsl).await.unwrap();
    assert!(athlete.is_new());
    assert_eq!(dsl.count(&a).await.unwrap(), 0);

    let err = dsl
        .new_record(&a)
        .delete(&mut dsl)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));
}
