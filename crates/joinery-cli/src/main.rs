//! joinery CLI
//!
//! Demo commands over a small athletics database: implicit joins, nested
//! rows, multisets and records.

mod schema;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use joinery_core::prelude::*;
use joinery_orm::{Dsl, Settings, UpdatableRecord};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use schema::{Athlete, Competition, Series};

/// Typed queries with implicit joins over an athletics database.
#[derive(Parser)]
#[command(name = "joinery")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL.
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:athletics.sqlite3")]
    database: String,

    /// JSON file with execution settings.
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Enable verbose output, including every statement run.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the tables.
    Init {
        /// Also insert the demo rows.
        #[arg(long)]
        seed: bool,
    },

    /// List athletes with their club.
    Athletes {
        /// Only athletes of this club.
        #[arg(short, long)]
        club: Option<String>,

        /// Show SQL without executing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print every series with its competitions as JSON.
    Series {
        /// Show SQL without executing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Add an athlete and print the generated id.
    AddAthlete {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        gender: String,
        #[arg(long)]
        year_of_birth: i32,
        #[arg(long)]
        club_id: Option<i64>,
        #[arg(long, default_value_t = 1)]
        organization_id: i64,
    },

    /// Move an athlete to another club.
    Transfer {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        club_id: i64,
    },

    /// Delete an athlete.
    DeleteAthlete {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Debug, Deserialize, Serialize)]
struct SeriesView {
    name: String,
    competitions: Vec<CompetitionView>,
}

#[derive(Debug, Deserialize, Serialize)]
struct CompetitionView {
    name: String,
    competition_date: chrono::NaiveDate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = match &cli.settings {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<Settings>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => Settings::default(),
    };

    let options = SqliteConnectOptions::from_str(&cli.database)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    let mut dsl = Dsl::new(pool, schema::athletics()?).with_settings(settings);

    match cli.command {
        Commands::Init { seed } => {
            schema::create(dsl.connection(), seed).await?;
            info!("Tables created.");
        }

        Commands::Athletes { club, dry_run } => {
            let a = Athlete::table();
            let mut query = select((a.id(), a.first_name(), a.last_name(), a.club().name()))
                .from(&a)
                .order_by(a.last_name());
            if let Some(club) = &club {
                query = query.where_clause(a.club().name().eq(club));
            }

            if dry_run {
                print_sql(&dsl, &query)?;
                return Ok(());
            }
            for (id, first_name, last_name, club) in dsl.fetch_all(&query).await? {
                println!("{id:>6}  {first_name} {last_name}  ({club})");
            }
        }

        Commands::Series { dry_run } => {
            let s = Series::table();
            let c = Competition::table();
            let query = select((
                s.name(),
                multiset(
                    select((c.name(), c.competition_date()))
                        .from(&c)
                        .where_clause(c.series_id().eq(s.id()))
                        .order_by(c.competition_date()),
                )
                .into_multiset()
                .as_("competitions"),
            ))
            .from(&s)
            .order_by(s.name());

            if dry_run {
                print_sql(&dsl, &query)?;
                return Ok(());
            }
            let series: Vec<SeriesView> = dsl.fetch_into(&query).await?;
            println!("{}", serde_json::to_string_pretty(&series)?);
        }

        Commands::AddAthlete {
            first_name,
            last_name,
            gender,
            year_of_birth,
            club_id,
            organization_id,
        } => {
            let a = Athlete::table();
            let mut athlete = dsl.new_record(&a);
            athlete
                .set(&a.first_name(), first_name)
                .set(&a.last_name(), last_name)
                .set(&a.gender(), gender)
                .set(&a.year_of_birth(), year_of_birth)
                .set(&a.club_id(), club_id)
                .set(&a.organization_id(), organization_id);
            athlete.store(&mut dsl).await?;

            let id = athlete.get(&a.id())?.context("no id was generated")?;
            println!("{id}");
        }

        Commands::Transfer { id, club_id } => {
            let a = Athlete::table();
            let mut athlete = dsl
                .fetch_optional(&select_from(&a).where_clause(a.id().eq(id)))
                .await?
                .with_context(|| format!("no athlete with id {id}"))?;
            athlete.set(&a.club_id(), Some(club_id));
            if athlete.store(&mut dsl).await? {
                info!(athlete = id, club = club_id, "Transferred.");
            } else {
                info!(athlete = id, "Already at that club.");
            }
        }

        Commands::DeleteAthlete { id } => {
            let a = Athlete::table();
            let deleted = dsl
                .execute(&delete_from(&a).where_clause(a.id().eq(id)))
                .await?;
            info!(deleted, "Done.");
        }
    }

    Ok(())
}

fn print_sql(dsl: &Dsl<SqlitePool>, query: &impl BuildStatement) -> anyhow::Result<()> {
    let rendered = dsl.render(query)?;
    println!("{}", rendered.sql);
    for (index, param) in rendered.params.iter().enumerate() {
        println!("  ${} = {param:?}", index + 1);
    }
    Ok(())
}
