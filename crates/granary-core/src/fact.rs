//! Synthetic watch-fact generation
//!
//! Environments without real transactional data still need a populated fact
//! table. The generator cross-joins the user and movie identifier columns
//! and attaches randomized, range-bounded measures per row. The RNG is
//! injected so test runs are reproducible and production runs can seed from
//! OS entropy.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::Rng;
use rand::rngs::StdRng;

use crate::error::{Error, Result};
use crate::table::{Column, ColumnType, Table, Value};

/// Column expected on the user dimension batch.
pub const USER_ID: &str = "userID";
/// Column expected on the movie dimension batch.
pub const MOVIE_ID: &str = "movieID";

/// Inclusive bounds of the generated rating.
pub const RATING_RANGE: (f64, f64) = (0.0, 5.0);

/// The fixed historical window generated timestamps fall in.
pub fn watch_window() -> (NaiveDateTime, NaiveDateTime) {
    let day = |y: i32, m: u32, d: u32| {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("window bounds are valid dates")
    };
    (day(2024, 1, 15), day(2024, 4, 6))
}

/// Build the watch-fact batch from the user and movie dimension batches.
///
/// Emits the cross product of the `userID` and `movieID` columns (users
/// outer, movies inner) with a fresh `rating` and `timestamp` per row:
/// rating uniform in [0, 5] rounded to one decimal digit, timestamp a
/// uniform whole-second instant inside [`watch_window`]. The output has
/// exactly `users.len() * movies.len()` rows.
pub fn generate_watch_facts(users: &Table, movies: &Table, rng: &mut StdRng) -> Result<Table> {
    let uid = users.column_index(USER_ID);
    let mid = movies.column_index(MOVIE_ID);
    let (uid, mid) = match (uid, mid) {
        (Some(u), Some(m)) => (u, m),
        _ => {
            return Err(Error::Schema {
                message: format!(
                    "fact generation needs '{USER_ID}' on the user batch and '{MOVIE_ID}' on the movie batch"
                ),
            });
        }
    };

    let (start, end) = watch_window();
    let window_seconds = (end - start).num_seconds();

    let columns = vec![
        Column::new(USER_ID, users.columns()[uid].ty),
        Column::new(MOVIE_ID, movies.columns()[mid].ty),
        Column::new("rating", ColumnType::Float),
        Column::new("timestamp", ColumnType::Timestamp),
    ];

    let mut rows = Vec::with_capacity(users.len() * movies.len());
    for user_row in users.rows() {
        for movie_row in movies.rows() {
            rows.push(vec![
                user_row[uid].clone(),
                movie_row[mid].clone(),
                Value::Float(gen_rating(rng)),
                Value::Timestamp(gen_timestamp(rng, start, window_seconds)),
            ]);
        }
    }

    let table = Table::new(columns, rows)?;
    tracing::info!(
        users = users.len(),
        movies = movies.len(),
        facts = table.len(),
        "generated watch facts"
    );
    Ok(table)
}

/// Uniform rating in [0, 5], rounded to one decimal digit.
fn gen_rating(rng: &mut StdRng) -> f64 {
    let (lo, hi) = RATING_RANGE;
    let raw: f64 = rng.gen_range(lo..=hi);
    (raw * 10.0).round() / 10.0
}

/// Uniform whole-second instant inside the watch window.
fn gen_timestamp(rng: &mut StdRng, start: NaiveDateTime, window_seconds: i64) -> NaiveDateTime {
    start + Duration::seconds(rng.gen_range(0..=window_seconds))
}
