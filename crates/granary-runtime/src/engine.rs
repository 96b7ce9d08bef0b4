//! Pipeline engine
//!
//! Sequences the warehouse loads in dependency order - dimensions first,
//! then the fact table that references them - strictly sequentially and
//! fail-fast: the first error aborts the run, nothing is retried or rolled
//! back.

use std::future::Future;

use rand::SeedableRng;
use rand::rngs::StdRng;
use uuid::Uuid;

use granary_core::config::Config;
use granary_core::error::Result as CoreResult;
use granary_core::source::{QuerySource, read_delimited};
use granary_core::table::{ColumnType, Table};
use granary_core::warehouse::{LoadOutcome, WarehouseStore, load_append_new};
use granary_core::{fact, transform};

use crate::db::{PgQuerySource, PgWarehouse};
use crate::error::Result;

/// The movie dimension table.
pub const DIM_MOVIE: &str = "dimMovie";
/// The user dimension table.
pub const DIM_USER: &str = "dimUser";
/// The watch fact table.
pub const FACT_WATCHS: &str = "FactWatchs";

/// The fixed source join: one row per (movie, participant, genre)
/// combination.
pub const MOVIE_QUERY: &str = r#"
SELECT
    movie.movieID AS "movieID",
    movie.movieTitle AS "title",
    movie.releaseDate AS "releaseDate",
    genre.name AS "genre",
    person.name AS "participantName",
    participant.participantRole AS "participantRole"
FROM movie
INNER JOIN participant ON movie.movieID = participant.movieID
INNER JOIN person ON person.personID = participant.personID
INNER JOIN movie_genre ON movie.movieID = movie_genre.movieID
INNER JOIN genre ON movie_genre.genreID = genre.genreID
"#;

/// Outcome of one full pipeline run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Identifier tagging every log line of this run
    pub run_id: Uuid,
    /// Movie dimension load outcome
    pub movie: LoadOutcome,
    /// User dimension load outcome
    pub user: LoadOutcome,
    /// Watch fact load outcome
    pub fact: LoadOutcome,
}

impl RunSummary {
    /// Total rows appended across all three tables.
    pub fn total_appended(&self) -> u64 {
        self.movie.appended + self.user.appended + self.fact.appended
    }
}

/// The transform-and-load pipeline.
pub struct Pipeline {
    config: Config,
    source: Box<dyn QuerySource>,
    warehouse: Box<dyn WarehouseStore>,
}

impl Pipeline {
    /// Create a pipeline over explicit source and warehouse seams.
    pub fn new(
        config: Config,
        source: Box<dyn QuerySource>,
        warehouse: Box<dyn WarehouseStore>,
    ) -> Self {
        Self {
            config,
            source,
            warehouse,
        }
    }

    /// Create a pipeline wired to the PostgreSQL endpoints of `config`.
    pub fn for_config(config: Config) -> Self {
        let source = Box::new(PgQuerySource::new(&config.project.source.url));
        let warehouse = Box::new(PgWarehouse::new(&config.project.warehouse.url));
        Self::new(config, source, warehouse)
    }

    /// Execute the full load sequence once.
    ///
    /// The fact generator's RNG is seeded from the configuration when a
    /// seed is set (reproducible runs) and from OS entropy otherwise.
    pub async fn run(&self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let mut rng = match self.config.project.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        tracing::info!(
            %run_id,
            project = %self.config.project.name,
            "starting warehouse load"
        );

        let (movies, movie) = self
            .step(run_id, DIM_MOVIE, self.load_movie_dimension())
            .await?;
        let (users, user) = self
            .step(run_id, DIM_USER, self.load_user_dimension())
            .await?;
        let fact = self
            .step(run_id, FACT_WATCHS, self.load_watch_facts(&users, &movies, &mut rng))
            .await?;

        tracing::info!(%run_id, "warehouse load finished");
        Ok(RunSummary {
            run_id,
            movie,
            user,
            fact,
        })
    }

    async fn step<T>(
        &self,
        run_id: Uuid,
        table: &str,
        work: impl Future<Output = CoreResult<T>>,
    ) -> Result<T> {
        tracing::info!(%run_id, table, "step started");
        match work.await {
            Ok(value) => {
                tracing::info!(%run_id, table, "step finished");
                Ok(value)
            }
            Err(e) => {
                tracing::error!(%run_id, table, error = %e, "step failed, aborting run");
                Err(e.into())
            }
        }
    }

    /// Build and load the movie dimension; returns the loaded batch for the
    /// fact generator.
    async fn load_movie_dimension(&self) -> CoreResult<(Table, LoadOutcome)> {
        let movies = self.source.fetch(MOVIE_QUERY).await?;
        let movies = transform::cast_column(&movies, "movieID", ColumnType::Int)?;

        let awards = read_delimited(self.config.awards_path())?;
        let awards = transform::cast_column(&awards, "movieID", ColumnType::Int)?;
        let awards = transform::rename_column(&awards, "Aware", "Award")?;

        let dim = transform::inner_join(&movies, &awards, "movieID", "movieID")?;
        let dim = transform::rename_column(&dim, "releaseDate", "releaseMovie")?;
        let dim = transform::rename_column(&dim, "Award", "awardMovie")?;
        let dim = transform::drop_column(&dim, "IdAward")?;

        let outcome = load_append_new(self.warehouse.as_ref(), DIM_MOVIE, &dim).await?;
        Ok((dim, outcome))
    }

    /// Build and load the user dimension; returns the loaded batch for the
    /// fact generator.
    async fn load_user_dimension(&self) -> CoreResult<(Table, LoadOutcome)> {
        let users = read_delimited(self.config.users_path())?;
        let users = transform::rename_column(&users, "idUser", "userID")?;

        let outcome = load_append_new(self.warehouse.as_ref(), DIM_USER, &users).await?;
        Ok((users, outcome))
    }

    /// Generate and load the synthetic watch facts.
    async fn load_watch_facts(
        &self,
        users: &Table,
        movies: &Table,
        rng: &mut StdRng,
    ) -> CoreResult<LoadOutcome> {
        let watchs = fact::generate_watch_facts(users, movies, rng)?;
        load_append_new(self.warehouse.as_ref(), FACT_WATCHS, &watchs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use granary_core::config::{EndpointConfig, FilesConfig, LogConfig, ProjectConfig};
    use granary_core::error::Error;
    use granary_core::warehouse::MemoryWarehouse;

    struct FailingSource;

    #[async_trait]
    impl QuerySource for FailingSource {
        async fn fetch(&self, _query: &str) -> CoreResult<Table> {
            Err(Error::Connection {
                endpoint: "source database".to_string(),
                message: "refused".to_string(),
            })
        }
    }

    fn test_config(base: &std::path::Path) -> Config {
        Config {
            project: ProjectConfig {
                name: "test".to_string(),
                version: "0.1.0".to_string(),
                source: EndpointConfig {
                    url: "postgres://unused".to_string(),
                },
                warehouse: EndpointConfig {
                    url: "postgres://unused".to_string(),
                },
                files: FilesConfig {
                    awards: "movie_awards.csv".to_string(),
                    users: "users.csv".to_string(),
                },
                log: LogConfig::default(),
                seed: Some(7),
            },
            base_path: base.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_source_failure_aborts_before_any_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryWarehouse::new();
        let pipeline = Pipeline::new(
            test_config(dir.path()),
            Box::new(FailingSource),
            Box::new(store.clone()),
        );

        let result = pipeline.run().await;
        assert!(result.is_err());
        assert!(store.table(DIM_MOVIE).await.is_none());
        assert!(store.table(DIM_USER).await.is_none());
        assert!(store.table(FACT_WATCHS).await.is_none());
    }
}
