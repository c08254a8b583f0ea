use std::path::PathBuf;
use std::str::FromStr;

use clap::{ArgAction, Parser, ValueEnum};

use crate::error::{BenchError, BenchResult};
use crate::scheduler::PhaseDuration;
use crate::suite::{SqlDialect, SuiteOptions};

/// Run settings parsed from command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(version, about = "AS3AP benchmark driver", long_about = None)]
pub struct As3apConfig {
    /// Number of tuples in each base relation.
    #[arg(short = 'n', long, default_value_t = 10000)]
    pub tuples: u64,

    /// Number of concurrent users. 0 derives it from the database size.
    #[arg(short = 'u', long, default_value_t = 0)]
    pub users: usize,

    /// Warm-up phase duration in seconds. 0 runs every worker once.
    #[arg(long, default_value_t = 900)]
    pub warmup_secs: u64,

    /// Measured phase duration in seconds. 0 runs every worker once.
    #[arg(long, default_value_t = 300)]
    pub measure_secs: u64,

    /// Mixed workload duration in seconds. 0 runs every worker once.
    #[arg(long, default_value_t = 300)]
    pub mixed_secs: u64,

    /// Build the secondary indexes after loading.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub use_indexes: bool,

    /// The backend can build clustered indexes.
    #[arg(long, default_value_t = false)]
    pub supports_clustered: bool,

    /// The backend can build hash indexes.
    #[arg(long, default_value_t = false)]
    pub supports_hash: bool,

    /// Drop, regenerate and reload the database before running.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub create: bool,

    /// Steps to run, separated by ';': sql87, sql92, singleuser, multiuser.
    #[arg(short = 's', long, default_value = "sql87;singleuser;multiuser")]
    pub sequence: String,

    /// Write the generated record files here and load from them.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Database file for the sqlite backend.
    #[arg(long, default_value = "as3ap.db")]
    pub db_path: PathBuf,

    #[arg(long, value_enum, default_value_t = BackendKind::Sqlite)]
    pub backend: BackendKind,

    /// Seed for the data generator. Unseeded runs differ every time.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Default for As3apConfig {
    fn default() -> Self {
        As3apConfig {
            tuples: 10000,
            users: 0,
            warmup_secs: 900,
            measure_secs: 300,
            mixed_secs: 300,
            use_indexes: true,
            supports_clustered: false,
            supports_hash: false,
            create: true,
            sequence: "sql87;singleuser;multiuser".to_string(),
            data_dir: None,
            db_path: PathBuf::from("as3ap.db"),
            backend: BackendKind::Sqlite,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Sqlite,
    Null,
}

/// One entry of the run sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStep {
    /// Switch following batteries to comma joins.
    Sql87,
    /// Switch following batteries to `join ... on`.
    Sql92,
    SingleUser,
    MultiUser,
}

impl FromStr for RunStep {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sql87" => Ok(RunStep::Sql87),
            "sql92" => Ok(RunStep::Sql92),
            "singleuser" => Ok(RunStep::SingleUser),
            "multiuser" => Ok(RunStep::MultiUser),
            other => Err(BenchError::InvalidConfig(format!(
                "unknown run step '{}'",
                other
            ))),
        }
    }
}

impl RunStep {
    pub fn dialect(&self) -> Option<SqlDialect> {
        match self {
            RunStep::Sql87 => Some(SqlDialect::Sql87),
            RunStep::Sql92 => Some(SqlDialect::Sql92),
            _ => None,
        }
    }
}

/// Parses a `;`-separated run sequence. Empty entries are skipped.
pub fn parse_sequence(s: &str) -> BenchResult<Vec<RunStep>> {
    s.split(';')
        .filter(|step| !step.trim().is_empty())
        .map(RunStep::from_str)
        .collect()
}

impl As3apConfig {
    pub fn steps(&self) -> BenchResult<Vec<RunStep>> {
        parse_sequence(&self.sequence)
    }

    pub fn suite_options(&self) -> SuiteOptions {
        SuiteOptions {
            use_indexes: self.use_indexes,
            supports_clustered: self.supports_clustered,
            supports_hash: self.supports_hash,
            ..SuiteOptions::default()
        }
    }

    /// Rough database size: four relations of 100-byte tuples.
    pub fn database_size_mb(tuple_count: u64) -> u64 {
        4 * tuple_count * 100 / 1_000_000
    }

    /// Configured users, or one per 4 MB of data (at least one).
    pub fn worker_count(&self, tuple_count: u64) -> usize {
        if self.users > 0 {
            self.users
        } else {
            std::cmp::max(1, (Self::database_size_mb(tuple_count) / 4) as usize)
        }
    }

    pub fn warmup(&self) -> PhaseDuration {
        PhaseDuration::from_secs(self.warmup_secs)
    }

    pub fn measure(&self) -> PhaseDuration {
        PhaseDuration::from_secs(self.measure_secs)
    }

    pub fn mixed(&self) -> PhaseDuration {
        PhaseDuration::from_secs(self.mixed_secs)
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.tuples == 0 {
            return Err(BenchError::InvalidConfig(
                "tuples must be at least 1".to_string(),
            ));
        }
        self.steps().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_match_the_command_line() {
        let parsed = As3apConfig::parse_from(["as3ap"]);
        let default = As3apConfig::default();
        assert_eq!(parsed.tuples, default.tuples);
        assert_eq!(parsed.sequence, default.sequence);
        assert_eq!(parsed.db_path, default.db_path);
        assert!(parsed.use_indexes && parsed.create);
        assert_eq!(parsed.backend, BackendKind::Sqlite);
        assert!(parsed.seed.is_none());
    }

    #[test]
    fn flags() {
        let cfg = As3apConfig::parse_from([
            "as3ap",
            "-n",
            "2000",
            "-u",
            "3",
            "--use-indexes",
            "false",
            "--supports-hash",
            "--backend",
            "null",
            "--seed",
            "9",
            "-s",
            "sql92;singleuser",
        ]);
        assert_eq!(cfg.tuples, 2000);
        assert_eq!(cfg.users, 3);
        assert!(!cfg.use_indexes);
        assert!(cfg.supports_hash);
        assert_eq!(cfg.backend, BackendKind::Null);
        assert_eq!(cfg.seed, Some(9));
        assert_eq!(
            cfg.steps().unwrap(),
            vec![RunStep::Sql92, RunStep::SingleUser]
        );
        let opts = cfg.suite_options();
        assert!(!opts.use_indexes && opts.supports_hash && !opts.supports_clustered);
    }

    #[rstest]
    #[case("sql87;singleuser;multiuser", vec![RunStep::Sql87, RunStep::SingleUser, RunStep::MultiUser])]
    #[case(" SQL92 ; SingleUser ;", vec![RunStep::Sql92, RunStep::SingleUser])]
    #[case("", vec![])]
    fn sequences(#[case] input: &str, #[case] expected: Vec<RunStep>) {
        assert_eq!(parse_sequence(input).unwrap(), expected);
    }

    #[test]
    fn unknown_step_is_rejected() {
        assert!(matches!(
            parse_sequence("sql87;backup"),
            Err(BenchError::InvalidConfig(_))
        ));
    }

    #[rstest]
    #[case(0, 10000, 1)]
    #[case(0, 100_000, 10)]
    #[case(0, 1_000_000, 100)]
    #[case(5, 1_000_000, 5)]
    fn worker_count(#[case] users: usize, #[case] tuples: u64, #[case] expected: usize) {
        let cfg = As3apConfig {
            users,
            ..As3apConfig::default()
        };
        assert_eq!(cfg.worker_count(tuples), expected);
    }

    #[test]
    fn zero_seconds_is_single_shot() {
        let cfg = As3apConfig {
            warmup_secs: 0,
            ..As3apConfig::default()
        };
        assert_eq!(cfg.warmup(), PhaseDuration::Once);
        assert_eq!(cfg.measure(), PhaseDuration::from_secs(300));
        assert!(cfg.validate().is_ok());
        assert!(As3apConfig {
            tuples: 0,
            ..As3apConfig::default()
        }
        .validate()
        .is_err());
    }
}
