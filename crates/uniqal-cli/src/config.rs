use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use uniqal::{CharClasses, GeneratorConfig, SupervisorConfig, default_num_workers};

/// Which letters go into the alphabet.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LetterCase {
    /// `A-Z` only.
    Upper,
    /// `a-z` only.
    Lower,
    /// Both `A-Z` and `a-z`.
    #[default]
    Mixed,
}

/// Runtime configuration for the `uniqal` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first if present).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "uniqal",
    version,
    about = "Generates random strings and appends only never-seen values to a file"
)]
pub struct CliArgs {
    /// Length of every generated value, in characters.
    ///
    /// Environment variable: `UNIQAL_LENGTH`
    #[arg(short, long, env = "UNIQAL_LENGTH", default_value_t = 8)]
    pub length: usize,

    /// Letter case to include in the alphabet.
    ///
    /// Environment variable: `UNIQAL_CASE`
    #[arg(long = "case", env = "UNIQAL_CASE", value_enum, default_value_t = LetterCase::Mixed)]
    pub letter_case: LetterCase,

    /// Leave digits `0-9` out of the alphabet.
    ///
    /// Environment variable: `UNIQAL_NO_DIGITS`
    #[arg(long, env = "UNIQAL_NO_DIGITS", default_value_t = false)]
    pub no_digits: bool,

    /// Leave ASCII punctuation out of the alphabet.
    ///
    /// Environment variable: `UNIQAL_NO_PUNCTUATION`
    #[arg(long, env = "UNIQAL_NO_PUNCTUATION", default_value_t = false)]
    pub no_punctuation: bool,

    /// File that accepted values are appended to, one per line. Its existing
    /// lines are never written again. Missing parent directories are created.
    ///
    /// Environment variable: `UNIQAL_OUTPUT`
    #[arg(short, long, env = "UNIQAL_OUTPUT", default_value = "pass.txt")]
    pub output: PathBuf,

    /// Number of values each worker generates per round.
    ///
    /// Environment variable: `UNIQAL_BATCH_SIZE`
    #[arg(long, env = "UNIQAL_BATCH_SIZE", default_value_t = uniqal::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Number of worker threads. Defaults to half the available parallelism,
    /// and at least one.
    ///
    /// Environment variable: `UNIQAL_NUM_WORKERS`
    #[arg(long, env = "UNIQAL_NUM_WORKERS")]
    pub num_workers: Option<usize>,

    /// Pause after each worker round, in milliseconds.
    ///
    /// Bounds the production rate and the pressure on the writer channel.
    ///
    /// Environment variable: `UNIQAL_THROTTLE_MS`
    #[arg(long, env = "UNIQAL_THROTTLE_MS", default_value_t = 100)]
    pub throttle_ms: u64,

    /// Seconds between progress reports.
    ///
    /// Environment variable: `UNIQAL_PROGRESS_INTERVAL_SECS`
    #[arg(long, env = "UNIQAL_PROGRESS_INTERVAL_SECS", default_value_t = 10)]
    pub progress_interval_secs: u64,

    /// Batches buffered between the workers and the writer.
    ///
    /// Environment variable: `UNIQAL_CHANNEL_CAPACITY`
    #[arg(
        long,
        env = "UNIQAL_CHANNEL_CAPACITY",
        default_value_t = uniqal::DEFAULT_CHANNEL_CAPACITY
    )]
    pub channel_capacity: usize,

    /// Seconds to wait for workers to retire after Ctrl+C. Workers still
    /// generating after that are abandoned and the summary is printed.
    ///
    /// Environment variable: `UNIQAL_SHUTDOWN_TIMEOUT_SECS`
    #[arg(
        long,
        env = "UNIQAL_SHUTDOWN_TIMEOUT_SECS",
        default_value_t = uniqal::DEFAULT_SHUTDOWN_TIMEOUT.as_secs()
    )]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub output: PathBuf,
    pub supervisor: SupervisorConfig,
}

impl CliArgs {
    fn char_classes(&self) -> CharClasses {
        CharClasses {
            uppercase: matches!(self.letter_case, LetterCase::Upper | LetterCase::Mixed),
            lowercase: matches!(self.letter_case, LetterCase::Lower | LetterCase::Mixed),
            digits: !self.no_digits,
            punctuation: !self.no_punctuation,
        }
    }
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.length == 0 {
            bail!("UNIQAL_LENGTH must be greater than 0");
        }

        if args.batch_size == 0 {
            bail!("UNIQAL_BATCH_SIZE must be greater than 0");
        }

        if args.num_workers == Some(0) {
            bail!("UNIQAL_NUM_WORKERS must be greater than 0");
        }

        if args.channel_capacity == 0 {
            bail!("UNIQAL_CHANNEL_CAPACITY must be greater than 0");
        }

        if args.progress_interval_secs == 0 {
            bail!("UNIQAL_PROGRESS_INTERVAL_SECS must be greater than 0");
        }

        let alphabet = args
            .char_classes()
            .alphabet()
            .context("invalid character classes")?;
        let generator = GeneratorConfig::try_new(args.length, alphabet)?;

        let supervisor = SupervisorConfig {
            batch_size: args.batch_size,
            num_workers: args.num_workers.unwrap_or_else(default_num_workers),
            throttle: Duration::from_millis(args.throttle_ms),
            progress_interval: Duration::from_secs(args.progress_interval_secs),
            channel_capacity: args.channel_capacity,
            shutdown_timeout: Some(Duration::from_secs(args.shutdown_timeout_secs)),
            ..SupervisorConfig::new(generator)
        };
        supervisor.validate()?;

        Ok(Self {
            output: args.output,
            supervisor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("uniqal").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_use_every_class() {
        let config = RunConfig::try_from(parse(&[])).unwrap();
        let generator = &config.supervisor.generator;

        assert_eq!(generator.length(), 8);
        assert_eq!(generator.alphabet().len(), 94);
        assert_eq!(config.supervisor.batch_size, 1000);
        assert_eq!(config.supervisor.throttle, Duration::from_millis(100));
        assert_eq!(config.supervisor.num_workers, default_num_workers());
        assert_eq!(
            config.supervisor.shutdown_timeout,
            Some(Duration::from_secs(5))
        );
        assert_eq!(config.output, PathBuf::from("pass.txt"));
    }

    #[test]
    fn upper_case_without_extras() {
        let config = RunConfig::try_from(parse(&[
            "--case",
            "upper",
            "--no-digits",
            "--no-punctuation",
            "--length",
            "4",
        ]))
        .unwrap();
        let alphabet = config.supervisor.generator.alphabet();

        assert_eq!(alphabet.len(), 26);
        assert!(alphabet.as_chars().iter().all(char::is_ascii_uppercase));
    }

    #[test]
    fn explicit_workers_and_timeout() {
        let config = RunConfig::try_from(parse(&[
            "--num-workers",
            "3",
            "--shutdown-timeout-secs",
            "5",
        ]))
        .unwrap();

        assert_eq!(config.supervisor.num_workers, 3);
        assert_eq!(config.supervisor.shutdown_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn zero_values_are_rejected() {
        for args in [
            &["--length", "0"][..],
            &["--batch-size", "0"][..],
            &["--num-workers", "0"][..],
            &["--channel-capacity", "0"][..],
            &["--progress-interval-secs", "0"][..],
        ] {
            assert!(RunConfig::try_from(parse(args)).is_err(), "{args:?}");
        }
    }
}
