use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use services::DEFAULT_TICK;

#[derive(Parser, Debug)]
#[command(name = "cyberdash")]
#[command(about = "Cybersecurity training progress tracker", long_about = None, version)]
pub struct Cli {
    /// SQLite database URL or path
    #[arg(
        long,
        env = "CYBERDASH_DB_URL",
        default_value = "sqlite://cyberdash.sqlite3",
        global = true
    )]
    pub db: String,

    /// Log filter, e.g. `info` or `services=debug`
    #[arg(long, env = "RUST_LOG", default_value = "warn", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show scores, progress and the latest risk assessment
    Status,

    /// List modules with their lock state
    Modules,

    /// Mark a module complete (number or code, e.g. `3` or `ir-001`)
    Complete {
        module: String,

        /// Minutes spent on the module
        #[arg(long)]
        minutes: Option<u32>,
    },

    /// Record a quiz result, or list the questions when no result is given
    Quiz {
        /// Correct answers
        #[arg(long, requires = "total", conflicts_with = "answers")]
        score: Option<u32>,

        /// Number of questions
        #[arg(long, requires = "score")]
        total: Option<u32>,

        /// Chosen option per question, 1-based; `-` skips a question
        #[arg(long, value_delimiter = ',')]
        answers: Option<Vec<String>>,
    },

    /// Score a risk as likelihood x impact
    Assess {
        #[arg(long)]
        asset: String,

        /// Threat code (malware, phishing, insider, ddos, data-breach, ransomware) or free text
        #[arg(long)]
        threat: String,

        /// 1 (rare) to 5 (almost certain)
        #[arg(long)]
        likelihood: u8,

        /// 1 (very low) to 5 (very high)
        #[arg(long)]
        impact: u8,
    },

    /// Show recent risk assessments, newest first
    History,

    /// Show earned and pending badges
    Achievements,

    /// Write a JSON progress report
    Export {
        /// Output file; prints to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Delete all progress and history
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Run the training timer, crediting one minute per tick
    Train {
        /// Minutes to record before exiting
        #[arg(long, default_value_t = 1)]
        minutes: u32,

        /// Seconds per training minute
        #[arg(long, default_value_t = DEFAULT_TICK.as_secs(), hide = true)]
        tick_secs: u64,
    },
}

/// Parse `--answers` values. Options are numbered from 1; `-` or an empty
/// value leaves the question unanswered.
pub fn parse_answers(raw: &[String]) -> Result<Vec<Option<usize>>> {
    raw.iter()
        .enumerate()
        .map(|(index, value)| {
            let value = value.trim();
            if value.is_empty() || value == "-" {
                return Ok(None);
            }
            let option: usize = value
                .parse()
                .with_context(|| format!("answer {} is not a number: {value}", index + 1))?;
            if option == 0 {
                bail!("answer {} must be 1 or greater", index + 1);
            }
            Ok(Some(option - 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quiz_by_score() {
        let cli =
            Cli::try_parse_from(["cyberdash", "quiz", "--score", "7", "--total", "10"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Quiz {
                score: Some(7),
                total: Some(10),
                answers: None
            }
        );
    }

    #[test]
    fn score_requires_total() {
        assert!(Cli::try_parse_from(["cyberdash", "quiz", "--score", "7"]).is_err());
        assert!(
            Cli::try_parse_from([
                "cyberdash", "quiz", "--score", "1", "--total", "2", "--answers", "1"
            ])
            .is_err()
        );
    }

    #[test]
    fn global_db_flag_is_accepted_after_subcommand() {
        let cli =
            Cli::try_parse_from(["cyberdash", "status", "--db", "sqlite::memory:"]).unwrap();
        assert_eq!(cli.db, "sqlite::memory:");
    }

    #[test]
    fn answers_are_one_based_with_skips() {
        let raw: Vec<String> = ["2", "-", "", " 4 "].iter().map(ToString::to_string).collect();
        assert_eq!(
            parse_answers(&raw).unwrap(),
            vec![Some(1), None, None, Some(3)]
        );
        assert!(parse_answers(&["0".to_string()]).is_err());
        assert!(parse_answers(&["b".to_string()]).is_err());
    }
}
