//! A simple CLI tool for viewing election results.
//! This uses the same ranking and filtering as the server, and reads the output
//! of `GET /api/elections/<election_id>/results` either live or from a saved file.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;

use election_backend::model::results::{RankedResult, RankedResults, ResultFilter, ResultsPayload};

const PROGRAM_NAME: &str = "election-results";

const ABOUT_TEXT: &str = "Rank and filter the results of an election.

EXIT CODES:
     0: Results displayed.
     1: The results could not be loaded.";

const SOURCE: &str = "SOURCE";
const PARTY: &str = "PARTY";
const REGION: &str = "REGION";
const JSON: &str = "JSON";

const SOURCE_HELP: &str = "An http(s) URL or the path to a JSON file,\n\
as returned by `GET /api/elections/<election_id>/results`";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(SOURCE)
                .help(SOURCE_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(PARTY)
                .long("party")
                .help("Only show candidates of this party")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new(REGION)
                .long("region")
                .help("Only show candidates standing in this region")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new(JSON)
                .long("json")
                .help("Print the ranked view as JSON")
                .action(ArgAction::SetTrue),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to fetch the results over HTTP.
    Fetch(String),
    /// Failed to decode the JSON results.
    Format(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IO(msg) => write!(f, "IO error: {msg}"),
            Error::Fetch(msg) => write!(f, "Could not fetch results: {msg}"),
            Error::Format(msg) => write!(f, "Invalid JSON: {msg}"),
        }
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Load a results payload from a URL or a file.
fn load(source: &str) -> Result<ResultsPayload, Error> {
    if is_url(source) {
        let body = reqwest::blocking::get(source)
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(|e| Error::Fetch(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| Error::Format(e.to_string()))
    } else {
        let file = BufReader::new(File::open(source).map_err(|e| Error::IO(e.to_string()))?);
        serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))
    }
}

/// One line of the ranked table.
fn format_row(row: &RankedResult, is_winner: bool) -> String {
    format!(
        "{:>3}. {}{} ({}, {}): {} vote{} ({:.1}%)",
        row.rank,
        row.candidate.name,
        if is_winner { " *" } else { "" },
        row.candidate.party,
        row.candidate.region,
        row.votes,
        if row.votes != 1 { "s" } else { "" },
        row.percentage
    )
}

/// The human-readable report for a ranked view.
fn report(payload: &ResultsPayload, view: &RankedResults) -> Vec<String> {
    let mut lines = vec![format!(
        "Total votes: {} ({} of {} candidates shown)",
        view.total_votes,
        view.results.len(),
        payload.results.len()
    )];

    let winner = payload.winner().filter(|w| w.votes > 0).map(|w| w.candidate.id);
    if view.results.is_empty() {
        lines.push("No candidates match the filter.".to_string());
    }
    for row in &view.results {
        lines.push(format_row(row, Some(row.candidate.id) == winner));
    }

    let join = |values: &[&String]| {
        values
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    lines.push(format!(
        "Parties: {}",
        join(&view.parties.iter().collect::<Vec<_>>())
    ));
    lines.push(format!(
        "Regions: {}",
        join(&view.regions.iter().collect::<Vec<_>>())
    ));
    lines
}

/// Load, rank and filter the results, print them, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let source: &String = args.get_one(SOURCE).unwrap(); // Required argument is guaranteed to be present.
    let filter = ResultFilter::new(
        args.get_one::<String>(PARTY).cloned(),
        args.get_one::<String>(REGION).cloned(),
    );

    let payload = match load(source) {
        Ok(payload) => payload,
        Err(err) => {
            println!("{err}");
            return 1;
        }
    };
    if let Err(mismatch) = payload.verify_total() {
        eprintln!("Warning: {mismatch}");
    }

    let view = payload.view(&filter);
    if args.get_flag(JSON) {
        match serde_json::to_string_pretty(&view) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                println!("{}", Error::Format(e.to_string()));
                return 1;
            }
        }
    } else {
        for line in report(&payload, &view) {
            println!("{line}");
        }
    }
    0
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_files() {
        let payload = load("example_dumps/results.json").unwrap();
        assert_eq!(payload.total_votes, 300);
        assert_eq!(payload.results.len(), 4);
        assert_eq!(payload.verify_total(), Ok(()));

        let payload = load("example_dumps/results_mismatched_total.json").unwrap();
        assert!(payload.verify_total().is_err());

        assert!(matches!(
            load("example_dumps/results_malformed.json"),
            Err(Error::Format(_))
        ));
        assert!(matches!(load("not a real file"), Err(Error::IO(_))));
    }

    #[test]
    fn unreachable_url() {
        // Nothing listens on port 9 locally.
        assert!(matches!(
            load("http://127.0.0.1:9/api/elections/x/results"),
            Err(Error::Fetch(_))
        ));
    }

    #[test]
    fn report_lines() {
        let payload = load("example_dumps/results.json").unwrap();

        let lines = report(&payload, &payload.view(&ResultFilter::default()));
        assert_eq!(lines[0], "Total votes: 300 (4 of 4 candidates shown)");
        assert_eq!(
            lines[1],
            "  1. Bea Marsh * (Harbour, South): 150 votes (50.0%)"
        );
        assert_eq!(lines[4], "  4. Dee Fenn (Harbour, North): 0 votes (0.0%)");
        assert_eq!(lines[5], "Parties: Lantern, Harbour");
        assert_eq!(lines[6], "Regions: North, South");

        let filter = ResultFilter::new(Some("Lantern".to_string()), Some("North".to_string()));
        let lines = report(&payload, &payload.view(&filter));
        assert_eq!(lines[0], "Total votes: 300 (1 of 4 candidates shown)");
        assert_eq!(lines[1], "  1. Al Reed (Lantern, North): 90 votes (30.0%)");

        let filter = ResultFilter::new(Some("Nobody".to_string()), None);
        let lines = report(&payload, &payload.view(&filter));
        assert_eq!(lines[1], "No candidates match the filter.");
    }

    #[test]
    fn correct_cli_usage() {
        // This test actually enters backend code, so enable logging.
        log4rs_test_utils::test_logging::init_logging_once_for(["election_backend"], None, None);

        let command_line = [PROGRAM_NAME, "example_dumps/results.json"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 0);

        let command_line = [
            PROGRAM_NAME,
            "example_dumps/results.json",
            "--party",
            "Harbour",
            "--region",
            "South",
            "--json",
        ];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 0);

        let command_line = [PROGRAM_NAME, "example_dumps/results_mismatched_total.json"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 0);

        // Counts whose sum exceeds `u64::MAX` are reported, not fatal.
        let command_line = [PROGRAM_NAME, "example_dumps/results_huge_counts.json"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 0);

        let command_line = [PROGRAM_NAME, "example_dumps/results_malformed.json"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 1);

        let command_line = [PROGRAM_NAME, "not a real file"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 1);
    }

    #[test]
    fn bad_cli_usage() {
        // Something very wrong.
        let command_line = [PROGRAM_NAME, "this", "invocation", "is", "incorrect"];
        cli().try_get_matches_from(command_line).unwrap_err();

        // No options at all.
        let command_line = [PROGRAM_NAME];
        cli().try_get_matches_from(command_line).unwrap_err();

        // Filter without a value.
        let command_line = [PROGRAM_NAME, "example_dumps/results.json", "--party"];
        cli().try_get_matches_from(command_line).unwrap_err();
    }
}
