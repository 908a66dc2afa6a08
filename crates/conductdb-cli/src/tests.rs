use std::path::PathBuf;

use super::*;

#[test]
fn parses_evidence_dedup_command() {
    let cli = Cli::try_parse_from(["conductdb-cli", "evidence", "dedup", "--input", "events.json"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Evidence {
            command: EvidenceCommands::Dedup {
                threshold: None,
                ..
            }
        })
    ));
}

#[test]
fn parses_dedup_threshold_override() {
    let cli = Cli::try_parse_from([
        "conductdb-cli",
        "evidence",
        "dedup",
        "--input",
        "events.json",
        "--threshold",
        "0.9",
    ])
    .expect("expected valid cli args");

    match cli.command {
        Some(Commands::Evidence {
            command: EvidenceCommands::Dedup { input, threshold },
        }) => {
            assert_eq!(input, PathBuf::from("events.json"));
            assert_eq!(threshold, Some(0.9));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_sweep_with_explicit_now() {
    let cli = Cli::try_parse_from([
        "conductdb-cli",
        "evidence",
        "sweep",
        "--input",
        "events.json",
        "--now",
        "2026-03-05T00:00:00Z",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Evidence {
            command: EvidenceCommands::Sweep { now: Some(_), .. }
        })
    ));
}

#[test]
fn sweep_rejects_malformed_now() {
    let result = Cli::try_parse_from([
        "conductdb-cli",
        "evidence",
        "sweep",
        "--input",
        "events.json",
        "--now",
        "yesterday",
    ]);
    assert!(result.is_err());
}

#[test]
fn verify_requires_input() {
    let result = Cli::try_parse_from(["conductdb-cli", "evidence", "verify"]);
    assert!(result.is_err());
}

#[test]
fn parses_score_brands_with_prefs() {
    let cli = Cli::try_parse_from([
        "conductdb-cli",
        "score",
        "brands",
        "--input",
        "events.json",
        "--prefs",
        "prefs.json",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Score {
            command: ScoreCommands::Brands { prefs: Some(_), .. }
        })
    ));
}

#[test]
fn parses_score_confidence_counts() {
    let cli = Cli::try_parse_from([
        "conductdb-cli",
        "score",
        "confidence",
        "--events",
        "12",
        "--verified",
        "3",
        "--owners",
        "2",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Score {
            command: ScoreCommands::Confidence {
                events: 12,
                verified: 3,
                owners: 2,
                score: None
            }
        })
    ));
}

#[test]
fn reference_flag_is_global() {
    let cli = Cli::try_parse_from([
        "conductdb-cli",
        "score",
        "outlook",
        "--input",
        "ratings.json",
        "--reference",
        "alt.yaml",
    ])
    .expect("expected valid cli args");

    assert_eq!(cli.reference, Some(PathBuf::from("alt.yaml")));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["conductdb-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}
