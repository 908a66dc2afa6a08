//! Evidence command handlers for the CLI.
//!
//! Each subcommand reads a JSON array of incoming events, prepares them
//! against the ownership table, and prints a JSON report.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Subcommand;
use conductdb_core::{Category, IncomingEvent, RawEvent, VerificationLevel};
use conductdb_evidence::{
    cluster_events, prepare_event, DedupConfig, DedupReport, EventCluster, OwnershipTable,
    SweepReport, VerifyReport,
};
use serde::Serialize;
use uuid::Uuid;

use crate::context::{print_json, read_json, RunContext};

/// Sub-commands available under `evidence`.
#[derive(Debug, Subcommand)]
pub enum EvidenceCommands {
    /// Cluster near-duplicate reports per brand and category
    Dedup {
        /// JSON file holding an array of incoming events
        #[arg(long)]
        input: PathBuf,
        /// Override the configured title-similarity threshold
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Run the per-event verification check
    Verify {
        /// JSON file holding an array of incoming events
        #[arg(long)]
        input: PathBuf,
    },
    /// Run the domain-diversity sweep over unverified events
    Sweep {
        /// JSON file holding an array of incoming events
        #[arg(long)]
        input: PathBuf,
        /// End of the sweep window (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Serialize)]
pub(crate) struct DedupOutput {
    pub clusters: Vec<EventCluster>,
    pub report: DedupReport,
}

#[derive(Debug, Serialize)]
pub(crate) struct EventLevel {
    pub event_id: Uuid,
    pub verification: VerificationLevel,
}

#[derive(Debug, Serialize)]
pub(crate) struct SweepOutput {
    pub report: SweepReport,
    pub events: Vec<EventLevel>,
}

pub(crate) fn run(ctx: &RunContext, command: EvidenceCommands) -> anyhow::Result<()> {
    match command {
        EvidenceCommands::Dedup { input, threshold } => {
            let incoming: Vec<IncomingEvent> = read_json(&input)?;
            print_json(&run_dedup(ctx, incoming, threshold))
        }
        EvidenceCommands::Verify { input } => {
            let incoming: Vec<IncomingEvent> = read_json(&input)?;
            print_json(&run_verify(ctx, incoming))
        }
        EvidenceCommands::Sweep { input, now } => {
            let incoming: Vec<IncomingEvent> = read_json(&input)?;
            print_json(&run_sweep(ctx, incoming, now.unwrap_or_else(Utc::now)))
        }
    }
}

pub(crate) fn prepare_all(incoming: Vec<IncomingEvent>, owners: &OwnershipTable) -> Vec<RawEvent> {
    incoming
        .into_iter()
        .map(|event| prepare_event(event, owners))
        .collect()
}

/// Cluster each (brand, category) group separately, keeping input order
/// within a group.
pub(crate) fn cluster_by_brand(events: Vec<RawEvent>, config: &DedupConfig) -> DedupOutput {
    let mut groups: BTreeMap<(Uuid, Category), Vec<RawEvent>> = BTreeMap::new();
    for event in events {
        groups
            .entry((event.brand_id, event.category))
            .or_default()
            .push(event);
    }

    let mut output = DedupOutput {
        clusters: Vec::new(),
        report: DedupReport::default(),
    };
    for (_, group) in groups {
        let (clusters, report) = cluster_events(group, config);
        output.report.input_count += report.input_count;
        output.report.cluster_count += report.cluster_count;
        output.report.duplicate_count += report.duplicate_count;
        output.clusters.extend(clusters);
    }
    output
}

pub(crate) fn run_dedup(
    ctx: &RunContext,
    incoming: Vec<IncomingEvent>,
    threshold: Option<f64>,
) -> DedupOutput {
    let config = DedupConfig {
        threshold: threshold.unwrap_or(ctx.dedup.threshold),
        ..ctx.dedup
    };
    let output = cluster_by_brand(prepare_all(incoming, &ctx.ownership), &config);
    tracing::info!(
        input = output.report.input_count,
        clusters = output.report.cluster_count,
        duplicates = output.report.duplicate_count,
        "dedup complete"
    );
    output
}

pub(crate) fn run_verify(ctx: &RunContext, incoming: Vec<IncomingEvent>) -> VerifyReport {
    let mut events = prepare_all(incoming, &ctx.ownership);
    ctx.verifier.verify_batch(&mut events)
}

pub(crate) fn run_sweep(
    ctx: &RunContext,
    incoming: Vec<IncomingEvent>,
    now: DateTime<Utc>,
) -> SweepOutput {
    let mut events = prepare_all(incoming, &ctx.ownership);
    let report = ctx.verifier.sweep(&mut events, now);
    SweepOutput {
        report,
        events: events
            .iter()
            .map(|e| EventLevel {
                event_id: e.id,
                verification: e.verification,
            })
            .collect(),
    }
}
