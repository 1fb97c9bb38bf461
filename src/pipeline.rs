use std::io::Read;
use std::time::Instant;

use crate::anomaly::DetectionEngine;
use crate::config::AnalysisConfig;
use crate::error::AnalysisResult;
use crate::graph::TransactionGraph;
use crate::ledger::ingest::read_transactions;
use crate::ledger::{Transaction, TransactionStore};
use crate::report::{build_report, Report};

/// Run one full analysis over an in-memory ledger.
///
/// Steps:
/// 1. Validate and freeze the transactions
/// 2. Build the account graph
/// 3. Run the cycle, smurfing and shell detectors plus the legitimacy guard
/// 4. Score accounts and assemble the report
///
/// `input_partial` marks the ledger as a prefix of a larger upload; it is
/// carried into `summary.is_partial`.
pub fn analyze(
    transactions: Vec<Transaction>,
    input_partial: bool,
    config: &AnalysisConfig,
) -> AnalysisResult<Report> {
    let started = Instant::now();

    let store = TransactionStore::new(transactions, config.max_transactions)?;
    let graph = TransactionGraph::build(&store);
    let detections = DetectionEngine::new(config).run(&graph);

    if detections.is_partial() {
        tracing::warn!(
            cycle_budget_exhausted = detections.cycle_budget_exhausted,
            failed = ?detections.failed_detectors,
            "Analysis incomplete, report marked partial"
        );
    }

    let report = build_report(&graph, &detections, config, input_partial, started);
    tracing::info!(
        transactions = report.summary.total_transactions,
        accounts = report.summary.total_accounts_analyzed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Analysis complete"
    );
    Ok(report)
}

/// Read a CSV ledger and analyze it. With a `row_limit`, only that many rows
/// are read and the report is partial if the file had more.
pub fn analyze_csv<R: Read>(
    reader: R,
    row_limit: Option<usize>,
    config: &AnalysisConfig,
) -> AnalysisResult<Report> {
    let ledger = read_transactions(reader, row_limit)?;
    analyze(ledger.transactions, ledger.truncated, config)
}
