//! Operator-facing rendering of account outcomes and the session summary

use crate::lifecycle::ContainerState;
use crate::ports::PortPurpose;
use crate::session::{AccountOutcome, AccountRecord, SessionSummary};
use comfy_table::{Cell, Color, Table};

/// Lines describing how one account ended
pub fn outcome_lines(record: &AccountRecord) -> Vec<String> {
    let mut lines = Vec::new();

    match &record.outcome {
        AccountOutcome::Lifecycle(report) if report.is_running() => {
            lines.push(format!(
                "Container {} is running (status: {})",
                record.container_name,
                report.status.as_deref().unwrap_or("unknown")
            ));
            if let Some(port) = record.host_port(PortPurpose::Api) {
                lines.push(format!("  API:    http://127.0.0.1:{}", port));
            }
            if let Some(port) = record.host_port(PortPurpose::WebUi) {
                lines.push(format!("  WebUI:  http://127.0.0.1:{}/webui", port));
            }
            let labels = ["Logs:  ", "Stop:  ", "Remove:"];
            for (label, hint) in labels.iter().zip(&report.hints) {
                lines.push(format!("  {} {}", label, hint));
            }
        }
        AccountOutcome::Lifecycle(report) => {
            lines.push(format!(
                "Container {} failed to start: {}",
                record.container_name,
                report.failure.as_deref().unwrap_or("unknown error")
            ));
            lines.push(format!(
                "  Run it in the foreground to see why: {}",
                report.foreground_command
            ));
            let labels = ["Clean up:", "List:    "];
            for (label, hint) in labels.iter().zip(&report.hints) {
                lines.push(format!("  {} {}", label, hint));
            }
        }
        AccountOutcome::Error(message) => {
            lines.push(format!(
                "Provisioning account {} failed: {}",
                record.account, message
            ));
        }
    }

    lines
}

fn port_cell(record: &AccountRecord, purpose: PortPurpose) -> String {
    record
        .host_port(purpose)
        .map(|port| port.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Table of every account handled in the session
pub fn summary_table(summary: &SessionSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ACCOUNT", "CONTAINER", "API", "WEBUI", "STATE", "FINISHED"]);

    for record in &summary.records {
        let state = record.outcome.final_state();
        let color = match state {
            ContainerState::Running => Color::Green,
            _ => Color::Red,
        };

        table.add_row(vec![
            Cell::new(record.account.as_str()),
            Cell::new(&record.container_name),
            Cell::new(port_cell(record, PortPurpose::Api)),
            Cell::new(port_cell(record, PortPurpose::WebUi)),
            Cell::new(state.to_string()).fg(color),
            Cell::new(record.finished_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]);
    }

    table
}
