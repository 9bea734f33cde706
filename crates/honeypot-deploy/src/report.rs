//! Rendering run reports for the operator and for the dashboard

use comfy_table::{Cell, Color, Table};
use deploy_orchestration::{RunReport, ServiceOutcome, ServiceState, Verdict};

/// Output format of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    /// Human-readable table
    #[default]
    Table,
    /// The report document the dashboard polls
    Json,
}

/// Render `report` in `format`
pub fn render(report: &RunReport, format: Format) -> serde_json::Result<String> {
    match format {
        Format::Table => Ok(render_table(report).to_string()),
        Format::Json => serde_json::to_string_pretty(report),
    }
}

/// One row per service, in start order
pub fn render_table(report: &RunReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["SERVICE", "STATE", "ELAPSED", "PROBES", "DETAIL"]);

    for outcome in &report.outcomes {
        table.add_row(vec![
            Cell::new(&outcome.name),
            Cell::new(state_label(outcome)).fg(state_color(outcome.state)),
            Cell::new(format!("{:.1}s", outcome.elapsed.as_secs_f64())),
            Cell::new(probe_summary(outcome)),
            Cell::new(detail(outcome)),
        ]);
    }

    table
}

/// One-line verdict for the whole run
pub fn summary(report: &RunReport) -> String {
    let ready = report.count(ServiceState::ReadyConfirmed);
    let total = report.outcomes.len();
    if report.success {
        format!("{}/{} services ready", ready, total)
    } else {
        let failed: Vec<&str> = report.failures().map(|o| o.name.as_str()).collect();
        format!(
            "{}/{} services ready; not ready: {}",
            ready,
            total,
            failed.join(", ")
        )
    }
}

fn state_label(outcome: &ServiceOutcome) -> String {
    if outcome.already_running && outcome.state == ServiceState::ReadyConfirmed {
        "ready (already running)".to_string()
    } else {
        outcome.state.label().to_string()
    }
}

fn state_color(state: ServiceState) -> Color {
    match state {
        ServiceState::ReadyConfirmed => Color::Green,
        ServiceState::AlreadyRunning | ServiceState::Started => Color::Yellow,
        ServiceState::NotStarted | ServiceState::Cancelled => Color::DarkGrey,
        ServiceState::TimedOut
        | ServiceState::StartFailed
        | ServiceState::SkippedDependencyFailed => Color::Red,
    }
}

fn probe_summary(outcome: &ServiceOutcome) -> String {
    match outcome.unknown_verdicts {
        0 => outcome.probe_attempts.to_string(),
        unknown => format!("{} ({} unknown)", outcome.probe_attempts, unknown),
    }
}

fn detail(outcome: &ServiceOutcome) -> String {
    if let Some(error) = &outcome.error {
        return error.clone();
    }
    match &outcome.last_verdict {
        Some(Verdict::NotReady(detail)) | Some(Verdict::Unknown(detail)) => detail.clone(),
        _ => "-".to_string(),
    }
}

/// Where to reach the platform once it is up
pub fn access_points(flask_port: Option<&str>) -> Vec<(&'static str, String)> {
    vec![
        ("Web Management Interface", "http://localhost:5000".to_string()),
        ("Kibana Dashboard", "http://localhost:5601".to_string()),
        ("Elasticsearch API", "http://localhost:9200".to_string()),
        ("SSH Honeypot", "port 2222".to_string()),
        ("Telnet Honeypot", "port 2223".to_string()),
        ("Web Honeypot", format!("port {}", flask_port.unwrap_or("8181"))),
    ]
}
