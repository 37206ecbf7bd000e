//! End-of-run summary table.

use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use flowpack_deploy::{ProjectOutcome, ProjectReport, ScheduleAction};

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "project")]
    project: String,
    #[tabled(rename = "version")]
    version: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "archive")]
    archive: String,
    #[tabled(rename = "entry points")]
    entry_points: String,
    #[tabled(rename = "schedules")]
    schedules: String,
}

pub fn print(outcomes: &[ProjectOutcome]) {
    if outcomes.is_empty() {
        println!("No projects processed.");
        return;
    }

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    let rows: Vec<SummaryRow> = outcomes.iter().map(row).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!(
        "{} projects | {} ok | {} failed",
        outcomes.len(),
        outcomes.len() - failed,
        failed
    );
}

fn row(outcome: &ProjectOutcome) -> SummaryRow {
    match &outcome.result {
        Ok(report) => SummaryRow {
            project: report.name.to_string(),
            version: report.version.to_string(),
            status: status_label(report),
            archive: archive_label(report),
            entry_points: report.entry_points.join(", "),
            schedules: report
                .schedules
                .iter()
                .map(describe_schedule)
                .collect::<Vec<_>>()
                .join("\n"),
        },
        Err(err) => SummaryRow {
            project: outcome.input.path().display().to_string(),
            version: String::new(),
            status: "FAILED".red().bold().to_string(),
            archive: String::new(),
            entry_points: String::new(),
            schedules: err.to_string(),
        },
    }
}

fn status_label(report: &ProjectReport) -> String {
    match report.upload {
        None => "BUILT".green().bold().to_string(),
        Some(upload) if upload.uncommitted => "UPLOADED (uncommitted)".yellow().bold().to_string(),
        Some(upload) if upload.created => "CREATED".green().bold().to_string(),
        Some(_) => "UPLOADED".green().bold().to_string(),
    }
}

fn archive_label(report: &ProjectReport) -> String {
    if report.archive_retained {
        report.archive.path.display().to_string()
    } else {
        "uploaded".to_string()
    }
}

pub(crate) fn describe_schedule(action: &ScheduleAction) -> String {
    match action {
        ScheduleAction::Created { flow, cron } => format!("{flow}: scheduled {cron}"),
        ScheduleAction::Replaced { flow, from, to } => format!(
            "{flow}: {} -> {to}",
            from.as_deref().unwrap_or("(no cron)")
        ),
        ScheduleAction::Unchanged { flow, cron } => format!("{flow}: unchanged {cron}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_descriptions() {
        assert_eq!(
            describe_schedule(&ScheduleAction::Created {
                flow: "main".into(),
                cron: "0 0 * * *".into()
            }),
            "main: scheduled 0 0 * * *"
        );
        assert_eq!(
            describe_schedule(&ScheduleAction::Replaced {
                flow: "main".into(),
                from: Some("0 0 * * *".into()),
                to: "0 6 * * *".into()
            }),
            "main: 0 0 * * * -> 0 6 * * *"
        );
        assert_eq!(
            describe_schedule(&ScheduleAction::Unchanged {
                flow: "main".into(),
                cron: "0 6 * * *".into()
            }),
            "main: unchanged 0 6 * * *"
        );
    }
}
