//! Batch jobs in collect-and-continue mode.

use planlink::{BatchReport, Session};
use tracing::info;

use crate::config::JobConfig;

/// Runs every job, recording each step. Within a job, a failed step skips
/// the steps after it; the next job starts regardless.
pub async fn run_jobs(session: &Session, jobs: &[JobConfig]) -> BatchReport {
    let mut report = BatchReport::new();
    for job in jobs {
        info!(job = %job.name, "starting job");
        run_job(session, job, &mut report).await;
    }
    report
}

async fn run_job(session: &Session, job: &JobConfig, report: &mut BatchReport) {
    let mut failed: Option<String> = None;

    if let Some(step) = &job.upload {
        let label = format!("{}/upload {}", job.name, step.file_id);
        let result = session.upload(&step.file_id, step.source.clone()).await;
        if report.record(&label, result).is_none() {
            failed = Some(label);
        }
    }

    for action_id in &job.actions {
        let label = format!("{}/action {action_id}", job.name);
        if let Some(cause) = &failed {
            report.skip(&label, format!("{cause} failed"));
            continue;
        }
        let result = session.execute_action(action_id).await;
        if report.record(&label, result).is_none() {
            failed = Some(label);
        }
    }

    if let Some(step) = &job.download {
        let label = format!("{}/download {}", job.name, step.action_id);
        if let Some(cause) = &failed {
            report.skip(&label, format!("{cause} failed"));
            return;
        }
        let result = match session.download(&step.action_id).await {
            Ok(content) => write_output(&step.output, &content).await,
            Err(e) => Err(e.into()),
        };
        report.record(&label, result);
    }
}

async fn write_output(path: &std::path::Path, content: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    info!(path = %path.display(), bytes = content.len(), "export written");
    Ok(())
}
