//! Command runners.
//!
//! Each function drives one operation against the collaborators and folds
//! the outcome, or the fatal error, into a [`CommandReport`]. The binary
//! only builds collaborators and prints.

use std::path::Path;

use ppa_catalog::ChannelRef;
use serde_json::json;

use crate::archive::Archive;
use crate::builds::{query_builds, BuildQuery};
use crate::channel::{channel_info, ensure_channel, project_info, EnsureChannelRequest};
use crate::people;
use crate::reconcile::{ReconcileRequest, ReconciliationEngine};
use crate::report::CommandReport;
use crate::retention::{FailureThreshold, Pruner, RetentionPolicy};
use crate::upload::{perform_upload, ChangesFile, Uploader};

/// Look up a person or team by name.
pub fn user_info(archive: &dyn Archive, name: &str) -> CommandReport {
    let report = CommandReport::new("user-info").with("user", name);
    match people::user_info(archive, name) {
        Ok(lookup) => report
            .with("user", &lookup.user)
            .with("count", lookup.people.len())
            .with("details", &lookup.details)
            .with("people", &lookup.people),
        Err(e) => report.fail(&e),
    }
}

/// Reconcile one package, uploading when it must be present and is not.
pub fn source_package(
    archive: &dyn Archive,
    uploader: &dyn Uploader,
    request: &ReconcileRequest,
    threshold: FailureThreshold,
) -> CommandReport {
    let mut report = CommandReport::new("source-package");
    report.insert("ppa", request.channel.to_string());
    report.insert("name", &request.name);
    report.insert("version", &request.version);
    report.insert("ensure", request.intent);

    let result = match ReconciliationEngine::new(archive).reconcile(request) {
        Ok(result) => result,
        Err(failure) => {
            report.insert("sources", &failure.partial.affected);
            report.insert("messages", &failure.partial.messages);
            return report.fail(&failure.error);
        }
    };

    let mut changed = result.deletions_requested > 0;
    let mut messages = result.messages.clone();
    if let Some(directive) = &result.upload {
        if request.dry_run {
            messages.push(format!(
                "Would upload {} to {}",
                directive.manifest.display(),
                directive.channel.upload_target()
            ));
        } else {
            match perform_upload(uploader, directive) {
                Ok(upload) => {
                    tracing::info!(target_ppa = %upload.target, files = upload.count, "upload complete");
                    changed = true;
                    report.insert("dput", upload);
                }
                Err(e) => {
                    report.insert("sources", &result.affected);
                    report.insert("messages", &messages);
                    return report.fail(&e);
                }
            }
        }
    }

    let failed = result.is_failure(threshold);
    report.insert("sources", &result.affected);
    report.insert("messages", &messages);
    if !result.failures.is_empty() {
        report.insert("failures", &result.failures);
    }
    let report = report.changed(changed);
    if failed {
        let msg = format!("{} deletion request(s) failed", result.failures.len());
        report.fail_with("deletion", msg)
    } else {
        report
    }
}

/// Trim a channel down to the policy cap.
pub fn prune(
    archive: &dyn Archive,
    project: &str,
    name: &str,
    policy: RetentionPolicy,
    threshold: FailureThreshold,
) -> CommandReport {
    let report = CommandReport::new("prune")
        .with("ppa", format!("{project}/{name}"))
        .with("max_sources", policy.max_sources)
        .with("order_by", policy.order_by)
        .with("dry_run", policy.dry_run);

    let outcome = match Pruner::new(archive, policy).run_for(project, name) {
        Ok(outcome) => outcome,
        Err(e) => return report.fail(&e),
    };

    let failed = outcome.is_failure(threshold);
    let failures = outcome.deletions.failures.len();
    let report = report
        .with("count", outcome.deletions.deleted.len())
        .with("kept", &outcome.decision.kept)
        .with("pruned", &outcome.deletions.deleted)
        .with("failures", &outcome.deletions.failures)
        .changed(outcome.changed());
    if failed {
        report.fail_with("deletion", format!("{failures} deletion request(s) failed"))
    } else {
        report
    }
}

/// Recent build activity of one source package.
pub fn build_records(
    archive: &dyn Archive,
    channel: &ChannelRef,
    source_name: &str,
    query: &BuildQuery,
) -> CommandReport {
    let report = CommandReport::new("build-records")
        .with("ppa", channel.to_string())
        .with("source_name", source_name)
        .with("time_frame", query.window_minutes);
    match query_builds(archive, channel, source_name, query) {
        Ok(builds) => report.with("count", builds.len()).with("builds", builds),
        Err(e) => report.fail(&e),
    }
}

/// Ensure a channel is present or absent.
pub fn ppa(archive: &dyn Archive, request: &EnsureChannelRequest) -> CommandReport {
    let report = CommandReport::new("ppa")
        .with("project", &request.project)
        .with("name", &request.name)
        .with("ensure", request.intent);
    match ensure_channel(archive, request) {
        Ok(outcome) => report
            .with("action", outcome.action)
            .with("ppa", &outcome.details)
            .changed(outcome.changed),
        Err(e) => report.fail(&e),
    }
}

pub fn ppa_info(archive: &dyn Archive, project: &str, name: &str) -> CommandReport {
    let report = CommandReport::new("ppa-info");
    match channel_info(archive, project, name) {
        Ok(details) => report.with("ppa", details),
        Err(e) => report.fail(&e),
    }
}

pub fn project_info_report(archive: &dyn Archive, project: &str) -> CommandReport {
    let report = CommandReport::new("project-info");
    match project_info(archive, project) {
        Ok(details) => report.with("project", details),
        Err(e) => report.fail(&e),
    }
}

/// Upload a `.changes` manifest directly. With `dry_run` the manifest is
/// only parsed and verified.
pub fn upload(
    uploader: &dyn Uploader,
    manifest: &Path,
    channel: &ChannelRef,
    dry_run: bool,
) -> CommandReport {
    let report = CommandReport::new("upload")
        .with("ppa", channel.upload_target())
        .with("source_changes", manifest.display().to_string());

    if dry_run {
        let checked = ChangesFile::load(manifest).and_then(|changes| {
            changes.verify()?;
            Ok(changes)
        });
        return match checked {
            Ok(changes) => {
                let files: Vec<String> =
                    changes.files().iter().map(|p| p.display().to_string()).collect();
                report.with(
                    "dput",
                    json!({
                        "target": channel.upload_target(),
                        "count": files.len(),
                        "uploads": files,
                    }),
                )
            }
            Err(e) => report.fail_with("upload", e.to_string()),
        };
    }

    match uploader.upload(manifest, channel) {
        Ok(sent) => report.with("dput", sent).changed(true),
        Err(e) => report.fail_with("upload", e.to_string()),
    }
}
