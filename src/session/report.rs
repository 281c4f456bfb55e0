// ABOUTME: Session reporter: aggregates outcomes into a persisted, human-readable report.
// ABOUTME: Reads the session, never mutates it.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::provision::ProvisionedResource;
use crate::types::ServiceName;

use super::state::{DeploymentSession, NodeState};

/// Overall session status: success only when every targeted node reached
/// an acceptable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallStatus {
    Success,
    Partial,
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallStatus::Success => write!(f, "success"),
            OverallStatus::Partial => write!(f, "partial"),
        }
    }
}

/// One service's line in the report.
#[derive(Debug, Clone)]
pub struct ServiceReportLine {
    pub name: ServiceName,
    pub role: String,
    pub state: NodeState,
    pub attempts: u32,
    pub error: Option<String>,
    pub diagnostics: Option<String>,
}

/// The finalized session report.
#[derive(Debug)]
pub struct Report {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub mode: String,
    pub overall: OverallStatus,
    pub services: Vec<ServiceReportLine>,
    /// Where persisted state lives: secrets store, certificates, reports.
    pub resources: Vec<String>,
}

/// Build the report from a finished session. Side-effect free; persisting
/// is a separate, explicit step.
pub fn finalize(
    session: &DeploymentSession,
    catalog: &Catalog,
    config: &Config,
    provisioned: &[ProvisionedResource],
) -> Report {
    let outcomes = session.snapshot();

    let services = session
        .target_services
        .iter()
        .map(|name| {
            let outcome = outcomes.get(name).cloned().unwrap_or_else(|| {
                // A node the scheduler never reached still gets a line.
                super::state::ServiceOutcome::pending()
            });
            Report::line_for(name, catalog, outcome)
        })
        .collect();

    let overall = if session.is_success() {
        OverallStatus::Success
    } else {
        OverallStatus::Partial
    };

    let mut resources: Vec<String> = provisioned
        .iter()
        .map(|r| {
            format!(
                "{}: {}{}",
                r.kind,
                r.identity,
                if r.reused { " (reused)" } else { "" }
            )
        })
        .collect();
    resources.push(format!("reports: {}", config.reports_dir().display()));

    Report {
        session_id: session.session_id.clone(),
        started_at: session.started_at,
        finished_at: Utc::now(),
        mode: session.mode.to_string(),
        overall,
        services,
        resources,
    }
}

impl Report {
    fn line_for(
        name: &ServiceName,
        catalog: &Catalog,
        outcome: super::state::ServiceOutcome,
    ) -> ServiceReportLine {
        ServiceReportLine {
            name: name.clone(),
            role: catalog
                .get(name)
                .map(|s| s.role.to_string())
                .unwrap_or_default(),
            state: outcome.state,
            attempts: outcome.attempts,
            error: outcome.last_error,
            diagnostics: outcome.diagnostics.map(|d| d.render()),
        }
    }

    /// Render the full human-readable report.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("stockade deployment report\n");
        out.push_str(&format!("session:  {}\n", self.session_id));
        out.push_str(&format!("mode:     {}\n", self.mode));
        out.push_str(&format!("started:  {}\n", self.started_at.to_rfc3339()));
        out.push_str(&format!("finished: {}\n", self.finished_at.to_rfc3339()));
        out.push_str(&format!("status:   {}\n", self.overall));
        out.push('\n');

        out.push_str("services:\n");
        for line in &self.services {
            out.push_str(&format!(
                "  {:<16} {:<14} {}",
                line.name, line.role, line.state
            ));
            if line.attempts > 0 {
                out.push_str(&format!(" (attempts: {})", line.attempts));
            }
            out.push('\n');

            if let Some(error) = &line.error {
                out.push_str(&format!("    error: {error}\n"));
            }
            if let Some(diag) = &line.diagnostics {
                out.push_str(diag);
            }
        }

        out.push('\n');
        out.push_str("resources:\n");
        for resource in &self.resources {
            out.push_str(&format!("  {resource}\n"));
        }

        out
    }

    /// Persist the rendered report under the reports directory. Returns
    /// the path written.
    pub fn persist(&self, config: &Config) -> std::io::Result<PathBuf> {
        let dir = config.reports_dir();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.txt", self.session_id));
        std::fs::write(&path, self.render())?;
        Ok(path)
    }

    /// One-line summary for the console.
    pub fn summary(&self) -> String {
        let ready = self
            .services
            .iter()
            .filter(|s| s.state.is_acceptable())
            .count();
        format!(
            "{}: {}/{} services ready",
            self.overall,
            ready,
            self.services.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::Readiness;
    use crate::session::{Mode, ServiceOutcome};

    fn name(s: &str) -> ServiceName {
        ServiceName::new(s).unwrap()
    }

    fn session_with(outcomes: &[(&str, ServiceOutcome)]) -> DeploymentSession {
        let targets = outcomes.iter().map(|(n, _)| name(n)).collect();
        let session = DeploymentSession::new(Mode::Custom, targets);
        for (n, outcome) in outcomes {
            session.record(&name(n), outcome.clone());
        }
        session
    }

    #[test]
    fn all_ready_is_success() {
        let catalog = Catalog::builtin();
        let config = Config::default();
        let session = session_with(&[
            ("elasticsearch", ServiceOutcome::ready(Readiness::Ready, 2)),
            ("cortex", ServiceOutcome::ready(Readiness::ReadyDegraded, 5)),
        ]);

        let report = finalize(&session, &catalog, &config, &[]);
        assert_eq!(report.overall, OverallStatus::Success);
        assert!(report.summary().contains("2/2"));
    }

    #[test]
    fn any_failure_is_partial() {
        let catalog = Catalog::builtin();
        let config = Config::default();
        let session = session_with(&[
            ("elasticsearch", ServiceOutcome::failed("timeout", 24, None)),
            ("kibana", ServiceOutcome::skipped("dependency elasticsearch did not become ready")),
        ]);

        let report = finalize(&session, &catalog, &config, &[]);
        assert_eq!(report.overall, OverallStatus::Partial);

        let rendered = report.render();
        assert!(rendered.contains("status:   partial"));
        assert!(rendered.contains("error: timeout"));
        assert!(rendered.contains("skipped"));
    }

    #[test]
    fn render_lists_resource_locations() {
        let catalog = Catalog::builtin();
        let config = Config::default();
        let session = session_with(&[("redis", ServiceOutcome::ready(Readiness::Ready, 1))]);

        let provisioned = vec![ProvisionedResource {
            kind: crate::provision::ResourceKind::Secrets,
            identity: "/var/lib/stockade/secrets/stockade.env".to_string(),
            reused: true,
            generated_at: Utc::now(),
        }];

        let report = finalize(&session, &catalog, &config, &provisioned);
        let rendered = report.render();
        assert!(rendered.contains("secrets: /var/lib/stockade/secrets/stockade.env (reused)"));
        assert!(rendered.contains("reports: /var/lib/stockade/reports"));
    }

    #[test]
    fn persist_writes_under_reports_dir() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::builtin();
        let config = Config {
            deploy_root: dir.path().to_path_buf(),
            ..Default::default()
        };
        let session = session_with(&[("redis", ServiceOutcome::ready(Readiness::Ready, 1))]);

        let report = finalize(&session, &catalog, &config, &[]);
        let path = report.persist(&config).unwrap();

        assert!(path.starts_with(config.reports_dir()));
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("stockade deployment report"));
    }
}
