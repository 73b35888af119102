//! Create a proposal.
//!
//! Syntax:
//! - lifeboard propose --as <reviewer> --kind urgency-update --subject <patient> \
//!     --current <n> --proposed <n> --reasoning <text> [--urgency emergency]
//! - lifeboard propose --as <reviewer> --kind patient-removal --subject <patient> ...
//! - lifeboard propose --as <reviewer> --kind system-parameter --subject <key> ...
//! - lifeboard propose --as <reviewer> --kind emergency-override [--subject <ref>] ...

use super::config::resolve_config;
use lifeboard::council::{ProposalKind, UrgencyClass};

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    config_path: Option<String>,
    creator: String,
    kind: String,
    urgency: String,
    subject: Option<String>,
    current: Option<i64>,
    proposed: Option<i64>,
    reasoning: String,
    evidence: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(config_path)?;
    let service = super::open_service(&config).await?;

    let urgency_class = UrgencyClass::parse(&urgency).ok_or_else(|| {
        format!(
            "Unknown urgency class: {}. Use 'standard' or 'emergency'.",
            urgency
        )
    })?;
    let kind = build_kind(&kind, subject, current, proposed)?;

    let proposal = service
        .create_proposal(&creator, kind, urgency_class, reasoning, evidence)
        .await?;

    println!("{}", serde_json::to_string_pretty(&proposal)?);
    Ok(())
}

/// Build the typed proposal payload from flat CLI flags.
fn build_kind(
    kind: &str,
    subject: Option<String>,
    current: Option<i64>,
    proposed: Option<i64>,
) -> Result<ProposalKind, String> {
    match kind {
        "urgency-update" => Ok(ProposalKind::UrgencyUpdate {
            patient_ref: subject.ok_or("--subject is required for urgency-update")?,
            current: current.ok_or("--current is required for urgency-update")?,
            proposed: proposed.ok_or("--proposed is required for urgency-update")?,
        }),
        "patient-removal" => Ok(ProposalKind::PatientRemoval {
            patient_ref: subject.ok_or("--subject is required for patient-removal")?,
        }),
        "system-parameter" => Ok(ProposalKind::SystemParameter {
            parameter: subject.ok_or("--subject is required for system-parameter")?,
            current: current.ok_or("--current is required for system-parameter")?,
            proposed: proposed.ok_or("--proposed is required for system-parameter")?,
        }),
        "emergency-override" => Ok(ProposalKind::EmergencyOverride {
            subject_ref: subject,
        }),
        other => Err(format!(
            "Unknown proposal kind: {}. Use urgency-update, patient-removal, \
             system-parameter, or emergency-override.",
            other
        )),
    }
}
