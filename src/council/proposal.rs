//! Proposal and Vote data model.
//!
//! `ProposalKind` is a tagged union: each exception type carries only its
//! required fields and is rejected at construction if they are missing, so
//! nothing downstream re-validates payload shape.

use crate::council::policy::{MIN_PROPOSAL_REASONING, MIN_VOTE_REASONING};
use serde::{Deserialize, Serialize};

/// Urgency class, fixed at creation. Selects the voting window and the
/// natural-finalization approval threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyClass {
    Standard,
    Emergency,
}

impl UrgencyClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyClass::Standard => "standard",
            UrgencyClass::Emergency => "emergency",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(UrgencyClass::Standard),
            "emergency" => Some(UrgencyClass::Emergency),
            _ => None,
        }
    }
}

/// Proposal status.
///
/// Transitions are monotone: Active -> {Approved, Rejected, Expired},
/// Executed only from Approved. No transition ever returns to Active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Active,
    Approved,
    Rejected,
    Expired,
    Executed,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Active => "active",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Expired => "expired",
            ProposalStatus::Executed => "executed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ProposalStatus::Active),
            "approved" => Some(ProposalStatus::Approved),
            "rejected" => Some(ProposalStatus::Rejected),
            "expired" => Some(ProposalStatus::Expired),
            "executed" => Some(ProposalStatus::Executed),
            _ => None,
        }
    }

    /// True once the proposal has left Active.
    pub fn is_final(&self) -> bool {
        !matches!(self, ProposalStatus::Active)
    }
}

/// Vote choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    Approve,
    Reject,
    Abstain,
}

impl VoteChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteChoice::Approve => "approve",
            VoteChoice::Reject => "reject",
            VoteChoice::Abstain => "abstain",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(VoteChoice::Approve),
            "reject" => Some(VoteChoice::Reject),
            "abstain" => Some(VoteChoice::Abstain),
            _ => None,
        }
    }
}

/// Exception types, each with exactly the fields it requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalKind {
    /// Change a patient's urgency value on the allocation queue.
    UrgencyUpdate {
        patient_ref: String,
        current: i64,
        proposed: i64,
    },
    /// Deactivate a patient on the allocation queue.
    PatientRemoval { patient_ref: String },
    /// Change a named allocation parameter.
    SystemParameter {
        parameter: String,
        current: i64,
        proposed: i64,
    },
    /// Application-specific override of the allocation engine.
    EmergencyOverride { subject_ref: Option<String> },
}

impl ProposalKind {
    pub fn kind_str(&self) -> &'static str {
        match self {
            ProposalKind::UrgencyUpdate { .. } => "urgency_update",
            ProposalKind::PatientRemoval { .. } => "patient_removal",
            ProposalKind::SystemParameter { .. } => "system_parameter",
            ProposalKind::EmergencyOverride { .. } => "emergency_override",
        }
    }

    /// Subject reference column value (patient hash or parameter key).
    pub fn subject_ref(&self) -> Option<&str> {
        match self {
            ProposalKind::UrgencyUpdate { patient_ref, .. } => Some(patient_ref),
            ProposalKind::PatientRemoval { patient_ref } => Some(patient_ref),
            ProposalKind::SystemParameter { parameter, .. } => Some(parameter),
            ProposalKind::EmergencyOverride { subject_ref } => subject_ref.as_deref(),
        }
    }

    pub fn current_value(&self) -> Option<i64> {
        match self {
            ProposalKind::UrgencyUpdate { current, .. } => Some(*current),
            ProposalKind::SystemParameter { current, .. } => Some(*current),
            _ => None,
        }
    }

    pub fn proposed_value(&self) -> Option<i64> {
        match self {
            ProposalKind::UrgencyUpdate { proposed, .. } => Some(*proposed),
            ProposalKind::SystemParameter { proposed, .. } => Some(*proposed),
            _ => None,
        }
    }

    /// Reject empty subject references at construction time.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ProposalKind::UrgencyUpdate { patient_ref, .. }
            | ProposalKind::PatientRemoval { patient_ref } => {
                if patient_ref.trim().is_empty() {
                    return Err("patient reference must not be empty".to_string());
                }
            }
            ProposalKind::SystemParameter { parameter, .. } => {
                if parameter.trim().is_empty() {
                    return Err("parameter key must not be empty".to_string());
                }
            }
            ProposalKind::EmergencyOverride { subject_ref } => {
                if let Some(r) = subject_ref {
                    if r.trim().is_empty() {
                        return Err("subject reference must not be empty".to_string());
                    }
                }
            }
        }
        Ok(())
    }

    /// Rebuild a kind from its persisted columns.
    pub fn from_columns(
        kind: &str,
        subject_ref: Option<String>,
        current_value: Option<i64>,
        proposed_value: Option<i64>,
    ) -> Result<Self, String> {
        let kind = match kind {
            "urgency_update" => ProposalKind::UrgencyUpdate {
                patient_ref: subject_ref.ok_or("urgency_update requires a patient reference")?,
                current: current_value.ok_or("urgency_update requires a current value")?,
                proposed: proposed_value.ok_or("urgency_update requires a proposed value")?,
            },
            "patient_removal" => ProposalKind::PatientRemoval {
                patient_ref: subject_ref.ok_or("patient_removal requires a patient reference")?,
            },
            "system_parameter" => ProposalKind::SystemParameter {
                parameter: subject_ref.ok_or("system_parameter requires a parameter key")?,
                current: current_value.ok_or("system_parameter requires a current value")?,
                proposed: proposed_value.ok_or("system_parameter requires a proposed value")?,
            },
            "emergency_override" => ProposalKind::EmergencyOverride {
                subject_ref,
            },
            other => return Err(format!("unknown proposal kind: {}", other)),
        };
        kind.validate()?;
        Ok(kind)
    }
}

/// Cached weighted tally snapshot, refreshed atomically on every vote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub votes_for: u64,
    pub votes_against: u64,
    pub votes_abstain: u64,
    /// Total eligible voting power at the last refresh (vote or finalize).
    pub total_power_at_snapshot: u64,
}

impl Tally {
    /// Weighted power of all cast votes, abstentions included.
    pub fn cast_power(&self) -> u64 {
        self.votes_for + self.votes_against + self.votes_abstain
    }

    /// Weighted power of non-abstain votes.
    pub fn decisive_power(&self) -> u64 {
        self.votes_for + self.votes_against
    }

    pub fn participation_rate(&self) -> f64 {
        rate(self.cast_power(), self.total_power_at_snapshot)
    }

    pub fn approval_rate(&self) -> f64 {
        rate(self.votes_for, self.total_power_at_snapshot)
    }

    pub fn rejection_rate(&self) -> f64 {
        rate(self.votes_against, self.total_power_at_snapshot)
    }
}

fn rate(value: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        value as f64 / total as f64
    }
}

/// A proposal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: i64,
    #[serde(flatten)]
    pub kind: ProposalKind,
    pub urgency_class: UrgencyClass,
    pub creator_id: String,
    pub reasoning: String,
    pub evidence_ref: Option<String>,
    pub created_at: i64,
    pub voting_deadline: i64,
    pub status: ProposalStatus,
    pub tally: Tally,
    pub finalized_at: Option<i64>,
    pub executed_at: Option<i64>,
    pub execution_ref: Option<String>,
}

/// A vote record. Immutable once written; at most one per (proposal, voter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub proposal_id: i64,
    pub voter_id: String,
    pub choice: VoteChoice,
    /// Voter's weight at vote time, immune to later registry changes.
    pub power: u64,
    pub reasoning: String,
    pub cast_at: i64,
}

/// Input to proposal creation, validated before anything is persisted.
#[derive(Debug, Clone)]
pub struct ProposalDraft {
    pub kind: ProposalKind,
    pub urgency_class: UrgencyClass,
    pub creator_id: String,
    pub reasoning: String,
    pub evidence_ref: Option<String>,
}

impl ProposalDraft {
    pub fn validate(&self) -> Result<(), String> {
        self.kind.validate()?;
        if self.creator_id.trim().is_empty() {
            return Err("creator id must not be empty".to_string());
        }
        if self.reasoning.chars().count() < MIN_PROPOSAL_REASONING {
            return Err(format!(
                "proposal reasoning must be at least {} characters",
                MIN_PROPOSAL_REASONING
            ));
        }
        Ok(())
    }
}

/// Validate vote reasoning length.
pub fn validate_vote_reasoning(reasoning: &str) -> Result<(), String> {
    if reasoning.chars().count() < MIN_VOTE_REASONING {
        return Err(format!(
            "vote reasoning must be at least {} characters",
            MIN_VOTE_REASONING
        ));
    }
    Ok(())
}
