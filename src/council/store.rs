//! ProposalStore: owns Proposal and Vote records.
//!
//! Every mutating operation runs as one SQLite transaction behind a
//! store-wide write gate, so the duplicate-vote check, status check, tally
//! refresh, and status transition commit as a single atomic unit. Reads go
//! straight to the pool.
//!
//! Status transitions are monotone: Active -> {Approved, Rejected, Expired}
//! -> Executed. Finalization on an already-final proposal returns the
//! existing record instead of erroring, which is what makes overlapping
//! scheduler runs harmless.

use crate::council::error::{CouncilError, CouncilResult};
use crate::council::now_secs;
use crate::council::policy::{VotingPolicy, MAX_VOTING_POWER, MIN_VOTING_POWER};
use crate::council::proposal::{
    validate_vote_reasoning, Proposal, ProposalDraft, ProposalKind, ProposalStatus, Tally,
    UrgencyClass, Vote, VoteChoice,
};
use crate::council::tally;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS proposals (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        subject_ref TEXT,
        current_value INTEGER,
        proposed_value INTEGER,
        urgency_class TEXT NOT NULL,
        creator_id TEXT NOT NULL,
        reasoning TEXT NOT NULL,
        evidence_ref TEXT,
        created_at INTEGER NOT NULL,
        voting_deadline INTEGER NOT NULL,
        status TEXT NOT NULL,
        votes_for INTEGER NOT NULL DEFAULT 0,
        votes_against INTEGER NOT NULL DEFAULT 0,
        votes_abstain INTEGER NOT NULL DEFAULT 0,
        total_power_at_snapshot INTEGER NOT NULL DEFAULT 0,
        finalized_at INTEGER,
        executed_at INTEGER,
        execution_ref TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_proposals_status_deadline
        ON proposals (status, voting_deadline)",
    "CREATE TABLE IF NOT EXISTS votes (
        proposal_id INTEGER NOT NULL REFERENCES proposals (id),
        voter_id TEXT NOT NULL,
        choice TEXT NOT NULL,
        power INTEGER NOT NULL,
        reasoning TEXT NOT NULL,
        cast_at INTEGER NOT NULL,
        PRIMARY KEY (proposal_id, voter_id)
    )",
];

const SELECT_PROPOSAL: &str = "SELECT * FROM proposals WHERE id = ?1";

/// SQLite-backed proposal/vote store.
pub struct ProposalStore {
    pool: SqlitePool,
    policy: VotingPolicy,
    /// Serializes mutating transactions. SQLite is single-writer anyway;
    /// the gate keeps busy-retries out of the hot path.
    write_gate: Mutex<()>,
}

impl ProposalStore {
    /// Open (or create) the store at the given path.
    pub async fn open(path: &Path, policy: VotingPolicy) -> CouncilResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::init(pool, policy).await
    }

    /// In-memory store for tests. A single connection keeps every query on
    /// the same memory database.
    pub async fn open_in_memory(policy: VotingPolicy) -> CouncilResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::init(pool, policy).await
    }

    async fn init(pool: SqlitePool, policy: VotingPolicy) -> CouncilResult<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self {
            pool,
            policy,
            write_gate: Mutex::new(()),
        })
    }

    pub fn policy(&self) -> &VotingPolicy {
        &self.policy
    }

    /// Create a proposal in the Active state.
    pub async fn create(&self, draft: ProposalDraft) -> CouncilResult<Proposal> {
        self.create_at(draft, now_secs()).await
    }

    pub async fn create_at(&self, draft: ProposalDraft, now: i64) -> CouncilResult<Proposal> {
        draft.validate().map_err(CouncilError::Validation)?;

        let voting_deadline = now + self.policy.window_secs(draft.urgency_class) as i64;
        let _gate = self.write_gate.lock().await;
        let result = sqlx::query(
            "INSERT INTO proposals (
                kind, subject_ref, current_value, proposed_value, urgency_class,
                creator_id, reasoning, evidence_ref, created_at, voting_deadline, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(draft.kind.kind_str())
        .bind(draft.kind.subject_ref())
        .bind(draft.kind.current_value())
        .bind(draft.kind.proposed_value())
        .bind(draft.urgency_class.as_str())
        .bind(&draft.creator_id)
        .bind(&draft.reasoning)
        .bind(&draft.evidence_ref)
        .bind(now)
        .bind(voting_deadline)
        .bind(ProposalStatus::Active.as_str())
        .execute(&self.pool)
        .await?;

        Ok(Proposal {
            id: result.last_insert_rowid(),
            kind: draft.kind,
            urgency_class: draft.urgency_class,
            creator_id: draft.creator_id,
            reasoning: draft.reasoning,
            evidence_ref: draft.evidence_ref,
            created_at: now,
            voting_deadline,
            status: ProposalStatus::Active,
            tally: Tally::default(),
            finalized_at: None,
            executed_at: None,
            execution_ref: None,
        })
    }

    /// Cast a vote. The duplicate check, status check, vote insert, and
    /// tally refresh commit as one transaction.
    pub async fn cast_vote(
        &self,
        proposal_id: i64,
        voter_id: &str,
        power: u64,
        total_power: u64,
        choice: VoteChoice,
        reasoning: &str,
    ) -> CouncilResult<Vote> {
        self.cast_vote_at(proposal_id, voter_id, power, total_power, choice, reasoning, now_secs())
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn cast_vote_at(
        &self,
        proposal_id: i64,
        voter_id: &str,
        power: u64,
        total_power: u64,
        choice: VoteChoice,
        reasoning: &str,
        now: i64,
    ) -> CouncilResult<Vote> {
        validate_vote_reasoning(reasoning).map_err(CouncilError::Validation)?;
        if !(MIN_VOTING_POWER..=MAX_VOTING_POWER).contains(&power) {
            return Err(CouncilError::Validation(format!(
                "voting power {} outside {}..={}",
                power, MIN_VOTING_POWER, MAX_VOTING_POWER
            )));
        }

        let _gate = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;

        let proposal = fetch_in_tx(&mut tx, proposal_id).await?;
        if proposal.status != ProposalStatus::Active || now >= proposal.voting_deadline {
            return Err(CouncilError::NotActive(proposal_id));
        }

        let existing = sqlx::query("SELECT 1 FROM votes WHERE proposal_id = ?1 AND voter_id = ?2")
            .bind(proposal_id)
            .bind(voter_id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(CouncilError::DuplicateVote {
                proposal_id,
                voter_id: voter_id.to_string(),
            });
        }

        sqlx::query(
            "INSERT INTO votes (proposal_id, voter_id, choice, power, reasoning, cast_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(proposal_id)
        .bind(voter_id)
        .bind(choice.as_str())
        .bind(power as i64)
        .bind(reasoning)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let column = match choice {
            VoteChoice::Approve => "votes_for",
            VoteChoice::Reject => "votes_against",
            VoteChoice::Abstain => "votes_abstain",
        };
        sqlx::query(&format!(
            "UPDATE proposals SET {column} = {column} + ?1, total_power_at_snapshot = ?2
             WHERE id = ?3"
        ))
        .bind(power as i64)
        .bind(total_power as i64)
        .bind(proposal_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Vote {
            proposal_id,
            voter_id: voter_id.to_string(),
            choice,
            power,
            reasoning: reasoning.to_string(),
            cast_at: now,
        })
    }

    /// Finalize a proposal whose voting deadline has passed.
    ///
    /// Idempotent: an already-final proposal is returned unchanged. The
    /// tally read and the check-and-set of status happen in the same
    /// transaction, so a vote racing this call either lands before the
    /// decision or observes a non-Active proposal.
    pub async fn finalize_at_deadline(
        &self,
        proposal_id: i64,
        total_power: u64,
    ) -> CouncilResult<Proposal> {
        self.finalize_at_deadline_at(proposal_id, total_power, now_secs())
            .await
    }

    pub async fn finalize_at_deadline_at(
        &self,
        proposal_id: i64,
        total_power: u64,
        now: i64,
    ) -> CouncilResult<Proposal> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;

        let proposal = fetch_in_tx(&mut tx, proposal_id).await?;
        if proposal.status.is_final() {
            return Ok(proposal);
        }
        if now < proposal.voting_deadline {
            return Err(CouncilError::InvalidState {
                id: proposal_id,
                reason: "voting window still open".to_string(),
            });
        }

        let mut new_tally = proposal.tally;
        new_tally.total_power_at_snapshot = total_power;
        let outcome = tally::natural_outcome(
            &new_tally,
            total_power,
            proposal.urgency_class,
            &self.policy,
        );

        self.transition(tx, proposal, outcome.status(), new_tally, now).await
    }

    /// Emergency fast-path finalization, bypassing the deadline.
    ///
    /// Requires a supermajority of cast, non-abstain votes. Idempotent:
    /// re-invocation on a finalized proposal returns the existing terminal
    /// state. Credential verification happens in the service layer.
    pub async fn emergency_finalize(
        &self,
        proposal_id: i64,
        total_power: u64,
    ) -> CouncilResult<Proposal> {
        self.emergency_finalize_at(proposal_id, total_power, now_secs())
            .await
    }

    pub async fn emergency_finalize_at(
        &self,
        proposal_id: i64,
        total_power: u64,
        now: i64,
    ) -> CouncilResult<Proposal> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;

        let proposal = fetch_in_tx(&mut tx, proposal_id).await?;
        if proposal.status.is_final() {
            return Ok(proposal);
        }

        let mut new_tally = proposal.tally;
        new_tally.total_power_at_snapshot = total_power;
        let outcome = tally::emergency_outcome(&new_tally, &self.policy)
            .ok_or(CouncilError::NotEligible(proposal_id))?;

        self.transition(tx, proposal, outcome.status(), new_tally, now).await
    }

    /// Record successful execution of an approved proposal.
    pub async fn mark_executed(
        &self,
        proposal_id: i64,
        execution_ref: &str,
    ) -> CouncilResult<Proposal> {
        self.mark_executed_at(proposal_id, execution_ref, now_secs())
            .await
    }

    pub async fn mark_executed_at(
        &self,
        proposal_id: i64,
        execution_ref: &str,
        now: i64,
    ) -> CouncilResult<Proposal> {
        let _gate = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;

        let proposal = fetch_in_tx(&mut tx, proposal_id).await?;
        match proposal.status {
            ProposalStatus::Executed => return Err(CouncilError::AlreadyExecuted(proposal_id)),
            ProposalStatus::Approved => {}
            other => {
                return Err(CouncilError::InvalidState {
                    id: proposal_id,
                    reason: format!("cannot execute a {} proposal", other.as_str()),
                })
            }
        }

        let result = sqlx::query(
            "UPDATE proposals SET status = ?1, executed_at = ?2, execution_ref = ?3
             WHERE id = ?4 AND status = ?5 AND executed_at IS NULL",
        )
        .bind(ProposalStatus::Executed.as_str())
        .bind(now)
        .bind(execution_ref)
        .bind(proposal_id)
        .bind(ProposalStatus::Approved.as_str())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CouncilError::AlreadyExecuted(proposal_id));
        }
        tx.commit().await?;

        Ok(Proposal {
            status: ProposalStatus::Executed,
            executed_at: Some(now),
            execution_ref: Some(execution_ref.to_string()),
            ..proposal
        })
    }

    /// Fetch a proposal snapshot.
    pub async fn get(&self, proposal_id: i64) -> CouncilResult<Proposal> {
        let row = sqlx::query(SELECT_PROPOSAL)
            .bind(proposal_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => proposal_from_row(&row),
            None => Err(CouncilError::NotFound(proposal_id)),
        }
    }

    /// All votes for a proposal, in a stable (cast_at, voter_id) order.
    pub async fn list_votes(&self, proposal_id: i64) -> CouncilResult<Vec<Vote>> {
        self.get(proposal_id).await?;
        let rows = sqlx::query(
            "SELECT * FROM votes WHERE proposal_id = ?1 ORDER BY cast_at, voter_id",
        )
        .bind(proposal_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(vote_from_row).collect()
    }

    /// Active proposals whose voting deadline has passed (scheduler scan).
    pub async fn due_proposals(&self, now: i64) -> CouncilResult<Vec<i64>> {
        let rows = sqlx::query(
            "SELECT id FROM proposals WHERE status = ?1 AND voting_deadline <= ?2
             ORDER BY voting_deadline",
        )
        .bind(ProposalStatus::Active.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| row.try_get::<i64, _>("id").map_err(CouncilError::from))
            .collect()
    }

    /// Approved proposals awaiting execution (dispatcher scan).
    pub async fn pending_execution(&self) -> CouncilResult<Vec<i64>> {
        let rows = sqlx::query("SELECT id FROM proposals WHERE status = ?1 ORDER BY id")
            .bind(ProposalStatus::Approved.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<i64, _>("id").map_err(CouncilError::from))
            .collect()
    }

    /// Commit a status transition out of Active, stamping finalized_at.
    async fn transition(
        &self,
        mut tx: sqlx::Transaction<'_, sqlx::Sqlite>,
        proposal: Proposal,
        status: ProposalStatus,
        new_tally: Tally,
        now: i64,
    ) -> CouncilResult<Proposal> {
        let result = sqlx::query(
            "UPDATE proposals SET status = ?1, finalized_at = ?2, total_power_at_snapshot = ?3
             WHERE id = ?4 AND status = ?5",
        )
        .bind(status.as_str())
        .bind(now)
        .bind(new_tally.total_power_at_snapshot as i64)
        .bind(proposal.id)
        .bind(ProposalStatus::Active.as_str())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            drop(tx);
            return self.get(proposal.id).await;
        }
        tx.commit().await?;

        Ok(Proposal {
            status,
            tally: new_tally,
            finalized_at: Some(now),
            ..proposal
        })
    }
}

async fn fetch_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    proposal_id: i64,
) -> CouncilResult<Proposal> {
    let row = sqlx::query(SELECT_PROPOSAL)
        .bind(proposal_id)
        .fetch_optional(&mut **tx)
        .await?;
    match row {
        Some(row) => proposal_from_row(&row),
        None => Err(CouncilError::NotFound(proposal_id)),
    }
}

fn proposal_from_row(row: &SqliteRow) -> CouncilResult<Proposal> {
    let kind_str: String = row.try_get("kind")?;
    let kind = ProposalKind::from_columns(
        &kind_str,
        row.try_get("subject_ref")?,
        row.try_get("current_value")?,
        row.try_get("proposed_value")?,
    )
    .map_err(CouncilError::Store)?;

    let urgency_str: String = row.try_get("urgency_class")?;
    let urgency_class = UrgencyClass::parse(&urgency_str)
        .ok_or_else(|| CouncilError::Store(format!("unknown urgency class: {}", urgency_str)))?;

    let status_str: String = row.try_get("status")?;
    let status = ProposalStatus::parse(&status_str)
        .ok_or_else(|| CouncilError::Store(format!("unknown status: {}", status_str)))?;

    Ok(Proposal {
        id: row.try_get("id")?,
        kind,
        urgency_class,
        creator_id: row.try_get("creator_id")?,
        reasoning: row.try_get("reasoning")?,
        evidence_ref: row.try_get("evidence_ref")?,
        created_at: row.try_get("created_at")?,
        voting_deadline: row.try_get("voting_deadline")?,
        status,
        tally: Tally {
            votes_for: row.try_get::<i64, _>("votes_for")? as u64,
            votes_against: row.try_get::<i64, _>("votes_against")? as u64,
            votes_abstain: row.try_get::<i64, _>("votes_abstain")? as u64,
            total_power_at_snapshot: row.try_get::<i64, _>("total_power_at_snapshot")? as u64,
        },
        finalized_at: row.try_get("finalized_at")?,
        executed_at: row.try_get("executed_at")?,
        execution_ref: row.try_get("execution_ref")?,
    })
}

fn vote_from_row(row: &SqliteRow) -> CouncilResult<Vote> {
    let choice_str: String = row.try_get("choice")?;
    let choice = VoteChoice::parse(&choice_str)
        .ok_or_else(|| CouncilError::Store(format!("unknown vote choice: {}", choice_str)))?;
    Ok(Vote {
        proposal_id: row.try_get("proposal_id")?,
        voter_id: row.try_get("voter_id")?,
        choice,
        power: row.try_get::<i64, _>("power")? as u64,
        reasoning: row.try_get("reasoning")?,
        cast_at: row.try_get("cast_at")?,
    })
}
