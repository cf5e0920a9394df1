//! Shortage requests: the central tracked entity
//!
//! A ShortageRequest carries a status and a fixed-shape audit trail.
//! The two are views of the same history: every status is reached by
//! stamping (at most) one milestone slot, and the furthest slot present
//! must always match the status. The workflow engine is the only writer
//! of either field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ShortfallError, ShortfallResult};

// ── Request Identifier ───────────────────────────────────────────────

/// Unique identifier for a shortage request
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("REQ-{}", &raw[..8]))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Request Status ───────────────────────────────────────────────────

/// Pipeline status of a shortage request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Reported by Logistics, waiting for Planning to schedule
    PendingPcp,
    /// Scheduled by Planning, waiting for the Customer Service verdict
    PendingCs,
    /// Approved for production, queued
    WaitingProduction,
    /// On the production line
    Producing,
    /// Production finished, waiting for Logistics to collect
    WaitingLogistics,
    /// Collected by Logistics (terminal)
    Collected,
    /// Cut by Customer Service (terminal)
    CancelledCs,
}

impl RequestStatus {
    /// Check if this is a terminal status (no outgoing edges)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Collected | Self::CancelledCs)
    }

    /// Wire/export token for this status
    pub fn name(&self) -> &'static str {
        match self {
            Self::PendingPcp => "PENDING_PCP",
            Self::PendingCs => "PENDING_CS",
            Self::WaitingProduction => "WAITING_PRODUCTION",
            Self::Producing => "PRODUCING",
            Self::WaitingLogistics => "WAITING_LOGISTICS",
            Self::Collected => "COLLECTED",
            Self::CancelledCs => "CANCELLED_CS",
        }
    }

    /// The milestone a request in this status has most recently stamped.
    ///
    /// PRODUCING maps to the Customer Service decision: taking a request
    /// onto the line stamps nothing, so its furthest slot is still the
    /// verdict that queued it.
    pub fn furthest_milestone(&self) -> Milestone {
        match self {
            Self::PendingPcp => Milestone::Reported,
            Self::PendingCs => Milestone::RequestedByPcp,
            Self::WaitingProduction | Self::Producing | Self::CancelledCs => Milestone::CsDecision,
            Self::WaitingLogistics => Milestone::FinishedProduction,
            Self::Collected => Milestone::Collected,
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ── Criticality ──────────────────────────────────────────────────────

/// Priority classification, fixed at creation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Criticality {
    Low,
    Medium,
    High,
}

impl Criticality {
    /// Sort rank for planning queues; most critical first
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Criticality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ── Audit Trail ──────────────────────────────────────────────────────

/// Lifecycle milestones that stamp the audit trail
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    Reported,
    RequestedByPcp,
    CsDecision,
    FinishedProduction,
    Collected,
}

/// One milestone stamp: when it happened and who acted.
///
/// `user` is a copy of the actor's display name taken at the moment of
/// action; renaming the account later never rewrites history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub date: DateTime<Utc>,
    pub user: String,
}

impl AuditEntry {
    pub fn new(date: DateTime<Utc>, user: impl Into<String>) -> Self {
        Self {
            date,
            user: user.into(),
        }
    }

    /// Stamp for an action happening now
    pub fn now(user: impl Into<String>) -> Self {
        Self::new(Utc::now(), user)
    }
}

/// Fixed-shape audit trail: one slot per milestone, written at most once.
///
/// `reported` exists from creation; the rest start empty and are filled
/// by their transitions. Slots are never overwritten.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    pub reported: AuditEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by_pcp: Option<AuditEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cs_decision: Option<AuditEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_production: Option<AuditEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collected: Option<AuditEntry>,
}

impl AuditTrail {
    /// Start a trail with its mandatory creation stamp
    pub fn new(reported: AuditEntry) -> Self {
        Self {
            reported,
            requested_by_pcp: None,
            cs_decision: None,
            finished_production: None,
            collected: None,
        }
    }

    /// Read one milestone slot
    pub fn entry(&self, milestone: Milestone) -> Option<&AuditEntry> {
        match milestone {
            Milestone::Reported => Some(&self.reported),
            Milestone::RequestedByPcp => self.requested_by_pcp.as_ref(),
            Milestone::CsDecision => self.cs_decision.as_ref(),
            Milestone::FinishedProduction => self.finished_production.as_ref(),
            Milestone::Collected => self.collected.as_ref(),
        }
    }

    /// Write a milestone slot.
    ///
    /// Slots are write-once; a second write is rejected so a replayed
    /// transition can never rewrite history. `reported` is written at
    /// creation only and cannot be recorded here.
    pub fn record(&mut self, milestone: Milestone, entry: AuditEntry) -> ShortfallResult<()> {
        let slot = match milestone {
            Milestone::Reported => {
                return Err(ShortfallError::InvalidInput(
                    "the reported stamp is written at creation".to_string(),
                ))
            }
            Milestone::RequestedByPcp => &mut self.requested_by_pcp,
            Milestone::CsDecision => &mut self.cs_decision,
            Milestone::FinishedProduction => &mut self.finished_production,
            Milestone::Collected => &mut self.collected,
        };
        if slot.is_some() {
            return Err(ShortfallError::InvalidInput(format!(
                "audit slot '{:?}' is already written",
                milestone
            )));
        }
        *slot = Some(entry);
        Ok(())
    }

    /// The furthest milestone present, in pipeline order
    pub fn furthest_milestone(&self) -> Milestone {
        if self.collected.is_some() {
            Milestone::Collected
        } else if self.finished_production.is_some() {
            Milestone::FinishedProduction
        } else if self.cs_decision.is_some() {
            Milestone::CsDecision
        } else if self.requested_by_pcp.is_some() {
            Milestone::RequestedByPcp
        } else {
            Milestone::Reported
        }
    }

    /// Number of milestone slots written
    pub fn stamp_count(&self) -> usize {
        1 + [
            self.requested_by_pcp.is_some(),
            self.cs_decision.is_some(),
            self.finished_production.is_some(),
            self.collected.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

// ── Shortage Request ─────────────────────────────────────────────────

/// A tracked shortage: one missing item moving through the pipeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShortageRequest {
    /// Unique identifier, assigned at creation
    pub id: RequestId,
    /// Product code, resolved against the product master at creation
    pub code: String,
    /// Item description, copied from the product master
    pub description: String,
    /// Units short
    pub quantity: u32,
    /// quantity × unit weight, kilograms, 3-decimal precision
    pub total_weight: f64,
    /// True when the request was opened at HIGH criticality
    pub priority: bool,
    /// Criticality classification, fixed at creation
    pub criticality: Criticality,
    /// Optional carrier/batch reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_number: Option<String>,
    /// Current pipeline status
    pub status: RequestStatus,
    /// Planned completion, set by Planning at approval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<DateTime<Utc>>,
    /// Production instructions, set by Planning at approval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directive: Option<String>,
    /// Milestone audit trail
    pub timestamps: AuditTrail,
}

impl ShortageRequest {
    /// Open a new request in the initial status with its creation stamp
    pub fn open(
        code: impl Into<String>,
        description: impl Into<String>,
        quantity: u32,
        total_weight: f64,
        criticality: Criticality,
        reported: AuditEntry,
    ) -> Self {
        Self {
            id: RequestId::generate(),
            code: code.into(),
            description: description.into(),
            quantity,
            total_weight,
            priority: criticality == Criticality::High,
            criticality,
            load_number: None,
            status: RequestStatus::PendingPcp,
            eta: None,
            directive: None,
            timestamps: AuditTrail::new(reported),
        }
    }

    pub fn with_load_number(mut self, load_number: impl Into<String>) -> Self {
        self.load_number = Some(load_number.into());
        self
    }

    /// Check if the request reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Active means still in the pipeline: neither collected nor cut
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Check that the trail agrees with the status: the furthest slot
    /// present is exactly the one the status implies
    pub fn trail_is_consistent(&self) -> bool {
        self.timestamps.furthest_milestone() == self.status.furthest_milestone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp(user: &str) -> AuditEntry {
        AuditEntry::now(user)
    }

    fn open_request(criticality: Criticality) -> ShortageRequest {
        ShortageRequest::open(
            "PA-100",
            "Steel bracket",
            4,
            1.0,
            criticality,
            stamp("Ana Ferreira"),
        )
    }

    #[test]
    fn open_request_starts_pending_planning() {
        let request = open_request(Criticality::Medium);
        assert_eq!(request.status, RequestStatus::PendingPcp);
        assert!(!request.priority);
        assert!(request.is_active());
        assert!(request.trail_is_consistent());
        assert_eq!(request.timestamps.reported.user, "Ana Ferreira");
        assert_eq!(request.timestamps.stamp_count(), 1);
    }

    #[test]
    fn high_criticality_sets_priority() {
        let request = open_request(Criticality::High);
        assert!(request.priority);
    }

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert!(a.0.starts_with("REQ-"));
        assert_ne!(a, b);

        let named = RequestId::new("REQ-fixed");
        assert_eq!(format!("{}", named), "REQ-fixed");
    }

    #[test]
    fn terminal_statuses() {
        assert!(RequestStatus::Collected.is_terminal());
        assert!(RequestStatus::CancelledCs.is_terminal());
        assert!(!RequestStatus::PendingPcp.is_terminal());
        assert!(!RequestStatus::Producing.is_terminal());
    }

    #[test]
    fn criticality_rank_orders_high_first() {
        assert!(Criticality::High.rank() < Criticality::Medium.rank());
        assert!(Criticality::Medium.rank() < Criticality::Low.rank());
    }

    #[test]
    fn audit_slots_are_write_once() {
        let mut trail = AuditTrail::new(stamp("Ana Ferreira"));
        trail
            .record(Milestone::RequestedByPcp, stamp("Paulo Reis"))
            .unwrap();

        let second = trail.record(Milestone::RequestedByPcp, stamp("Paulo Reis"));
        assert!(matches!(second, Err(ShortfallError::InvalidInput(_))));

        let reported = trail.record(Milestone::Reported, stamp("Paulo Reis"));
        assert!(matches!(reported, Err(ShortfallError::InvalidInput(_))));
        assert_eq!(trail.reported.user, "Ana Ferreira");
    }

    #[test]
    fn furthest_milestone_follows_pipeline_order() {
        let mut trail = AuditTrail::new(stamp("Ana Ferreira"));
        assert_eq!(trail.furthest_milestone(), Milestone::Reported);

        trail
            .record(Milestone::RequestedByPcp, stamp("Paulo Reis"))
            .unwrap();
        assert_eq!(trail.furthest_milestone(), Milestone::RequestedByPcp);

        trail
            .record(Milestone::CsDecision, stamp("Marta Lima"))
            .unwrap();
        trail
            .record(Milestone::FinishedProduction, stamp("Jorge Dias"))
            .unwrap();
        assert_eq!(trail.furthest_milestone(), Milestone::FinishedProduction);

        trail
            .record(Milestone::Collected, stamp("Ana Ferreira"))
            .unwrap();
        assert_eq!(trail.furthest_milestone(), Milestone::Collected);
        assert_eq!(trail.stamp_count(), 5);
    }

    #[test]
    fn producing_maps_to_cs_decision_milestone() {
        // Taking a request onto the line stamps nothing, so PRODUCING
        // is still backed by the cs_decision slot.
        assert_eq!(
            RequestStatus::Producing.furthest_milestone(),
            Milestone::CsDecision
        );
    }

    #[test]
    fn status_wire_tokens_are_screaming_snake() {
        let token = serde_json::to_string(&RequestStatus::PendingPcp).unwrap();
        assert_eq!(token, "\"PENDING_PCP\"");
        let token = serde_json::to_string(&RequestStatus::CancelledCs).unwrap();
        assert_eq!(token, "\"CANCELLED_CS\"");
        let parsed: RequestStatus = serde_json::from_str("\"WAITING_LOGISTICS\"").unwrap();
        assert_eq!(parsed, RequestStatus::WaitingLogistics);
    }

    #[test]
    fn request_serde_round_trip() {
        let request = open_request(Criticality::High).with_load_number("L-2209");
        let json = serde_json::to_string(&request).unwrap();
        let back: ShortageRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
        // Unset slots stay off the wire entirely.
        assert!(!json.contains("cs_decision"));
        assert!(json.contains("\"criticality\":\"HIGH\""));
    }
}
