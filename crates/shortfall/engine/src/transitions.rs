//! The transition table: one row per edge of the pipeline.
//!
//! Reporting a shortage is the entry edge and happens at creation inside
//! the engine; every later move must match a row of [`TRANSITIONS`].
//! Each row names the event, the statuses it connects, the role that
//! normally drives it, and the audit slot it stamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shortfall_types::{Milestone, RequestStatus, Role};

// ── Events ───────────────────────────────────────────────────────────

/// Customer Service verdict on a scheduled request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Make the missing units
    Produce,
    /// Drop the request
    Cut,
}

/// A workflow event, carrying its payload where the edge needs one
#[derive(Clone, Debug, PartialEq)]
pub enum RequestEvent {
    /// Planning schedules the request with a completion target and
    /// production instructions
    Approve {
        eta: DateTime<Utc>,
        directive: String,
    },
    /// Customer Service rules produce-or-cut
    Decide(Decision),
    /// Production takes the request onto the line
    Start,
    /// Production reports the units made
    Finish,
    /// Logistics picks up the finished goods
    Collect,
}

impl RequestEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Approve { .. } => EventKind::Approve,
            Self::Decide(Decision::Produce) => EventKind::DecideProduce,
            Self::Decide(Decision::Cut) => EventKind::DecideCut,
            Self::Start => EventKind::Start,
            Self::Finish => EventKind::Finish,
            Self::Collect => EventKind::Collect,
        }
    }

    /// Operation name used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Approve { .. } => "approve",
            Self::Decide(_) => "decide",
            Self::Start => "start",
            Self::Finish => "finish",
            Self::Collect => "collect",
        }
    }
}

/// Payload-free shape of an event, the lookup key into the table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Approve,
    DecideProduce,
    DecideCut,
    Start,
    Finish,
    Collect,
}

// ── Transition Table ─────────────────────────────────────────────────

/// One edge of the pipeline
#[derive(Clone, Copy, Debug)]
pub struct TransitionRule {
    pub kind: EventKind,
    pub from: RequestStatus,
    pub to: RequestStatus,
    /// The role that normally drives this edge. Screens gate on it; the
    /// engine only logs when somebody else shows up.
    pub actor: Role,
    /// The audit slot this edge stamps, if any
    pub milestone: Option<Milestone>,
}

/// Every legal move. Anything not in this table is an invalid transition.
pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        kind: EventKind::Approve,
        from: RequestStatus::PendingPcp,
        to: RequestStatus::PendingCs,
        actor: Role::Planning,
        milestone: Some(Milestone::RequestedByPcp),
    },
    TransitionRule {
        kind: EventKind::DecideProduce,
        from: RequestStatus::PendingCs,
        to: RequestStatus::WaitingProduction,
        actor: Role::CustomerService,
        milestone: Some(Milestone::CsDecision),
    },
    TransitionRule {
        kind: EventKind::DecideCut,
        from: RequestStatus::PendingCs,
        to: RequestStatus::CancelledCs,
        actor: Role::CustomerService,
        milestone: Some(Milestone::CsDecision),
    },
    TransitionRule {
        // Taking a request onto the line stamps nothing; only completion
        // is tracked in the trail.
        kind: EventKind::Start,
        from: RequestStatus::WaitingProduction,
        to: RequestStatus::Producing,
        actor: Role::Production,
        milestone: None,
    },
    TransitionRule {
        kind: EventKind::Finish,
        from: RequestStatus::Producing,
        to: RequestStatus::WaitingLogistics,
        actor: Role::Production,
        milestone: Some(Milestone::FinishedProduction),
    },
    TransitionRule {
        kind: EventKind::Collect,
        from: RequestStatus::WaitingLogistics,
        to: RequestStatus::Collected,
        actor: Role::Logistics,
        milestone: Some(Milestone::Collected),
    },
];

/// Find the edge for an event from a status, if one exists
pub fn rule_for(from: RequestStatus, kind: EventKind) -> Option<&'static TransitionRule> {
    TRANSITIONS
        .iter()
        .find(|rule| rule.from == from && rule.kind == kind)
}

/// The events available from a status, in table order
pub fn events_from(status: RequestStatus) -> Vec<EventKind> {
    TRANSITIONS
        .iter()
        .filter(|rule| rule.from == status)
        .map(|rule| rule.kind)
        .collect()
}
