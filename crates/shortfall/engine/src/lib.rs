//! Workflow engine for shortage requests.
//!
//! The engine owns every status change: requests enter through
//! [`WorkflowEngine::report`] and afterwards move only along the rows of
//! [`TRANSITIONS`]. On top of the canonical collection it derives the
//! per-role queue views and the dashboard metrics.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod engine;
mod metrics;
mod transitions;
mod views;

pub use engine::{ShortageReport, WorkflowEngine};
pub use metrics::{CriticalityBreakdown, DashboardMetrics, Insight, Severity, StatusBreakdown};
pub use transitions::{
    events_from, rule_for, Decision, EventKind, RequestEvent, TransitionRule, TRANSITIONS,
};
pub use views::{
    customer_service_queue, logistics_in_flight, matches_search, planning_queue, production_board,
    view_for, ProductionBoard, RoleView, ViewItem, ViewSection,
};
