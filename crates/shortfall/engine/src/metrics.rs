//! Dashboard aggregation.
//!
//! Every figure is recomputed from the full collection on each read;
//! nothing is cached. "Today" is the calendar day of a caller-supplied
//! `now`, which keeps the computation deterministic under test.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shortfall_types::{Criticality, RequestStatus, ShortageRequest};

/// Severity of a dashboard finding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Danger,
    Warning,
    Info,
    Success,
}

/// One headline for the dashboard banner
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Insight {
    pub severity: Severity,
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatusBreakdown {
    pub status: RequestStatus,
    pub count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct CriticalityBreakdown {
    pub criticality: Criticality,
    pub count: usize,
}

/// The in-pipeline statuses the breakdown chart reports, in pipeline order
const PIPELINE_STATUSES: [RequestStatus; 5] = [
    RequestStatus::PendingPcp,
    RequestStatus::PendingCs,
    RequestStatus::WaitingProduction,
    RequestStatus::Producing,
    RequestStatus::WaitingLogistics,
];

/// Everything the dashboard shows, computed in one pass
#[derive(Clone, Debug, Serialize)]
pub struct DashboardMetrics {
    pub active_count: usize,
    pub collected_today: usize,
    pub collected_weight_today: f64,
    pub cuts_today: usize,
    pub producing_count: usize,
    pub producing_weight: f64,
    pub sla_percent: f64,
    pub status_breakdown: Vec<StatusBreakdown>,
    pub criticality_breakdown: Vec<CriticalityBreakdown>,
    pub insights: Vec<Insight>,
}

impl DashboardMetrics {
    pub fn compute(requests: &[ShortageRequest], now: DateTime<Utc>) -> Self {
        let today = now.date_naive();

        let active: Vec<&ShortageRequest> = requests
            .iter()
            .filter(|request| request.is_active())
            .collect();

        let mut collected_today = 0usize;
        let mut collected_weight_today = 0.0f64;
        for request in requests {
            if let Some(entry) = &request.timestamps.collected {
                if entry.date.date_naive() == today {
                    collected_today += 1;
                    collected_weight_today += request.total_weight;
                }
            }
        }

        let cuts_today = requests
            .iter()
            .filter(|request| request.status == RequestStatus::CancelledCs)
            .filter(|request| {
                request
                    .timestamps
                    .cs_decision
                    .as_ref()
                    .map_or(false, |entry| entry.date.date_naive() == today)
            })
            .count();

        let producing: Vec<&ShortageRequest> = requests
            .iter()
            .filter(|request| request.status == RequestStatus::Producing)
            .collect();
        let producing_weight = producing.iter().map(|request| request.total_weight).sum();

        let status_breakdown = PIPELINE_STATUSES
            .iter()
            .map(|status| StatusBreakdown {
                status: *status,
                count: requests
                    .iter()
                    .filter(|request| request.status == *status)
                    .count(),
            })
            .collect();

        let criticality_breakdown = [Criticality::High, Criticality::Medium, Criticality::Low]
            .iter()
            .map(|criticality| CriticalityBreakdown {
                criticality: *criticality,
                count: active
                    .iter()
                    .filter(|request| request.criticality == *criticality)
                    .count(),
            })
            .collect();

        let high_active = active
            .iter()
            .filter(|request| request.criticality == Criticality::High)
            .count();
        let pending_planning = requests
            .iter()
            .filter(|request| request.status == RequestStatus::PendingPcp)
            .count();
        let waiting_collection = requests
            .iter()
            .filter(|request| request.status == RequestStatus::WaitingLogistics)
            .count();

        Self {
            active_count: active.len(),
            collected_today,
            collected_weight_today: round3(collected_weight_today),
            cuts_today,
            producing_count: producing.len(),
            producing_weight: round3(producing_weight),
            sla_percent: sla_percent(requests),
            status_breakdown,
            criticality_breakdown,
            insights: build_insights(high_active, pending_planning, waiting_collection, cuts_today),
        }
    }
}

/// Share of completed requests that finished on or before their eta.
///
/// Only requests that made it past production and carry both a schedule
/// and a finish stamp are measured; an empty measurement reads 100.0.
fn sla_percent(requests: &[ShortageRequest]) -> f64 {
    let mut measured = 0usize;
    let mut on_time = 0usize;
    for request in requests {
        if !matches!(
            request.status,
            RequestStatus::WaitingLogistics | RequestStatus::Collected
        ) {
            continue;
        }
        let eta = match request.eta {
            Some(eta) => eta,
            None => continue,
        };
        let finished = match &request.timestamps.finished_production {
            Some(entry) => entry.date,
            None => continue,
        };
        measured += 1;
        if finished <= eta {
            on_time += 1;
        }
    }
    if measured == 0 {
        return 100.0;
    }
    round1(on_time as f64 / measured as f64 * 100.0)
}

fn build_insights(
    high_active: usize,
    pending_planning: usize,
    waiting_collection: usize,
    cuts_today: usize,
) -> Vec<Insight> {
    let mut insights = Vec::new();
    if high_active > 0 {
        insights.push(Insight {
            severity: Severity::Danger,
            message: format!("{high_active} HIGH criticality requests active"),
        });
    }
    if pending_planning > 5 {
        insights.push(Insight {
            severity: Severity::Warning,
            message: format!("planning backlog at {pending_planning} open reports"),
        });
    }
    if waiting_collection > 5 {
        insights.push(Insight {
            severity: Severity::Info,
            message: format!("{waiting_collection} finished requests waiting for collection"),
        });
    }
    if cuts_today > 0 {
        insights.push(Insight {
            severity: Severity::Danger,
            message: format!("{cuts_today} requests cut today"),
        });
    }
    if insights.is_empty() {
        insights.push(Insight {
            severity: Severity::Success,
            message: "pipeline clear, no findings".to_string(),
        });
    }
    insights
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
