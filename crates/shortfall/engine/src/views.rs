//! Role-scoped projections of the request collection.
//!
//! Everything here is a pure function over the canonical collection and
//! recomputed per read. Screens get their available actions from the
//! transition table, never from per-view lists.

use serde::Serialize;
use shortfall_types::{RequestStatus, Role, ShortageRequest};

use crate::transitions::{events_from, EventKind};

// ── Queue projections ────────────────────────────────────────────────

/// Planning queue: fresh reports, most critical first. The sort is
/// stable, so ties keep their arrival order.
pub fn planning_queue(requests: &[ShortageRequest]) -> Vec<&ShortageRequest> {
    let mut queue: Vec<&ShortageRequest> = requests
        .iter()
        .filter(|request| request.status == RequestStatus::PendingPcp)
        .collect();
    queue.sort_by_key(|request| request.criticality.rank());
    queue
}

/// Customer Service queue: scheduled requests waiting for a verdict
pub fn customer_service_queue(requests: &[ShortageRequest]) -> Vec<&ShortageRequest> {
    requests
        .iter()
        .filter(|request| request.status == RequestStatus::PendingCs)
        .collect()
}

/// The production screen: what waits for the line and what is on it
#[derive(Debug)]
pub struct ProductionBoard<'a> {
    pub queue: Vec<&'a ShortageRequest>,
    pub active: Vec<&'a ShortageRequest>,
}

pub fn production_board(requests: &[ShortageRequest]) -> ProductionBoard<'_> {
    ProductionBoard {
        queue: requests
            .iter()
            .filter(|request| request.status == RequestStatus::WaitingProduction)
            .collect(),
        active: requests
            .iter()
            .filter(|request| request.status == RequestStatus::Producing)
            .collect(),
    }
}

/// Everything logistics still tracks. A request leaves this view only
/// once it is collected; a cut request stays visible as the record of
/// the write-off.
pub fn logistics_in_flight(requests: &[ShortageRequest]) -> Vec<&ShortageRequest> {
    requests
        .iter()
        .filter(|request| request.status != RequestStatus::Collected)
        .collect()
}

/// Case-insensitive match against code, description, and load number.
/// A blank query matches everything.
pub fn matches_search(request: &ShortageRequest, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    let hit = |field: &str| field.to_lowercase().contains(&query);
    hit(&request.code)
        || hit(&request.description)
        || request
            .load_number
            .as_deref()
            .map_or(false, |load_number| hit(load_number))
}

// ── Role views ───────────────────────────────────────────────────────

/// One request as a screen shows it: the record plus the events legal
/// from its status
#[derive(Debug, Clone, Serialize)]
pub struct ViewItem {
    #[serde(flatten)]
    pub request: ShortageRequest,
    pub intents: Vec<EventKind>,
}

impl ViewItem {
    pub fn new(request: &ShortageRequest) -> Self {
        Self {
            intents: events_from(request.status),
            request: request.clone(),
        }
    }
}

/// A titled block of a role screen
#[derive(Debug, Clone, Serialize)]
pub struct ViewSection {
    pub title: &'static str,
    pub items: Vec<ViewItem>,
}

/// The full screen for one role
#[derive(Debug, Clone, Serialize)]
pub struct RoleView {
    pub role: Role,
    pub sections: Vec<ViewSection>,
}

type SectionBuilder = fn(&[ShortageRequest]) -> Vec<ViewSection>;

fn section(title: &'static str, requests: Vec<&ShortageRequest>) -> ViewSection {
    ViewSection {
        title,
        items: requests.into_iter().map(ViewItem::new).collect(),
    }
}

fn planning_sections(requests: &[ShortageRequest]) -> Vec<ViewSection> {
    vec![section("pending_planning", planning_queue(requests))]
}

fn customer_service_sections(requests: &[ShortageRequest]) -> Vec<ViewSection> {
    vec![section("pending_decision", customer_service_queue(requests))]
}

fn production_sections(requests: &[ShortageRequest]) -> Vec<ViewSection> {
    let board = production_board(requests);
    vec![
        section("queue", board.queue),
        section("producing", board.active),
    ]
}

fn logistics_sections(requests: &[ShortageRequest]) -> Vec<ViewSection> {
    vec![section("in_flight", logistics_in_flight(requests))]
}

fn dashboard_sections(requests: &[ShortageRequest]) -> Vec<ViewSection> {
    vec![section("all", requests.iter().collect())]
}

/// Role to screen, as data
const VIEW_TABLE: &[(Role, SectionBuilder)] = &[
    (Role::Planning, planning_sections),
    (Role::CustomerService, customer_service_sections),
    (Role::Production, production_sections),
    (Role::Logistics, logistics_sections),
    (Role::Admin, dashboard_sections),
];

/// Build the screen for a role from the canonical collection. Roles
/// without a dedicated screen fall back to the dashboard.
pub fn view_for(role: Role, requests: &[ShortageRequest]) -> RoleView {
    let builder = VIEW_TABLE
        .iter()
        .find(|(candidate, _)| *candidate == role)
        .map(|(_, builder)| *builder)
        .unwrap_or(dashboard_sections as SectionBuilder);
    RoleView {
        role,
        sections: builder(requests),
    }
}
