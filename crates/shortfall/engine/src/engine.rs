//! The workflow engine: the only writer of request state.
//!
//! Every mutation goes store-first. A change is visible to callers and
//! views only after the backend acknowledged the write, so a crashed
//! write never leaves the in-memory picture ahead of the stored one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shortfall_storage::ShortfallStorage;
use shortfall_types::{
    AuditEntry, Criticality, RequestId, ShortageRequest, ShortfallError, ShortfallResult, User,
};
use tracing::{info, warn};

use crate::transitions::{rule_for, RequestEvent};

/// A new shortage, as reported from the logistics floor
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShortageReport {
    /// Product code, must exist in the product master
    pub code: String,
    /// Units short. Kept wide here so a non-positive payload fails with
    /// a domain error instead of a decode error.
    pub quantity: i64,
    pub criticality: Criticality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_number: Option<String>,
}

/// Drives shortage requests along the transition table
pub struct WorkflowEngine {
    store: Arc<dyn ShortfallStorage>,
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn ShortfallStorage>) -> Self {
        Self { store }
    }

    /// Open a new request from a floor report.
    ///
    /// The product master supplies the description and the unit weight;
    /// an unknown code rejects the report before anything is stored.
    pub async fn report(
        &self,
        report: ShortageReport,
        actor: &User,
    ) -> ShortfallResult<ShortageRequest> {
        let ShortageReport {
            code,
            quantity,
            criticality,
            load_number,
        } = report;

        let quantity = match u32::try_from(quantity) {
            Ok(quantity) if quantity > 0 => quantity,
            _ => {
                return Err(ShortfallError::InvalidInput(
                    "quantity must be a positive integer".to_string(),
                ))
            }
        };

        let products = self.store.list_products().await?;
        let product = products
            .iter()
            .find(|product| product.code == code)
            .ok_or_else(|| ShortfallError::UnknownProduct(code.clone()))?;

        let mut request = ShortageRequest::open(
            code,
            product.description.clone(),
            quantity,
            product.total_weight(quantity),
            criticality,
            AuditEntry::now(actor.name.clone()),
        );
        if let Some(load_number) = load_number {
            request = request.with_load_number(load_number);
        }

        self.store.put_request(request.clone()).await?;
        info!(
            request_id = %request.id,
            code = %request.code,
            status = %request.status,
            "shortage reported"
        );
        Ok(request)
    }

    /// Apply one event to a request.
    ///
    /// The stored record only changes when the whole move succeeds; a
    /// rejected event leaves it exactly as it was.
    pub async fn transition(
        &self,
        id: &RequestId,
        event: RequestEvent,
        actor: &User,
    ) -> ShortfallResult<ShortageRequest> {
        let current = self.get(id).await?;

        let rule = match rule_for(current.status, event.kind()) {
            Some(rule) => rule,
            None => {
                warn!(
                    request_id = %id,
                    event = %event.name(),
                    status = %current.status,
                    "transition rejected"
                );
                return Err(ShortfallError::InvalidTransition {
                    from: current.status,
                    event: event.name().to_string(),
                });
            }
        };

        if !actor.has_role(rule.actor) {
            warn!(
                request_id = %id,
                event = %event.name(),
                expected_role = %rule.actor,
                user = %actor.username,
                "actor outside the role that normally drives this edge"
            );
        }

        let mut next = current;
        if let RequestEvent::Approve { eta, directive } = &event {
            if directive.trim().is_empty() {
                return Err(ShortfallError::InvalidInput(
                    "directive must not be empty".to_string(),
                ));
            }
            next.eta = Some(*eta);
            next.directive = Some(directive.clone());
        }
        next.status = rule.to;
        if let Some(milestone) = rule.milestone {
            next.timestamps
                .record(milestone, AuditEntry::now(actor.name.clone()))?;
        }

        self.store.put_request(next.clone()).await?;
        info!(
            request_id = %next.id,
            event = %event.name(),
            status = %next.status,
            "transition applied"
        );
        Ok(next)
    }

    /// Fetch one request by id
    pub async fn get(&self, id: &RequestId) -> ShortfallResult<ShortageRequest> {
        let requests = self.store.list_requests().await?;
        requests
            .into_iter()
            .find(|request| request.id == *id)
            .ok_or_else(|| ShortfallError::NotFound(format!("request '{id}' not found")))
    }

    /// Every request in canonical order: oldest report first, id as the
    /// tie-break so equal timestamps stay deterministic
    pub async fn collection(&self) -> ShortfallResult<Vec<ShortageRequest>> {
        let mut requests = self.store.list_requests().await?;
        requests.sort_by(|a, b| {
            a.timestamps
                .reported
                .date
                .cmp(&b.timestamps.reported.date)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transitions::{Decision, EventKind};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use shortfall_storage::memory::InMemoryShortfallStorage;
    use shortfall_storage::{ProductStore, RequestStore};
    use shortfall_types::{Product, RequestStatus, Role};

    fn ana() -> User {
        User::new("U100", "ana", "pw", "Ana Ferreira").with_role(Role::Logistics)
    }

    fn paulo() -> User {
        User::new("U101", "paulo", "pw", "Paulo Reis").with_role(Role::Planning)
    }

    fn marta() -> User {
        User::new("U102", "marta", "pw", "Marta Lima").with_role(Role::CustomerService)
    }

    fn jorge() -> User {
        User::new("U103", "jorge", "pw", "Jorge Dias").with_role(Role::Production)
    }

    fn sample_report(quantity: i64) -> ShortageReport {
        ShortageReport {
            code: "PA-250".to_string(),
            quantity,
            criticality: Criticality::Medium,
            load_number: Some("L-2209".to_string()),
        }
    }

    fn approve_event() -> RequestEvent {
        RequestEvent::Approve {
            eta: Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap(),
            directive: "run on line 2".to_string(),
        }
    }

    async fn setup() -> (WorkflowEngine, Arc<InMemoryShortfallStorage>) {
        let store = Arc::new(InMemoryShortfallStorage::new());
        store
            .put_product(Product::new("PA-250", "Gear housing", 0.250))
            .await
            .unwrap();
        (WorkflowEngine::new(store.clone()), store)
    }

    #[tokio::test]
    async fn report_derives_weight_and_description_from_master() {
        let (engine, _store) = setup().await;

        let request = engine.report(sample_report(3), &ana()).await.unwrap();

        assert_eq!(request.status, RequestStatus::PendingPcp);
        assert_eq!(request.description, "Gear housing");
        assert_eq!(request.quantity, 3);
        assert_eq!(request.total_weight, 0.750);
        assert_eq!(request.load_number.as_deref(), Some("L-2209"));
        assert_eq!(request.timestamps.reported.user, "Ana Ferreira");
        assert!(request.trail_is_consistent());
    }

    #[tokio::test]
    async fn report_unknown_product_stores_nothing() {
        let (engine, store) = setup().await;

        let result = engine
            .report(
                ShortageReport {
                    code: "PA-999".to_string(),
                    quantity: 1,
                    criticality: Criticality::Low,
                    load_number: None,
                },
                &ana(),
            )
            .await;

        assert!(matches!(result, Err(ShortfallError::UnknownProduct(code)) if code == "PA-999"));
        assert!(store.list_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn report_rejects_non_positive_quantities() {
        let (engine, store) = setup().await;

        for quantity in [0, -2] {
            let result = engine.report(sample_report(quantity), &ana()).await;
            assert!(matches!(result, Err(ShortfallError::InvalidInput(_))));
        }
        assert!(store.list_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_pipeline_reaches_collected() {
        let (engine, _store) = setup().await;
        let id = engine.report(sample_report(3), &ana()).await.unwrap().id;

        let approved = engine.transition(&id, approve_event(), &paulo()).await.unwrap();
        assert_eq!(approved.status, RequestStatus::PendingCs);
        assert_eq!(approved.timestamps.requested_by_pcp.as_ref().unwrap().user, "Paulo Reis");

        let queued = engine
            .transition(&id, RequestEvent::Decide(Decision::Produce), &marta())
            .await
            .unwrap();
        assert_eq!(queued.status, RequestStatus::WaitingProduction);
        assert_eq!(queued.timestamps.cs_decision.as_ref().unwrap().user, "Marta Lima");

        let producing = engine
            .transition(&id, RequestEvent::Start, &jorge())
            .await
            .unwrap();
        assert_eq!(producing.status, RequestStatus::Producing);
        // Start leaves the trail alone.
        assert_eq!(producing.timestamps.stamp_count(), 3);
        assert!(producing.trail_is_consistent());

        let finished = engine
            .transition(&id, RequestEvent::Finish, &jorge())
            .await
            .unwrap();
        assert_eq!(finished.status, RequestStatus::WaitingLogistics);
        assert_eq!(
            finished.timestamps.finished_production.as_ref().unwrap().user,
            "Jorge Dias"
        );

        let collected = engine
            .transition(&id, RequestEvent::Collect, &ana())
            .await
            .unwrap();
        assert_eq!(collected.status, RequestStatus::Collected);
        assert!(collected.is_terminal());
        assert_eq!(collected.timestamps.stamp_count(), 5);
        assert!(collected.trail_is_consistent());
    }

    #[tokio::test]
    async fn cut_path_terminates_the_request() {
        let (engine, _store) = setup().await;
        let id = engine.report(sample_report(3), &ana()).await.unwrap().id;

        engine.transition(&id, approve_event(), &paulo()).await.unwrap();
        let cut = engine
            .transition(&id, RequestEvent::Decide(Decision::Cut), &marta())
            .await
            .unwrap();

        assert_eq!(cut.status, RequestStatus::CancelledCs);
        assert!(cut.is_terminal());
        assert!(cut.trail_is_consistent());

        let after = engine.transition(&id, RequestEvent::Start, &jorge()).await;
        assert!(matches!(
            after,
            Err(ShortfallError::InvalidTransition { from: RequestStatus::CancelledCs, .. })
        ));
    }

    #[tokio::test]
    async fn rejected_event_leaves_stored_record_unchanged() {
        let (engine, _store) = setup().await;
        let reported = engine.report(sample_report(3), &ana()).await.unwrap();

        let result = engine
            .transition(&reported.id, RequestEvent::Collect, &ana())
            .await;
        assert!(matches!(
            result,
            Err(ShortfallError::InvalidTransition { from: RequestStatus::PendingPcp, .. })
        ));

        let stored = engine.get(&reported.id).await.unwrap();
        assert_eq!(stored, reported);
    }

    #[tokio::test]
    async fn approve_sets_schedule_and_keeps_report_stamp() {
        let (engine, _store) = setup().await;
        let reported = engine.report(sample_report(3), &ana()).await.unwrap();

        let approved = engine
            .transition(&reported.id, approve_event(), &paulo())
            .await
            .unwrap();

        assert_eq!(
            approved.eta,
            Some(Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap())
        );
        assert_eq!(approved.directive.as_deref(), Some("run on line 2"));
        assert_eq!(approved.timestamps.reported, reported.timestamps.reported);
    }

    #[tokio::test]
    async fn approve_requires_a_directive() {
        let (engine, _store) = setup().await;
        let reported = engine.report(sample_report(3), &ana()).await.unwrap();

        let result = engine
            .transition(
                &reported.id,
                RequestEvent::Approve {
                    eta: Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap(),
                    directive: "   ".to_string(),
                },
                &paulo(),
            )
            .await;

        assert!(matches!(result, Err(ShortfallError::InvalidInput(_))));
        let stored = engine.get(&reported.id).await.unwrap();
        assert_eq!(stored, reported);
    }

    #[tokio::test]
    async fn approve_cannot_be_replayed() {
        let (engine, _store) = setup().await;
        let id = engine.report(sample_report(3), &ana()).await.unwrap().id;

        engine.transition(&id, approve_event(), &paulo()).await.unwrap();
        let replay = engine.transition(&id, approve_event(), &paulo()).await;

        assert!(matches!(
            replay,
            Err(ShortfallError::InvalidTransition { from: RequestStatus::PendingCs, .. })
        ));
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let (engine, _store) = setup().await;
        let result = engine
            .transition(&RequestId::new("REQ-missing"), RequestEvent::Start, &jorge())
            .await;
        assert!(matches!(result, Err(ShortfallError::NotFound(_))));
    }

    #[tokio::test]
    async fn collection_orders_by_report_time_then_id() {
        let (engine, store) = setup().await;
        let day = |d: u32| Utc.with_ymd_and_hms(2026, 3, d, 8, 0, 0).unwrap();

        for (id, reported_on) in [("REQ-b", day(2)), ("REQ-a", day(2)), ("REQ-c", day(1))] {
            let mut request = ShortageRequest::open(
                "PA-250",
                "Gear housing",
                1,
                0.250,
                Criticality::Low,
                AuditEntry::new(reported_on, "Ana Ferreira"),
            );
            request.id = RequestId::new(id);
            store.put_request(request).await.unwrap();
        }

        let ordered: Vec<String> = engine
            .collection()
            .await
            .unwrap()
            .into_iter()
            .map(|request| request.id.0)
            .collect();
        assert_eq!(ordered, vec!["REQ-c", "REQ-a", "REQ-b"]);
    }

    // ── Property coverage ────────────────────────────────────────────

    fn event_strategy() -> impl Strategy<Value = Vec<RequestEvent>> {
        let eta = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        proptest::collection::vec(
            prop_oneof![
                Just(RequestEvent::Approve {
                    eta,
                    directive: "run batch".to_string(),
                }),
                Just(RequestEvent::Decide(Decision::Produce)),
                Just(RequestEvent::Decide(Decision::Cut)),
                Just(RequestEvent::Start),
                Just(RequestEvent::Finish),
                Just(RequestEvent::Collect),
            ],
            0..12,
        )
    }

    proptest! {
        #[test]
        fn property_random_events_never_break_the_trail(events in event_strategy()) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");

            rt.block_on(async move {
                let (engine, _store) = setup().await;
                let id = engine
                    .report(sample_report(3), &ana())
                    .await
                    .expect("report")
                    .id;
                let driver = paulo()
                    .with_role(Role::CustomerService)
                    .with_role(Role::Production)
                    .with_role(Role::Logistics);

                let mut accepted = Vec::new();
                for event in events {
                    let kind = event.kind();
                    let before = engine.get(&id).await.expect("get before");
                    match engine.transition(&id, event, &driver).await {
                        Ok(after) => {
                            assert!(after.trail_is_consistent());
                            accepted.push(kind);
                        }
                        Err(_) => {
                            let untouched = engine.get(&id).await.expect("get after");
                            assert_eq!(untouched, before);
                        }
                    }
                }

                // Whatever the shuffle, a terminal request can only have
                // been reached by its exact edge sequence.
                let final_state = engine.get(&id).await.expect("final");
                assert!(final_state.trail_is_consistent());
                match final_state.status {
                    RequestStatus::Collected => {
                        let expected = vec![
                            EventKind::Approve,
                            EventKind::DecideProduce,
                            EventKind::Start,
                            EventKind::Finish,
                            EventKind::Collect,
                        ];
                        assert_eq!(accepted, expected);
                    }
                    RequestStatus::CancelledCs => {
                        assert_eq!(accepted, vec![EventKind::Approve, EventKind::DecideCut]);
                    }
                    _ => {}
                }
            });
        }
    }
}
