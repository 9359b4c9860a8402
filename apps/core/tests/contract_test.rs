use appshelf_core::contract::{
    to_dtos, AppIdRequest, CoreRequest, CoreResponse, MostUsedRequest, RefreshResponse,
    SearchRequest, StatusDto,
};
use appshelf_core::core_service::{CatalogStatus, RefreshOutcome};
use appshelf_core::model::ApplicationRecord;
use appshelf_core::reconcile::ReconcileReport;

#[test]
fn requests_use_kind_and_payload_tags() {
    let request = CoreRequest::Search(SearchRequest {
        query: "cal".to_string(),
    });
    let encoded = serde_json::to_value(&request).unwrap();
    assert_eq!(encoded, serde_json::json!({"kind": "search", "payload": {"query": "cal"}}));

    let toggle: CoreRequest = serde_json::from_str(
        r#"{"kind":"toggle_favorite","payload":{"id":"org.example.maps"}}"#,
    )
    .unwrap();
    assert_eq!(
        toggle,
        CoreRequest::ToggleFavorite(AppIdRequest {
            id: "org.example.maps".into()
        })
    );
}

#[test]
fn unit_requests_need_no_payload() {
    let refresh: CoreRequest = serde_json::from_str(r#"{"kind":"refresh"}"#).unwrap();
    assert_eq!(refresh, CoreRequest::Refresh);

    let most_used: CoreRequest =
        serde_json::from_str(r#"{"kind":"most_used","payload":{"limit":null}}"#).unwrap();
    assert_eq!(most_used, CoreRequest::MostUsed(MostUsedRequest { limit: None }));
}

#[test]
fn application_dto_carries_score_only_when_ranked() {
    let mut record = ApplicationRecord::new("org.example.camera", "Camera").with_usage(3, Some(1_700_000_000));
    let unranked = serde_json::to_value(&to_dtos(std::slice::from_ref(&record))[0]).unwrap();
    assert!(unranked.get("score").is_none());
    assert_eq!(unranked["launch_count"], 3);
    assert_eq!(unranked["category"], "other");

    record.transient_score = Some(1.0);
    let ranked = serde_json::to_value(&to_dtos(&[record])[0]).unwrap();
    assert_eq!(ranked["score"], 1.0);
}

#[test]
fn refresh_outcomes_map_to_responses() {
    let report = ReconcileReport {
        inserted: 2,
        updated: 5,
        removed: 1,
    };
    let reconciled: RefreshResponse = RefreshOutcome::Reconciled(report).into();
    assert_eq!(reconciled.outcome, "reconciled");
    assert_eq!(reconciled.removed, 1);

    let joined: RefreshResponse = RefreshOutcome::Joined.into();
    assert_eq!(joined.outcome, "joined");
    assert_eq!(joined.inserted, 0);

    let encoded = serde_json::to_string(&CoreResponse::Refresh(reconciled)).unwrap();
    assert!(matches!(
        serde_json::from_str::<CoreResponse>(&encoded).unwrap(),
        CoreResponse::Refresh(_)
    ));
}

#[test]
fn status_serializes_snake_case() {
    let status: StatusDto = CatalogStatus::NoApplicationsFound.into();
    assert_eq!(serde_json::to_string(&status).unwrap(), r#""no_applications_found""#);
}
