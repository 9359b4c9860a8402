use std::sync::Arc;
use std::time::Duration;

use appshelf_core::model::ApplicationRecord;
use appshelf_core::query_engine::{QueryEngine, ResultList};
use tokio::sync::watch;
use tokio::time::timeout;

fn snapshot() -> Arc<Vec<ApplicationRecord>> {
    Arc::new(vec![
        ApplicationRecord::new("cam", "Camera").with_usage(5, None),
        ApplicationRecord::new("calc", "Calculator").with_usage(1, None),
        ApplicationRecord::new("cal", "Calendar").favorite(),
        ApplicationRecord::new("maps", "Maps"),
    ])
}

fn ids(list: &ResultList) -> Vec<String> {
    list.iter().map(|record| record.id.clone()).collect()
}

async fn wait_for_ids(rx: &mut watch::Receiver<ResultList>, expected: &[&str]) {
    let expected: Vec<String> = expected.iter().map(|id| id.to_string()).collect();
    timeout(Duration::from_secs(2), rx.wait_for(|list| ids(list) == expected))
        .await
        .expect("timed out waiting for results")
        .expect("engine dropped");
}

#[tokio::test]
async fn snapshot_change_publishes_ranked_results() {
    let engine = QueryEngine::new(Duration::from_millis(5));
    let mut rx = engine.subscribe();

    engine.set_snapshot(snapshot());

    wait_for_ids(&mut rx, &["cal", "cam", "calc", "maps"]).await;
}

#[tokio::test]
async fn late_subscribers_see_the_last_result() {
    let engine = QueryEngine::new(Duration::from_millis(5));
    let mut first = engine.subscribe();
    engine.set_snapshot(snapshot());
    wait_for_ids(&mut first, &["cal", "cam", "calc", "maps"]).await;

    let late = engine.subscribe();
    assert_eq!(ids(&late.borrow()), vec!["cal", "cam", "calc", "maps"]);
}

#[tokio::test]
async fn rapid_queries_publish_only_the_last_one() {
    let engine = QueryEngine::new(Duration::from_millis(30));
    let mut rx = engine.subscribe();
    engine.set_snapshot(snapshot());
    wait_for_ids(&mut rx, &["cal", "cam", "calc", "maps"]).await;
    let _ = rx.borrow_and_update();

    for query in ["m", "ma", "map"] {
        engine.set_query(query);
    }

    timeout(Duration::from_secs(2), rx.changed())
        .await
        .expect("timed out")
        .unwrap();
    assert_eq!(ids(&rx.borrow_and_update()), vec!["maps"]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!rx.has_changed().unwrap(), "superseded query was published");
}

#[tokio::test]
async fn newer_snapshot_wins_over_pending_query() {
    let engine = QueryEngine::new(Duration::from_millis(50));
    let mut rx = engine.subscribe();

    engine.set_query("ca");
    engine.set_snapshot(Arc::new(vec![ApplicationRecord::new("cab", "Cab Booking")]));

    wait_for_ids(&mut rx, &["cab"]).await;
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(ids(&rx.borrow()), vec!["cab"]);
}

#[tokio::test]
async fn evaluate_ranks_without_publishing() {
    let engine = QueryEngine::new(Duration::from_millis(5));
    engine.set_snapshot(snapshot());
    engine.set_query("cal");

    let ranked = engine.evaluate();

    let ranked_ids: Vec<&str> = ranked.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ranked_ids, vec!["cal", "calc"]);
}
