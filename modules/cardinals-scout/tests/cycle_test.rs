//! Multi-day runs of the weekly cycle against mock collaborators.

use std::sync::Arc;

use chrono::NaiveDate;

use cardinals_common::{Category, CuratedItem};
use cardinals_scout::cycle::{CycleController, CyclePhase, Envelope, SendOutcome};
use cardinals_scout::harvest::Pacer;
use cardinals_scout::notify::DigestTransport;
use cardinals_scout::testing::{result, test_config, MockSearcher, RecordingTransport};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

fn envelope() -> Envelope {
    Envelope {
        from: "news@cardinals.org".to_string(),
        to: vec!["a@x.org".to_string(), "b@y.org".to_string()],
    }
}

fn controller(
    dir: &std::path::Path,
    searcher: MockSearcher,
    transport: Arc<RecordingTransport>,
) -> CycleController {
    let mut config = test_config();
    config.output.data_dir = dir.to_path_buf();
    config.output.keep_recent_reports = 1;
    CycleController::new(
        config,
        Arc::new(searcher),
        Some(transport as Arc<dyn DigestTransport>),
        Some(envelope()),
    )
    .with_pacer(Pacer::none())
}

fn grants(day_results: &[(&str, &str)]) -> MockSearcher {
    MockSearcher::new().on_search(
        "resilience grant",
        day_results
            .iter()
            .map(|(title, url)| result(title, url, "Climate adaptation funding"))
            .collect(),
    )
}

#[tokio::test]
async fn week_accumulates_then_resets_after_send() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(RecordingTransport::new());

    // Friday
    let friday = controller(
        dir.path(),
        grants(&[("Flood Grant", "https://a.org/1"), ("Heat Grant", "https://b.org/1")]),
        transport.clone(),
    )
    .run(day(16))
    .await
    .unwrap();
    assert_eq!(friday.send, SendOutcome::NotSendDay);
    assert_eq!(friday.totals.grants, 2);

    // Saturday: one repeat, one new
    let saturday = controller(
        dir.path(),
        grants(&[("Flood Grant", "https://a.org/1"), ("Wildfire Grant", "https://c.org/1")]),
        transport.clone(),
    )
    .run(day(17))
    .await
    .unwrap();
    assert_eq!(saturday.harvested.grants, 1);
    assert_eq!(saturday.totals.grants, 3);

    // Monday: the whole week goes out
    let monday = controller(dir.path(), grants(&[]), transport.clone())
        .run(day(19))
        .await
        .unwrap();
    assert_eq!(monday.phase, CyclePhase::Sent);
    assert_eq!(monday.totals.grants, 3);

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to.len(), 2);
    for title in ["Flood Grant", "Heat Grant", "Wildfire Grant"] {
        assert!(sent[0].html.contains(title), "{title} missing from digest");
    }
    assert!(!dir.path().join(Category::Grants.file_name()).exists());
}

#[tokio::test]
async fn failed_send_is_retried_on_a_later_send_day() {
    let dir = tempfile::tempdir().unwrap();

    let failed = controller(
        dir.path(),
        grants(&[("Flood Grant", "https://a.org/1")]),
        Arc::new(RecordingTransport::failing()),
    )
    .run(day(19))
    .await
    .unwrap();
    assert_eq!(failed.send, SendOutcome::Failed);
    assert_eq!(failed.phase, CyclePhase::AwaitingSendWindow);

    let transport = Arc::new(RecordingTransport::new());
    let retried = controller(dir.path(), grants(&[]), transport.clone())
        .run(day(26))
        .await
        .unwrap();
    assert_eq!(retried.send, SendOutcome::Sent);
    assert!(transport.sent()[0].html.contains("Flood Grant"));
}

#[tokio::test]
async fn stored_rows_survive_a_same_day_rerun() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(RecordingTransport::new());
    let c = controller(
        dir.path(),
        grants(&[("Flood Grant", "https://a.org/1")]),
        transport.clone(),
    );
    c.run(day(16)).await.unwrap();
    let again = c.run(day(16)).await.unwrap();
    assert_eq!(again.phase, CyclePhase::Idle);

    let rows: Vec<CuratedItem> = c.store().read_category(Category::Grants);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].organization, "a.org");
    assert_eq!(rows[0].date_info, "none found");
}
