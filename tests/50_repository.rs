mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use repairdesk_api::app::{router, AppState};
use repairdesk_api::auth::TokenVerifier;
use repairdesk_api::database::{CaseRepository, PgCaseStore};
use repairdesk_api::sync::{SyncEngine, SyncTracker};

use common::{get, insurance_case, walk_in_case, FakePartner, LiveDatabase, StaticVerifier, USER_TOKEN};

fn case_ids(body: &Value) -> Vec<String> {
    body["cases"]
        .as_array()
        .map(|cases| cases.iter().filter_map(|c| c["caseId"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn excluded_insurer_case(case_id: i64) -> Value {
    let mut payload = insurance_case(case_id);
    payload["Insurance"]["Name"] = json!("Wertgarantie");
    payload
}

#[tokio::test]
async fn case_queries_against_postgres() -> Result<()> {
    let Some(db) = LiveDatabase::connect().await? else {
        eprintln!("DATABASE_URL not set, skipping");
        return Ok(());
    };
    let config = db.config();
    let store = Arc::new(PgCaseStore::new(db.pool.clone()));
    let tracker = Arc::new(SyncTracker::new());

    let first = Arc::new(FakePartner::with_cases(vec![
        (101, insurance_case(101)),
        (102, insurance_case(102)),
        (103, insurance_case(103)),
        (104, walk_in_case(104)),
        (105, excluded_insurer_case(105)),
    ]));
    let stats = {
        let guard = tracker.try_begin().expect("slot is free");
        SyncEngine::new(first.clone(), store.clone(), config.sync.clone()).run_full(&guard).await?
    };
    assert_eq!(stats.upserted, 4);
    assert_eq!(stats.skipped_not_insurance, 1);

    tokio::time::sleep(Duration::from_millis(10)).await;

    // 101 changes, 102 stays, the rest drop out of the listing
    let mut changed = insurance_case(101);
    changed["CaseNumber"] = json!("RL-101-B");
    let second = Arc::new(FakePartner::with_cases(vec![(101, changed), (102, insurance_case(102))]));
    let stats = {
        let guard = tracker.try_begin().expect("slot is free after first run");
        SyncEngine::new(second.clone(), store.clone(), config.sync.clone()).run_full(&guard).await?
    };
    assert_eq!(stats.upserted, 1);
    assert_eq!(stats.skipped_no_change, 1);

    let absent = CaseRepository::new(db.pool.clone()).select_absent_cases().await?;
    let absent_ids: Vec<Value> = absent.iter().map(|row| row["case_id"].clone()).collect();
    assert_eq!(absent_ids, vec![json!(103), json!(105)]);

    let verifier: Arc<dyn TokenVerifier> = Arc::new(StaticVerifier::new());
    let state = AppState::new(config, db.pool.clone(), Some(verifier), None, second, store);
    let app = router(state);

    let page = get(&app, "/routes/cases?limit=2&sortBy=caseId&sortDirection=asc", Some(USER_TOKEN)).await?;
    assert_eq!(page.status, StatusCode::OK);
    let body = page.json()?;
    assert_eq!(case_ids(&body), vec!["101", "102"]);
    assert_eq!(body["total_count"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["total_pages"], 2);

    let body = get(&app, "/routes/cases?limit=2&page=2&sortBy=caseId&sortDirection=asc", Some(USER_TOKEN))
        .await?
        .json()?;
    assert_eq!(case_ids(&body), vec!["103"]);

    let body = get(&app, "/routes/cases?sortBy=caseNumber&sortDirection=desc", Some(USER_TOKEN)).await?.json()?;
    assert_eq!(case_ids(&body), vec!["103", "102", "101"]);

    // unknown sort keys fall back to the newest update first
    let body = get(&app, "/routes/cases?sortBy=rawApiDetail", Some(USER_TOKEN)).await?.json()?;
    assert_eq!(case_ids(&body).first().map(String::as_str), Some("101"));

    let body = get(&app, "/routes/cases?timeRangeMonths=6&search=ERIKA", Some(USER_TOKEN)).await?.json()?;
    assert_eq!(body["total_count"], 3);

    let body = get(&app, "/routes/cases?insuranceName=Wertgarantie", Some(USER_TOKEN)).await?.json()?;
    assert_eq!(body["total_count"], 0);

    let body = get(&app, "/routes/cases?page=922337203685477580&limit=50", Some(USER_TOKEN)).await?.json()?;
    assert_eq!(body["total_count"], 3);
    assert_eq!(body["cases"], json!([]));

    let res = get(&app, "/routes/repair-case/101", Some(USER_TOKEN)).await?;
    assert_eq!(res.status, StatusCode::OK);
    let case = res.json()?;
    assert_eq!(case["caseId"], "101");
    assert_eq!(case["caseNumber"], "RL-101-B");
    assert_eq!(case["customerName"], "Erika Mustermann");
    assert_eq!(case["rawApiDetail"]["CaseNumber"], "RL-101-B");

    let res = get(&app, "/routes/repair-case/999", Some(USER_TOKEN)).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json()?["detail"], "Repair case not found");

    db.drop_schema().await
}
