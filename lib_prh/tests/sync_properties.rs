//! End-to-end behaviour of decompose, sync engine and orchestrator against the
//! in-memory store.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use lib_prh::ingestors::{
    Candidate, FetchError, Fetcher, Orchestrator, Outcome, SkipReason, StaticCandidates,
    SyncEngine, SyncError,
};
use lib_prh::registry::{decompose, AggregateKey, ChildKind, CompanyAggregate, CompanyNumber};
use lib_prh::store::memory::MemoryStore;
use lib_prh::store::{Store, StoreTransaction};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Serves canned documents by business id.
#[derive(Default)]
struct ScriptedFetcher {
    documents: HashMap<&'static str, Value>,
}

impl ScriptedFetcher {
    fn serve(mut self, number: &'static str, document: Value) -> Self {
        self.documents.insert(number, document);
        self
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, number: &CompanyNumber) -> Result<Option<Value>, FetchError> {
        Ok(self.documents.get(number.as_str()).cloned())
    }
}

fn full_document() -> Value {
    json!({
        "businessId": "1234567-8",
        "name": "Acme Oy",
        "registrationDate": "2001-02-03",
        "companyForm": "OY",
        "detailsUri": "https://avoindata.prh.fi/opendata/bis/v1/1234567-8",
        "names": [
            {"order": 0, "version": 0, "name": "Acme Oy", "registrationDate": "2001-02-03", "language": "FI", "source": 1},
            {"order": 1, "version": 1, "name": "Acme Trading Oy", "endDate": "2001-02-02", "language": "FI", "source": 1}
        ],
        "auxiliaryNames": [{"order": 0, "version": 0, "name": "Acme Tools", "source": 1}],
        "addresses": [
            {"careOf": null, "street": "Katu 1", "postCode": "00100", "type": 1, "version": 0, "city": "HELSINKI", "country": "FI", "source": 0},
            {"street": "PL 12", "postCode": "00101", "type": 2, "version": 0, "city": "HELSINKI", "source": 0}
        ],
        "companyForms": [{"version": 0, "name": "Osakeyhtiö", "type": "OY", "language": "FI", "source": 1}],
        "liquidations": [],
        "businessLines": [{"order": 0, "version": 0, "code": 62010, "name": "Ohjelmistojen suunnittelu", "language": "FI", "source": 2}],
        "languages": [{"version": 0, "name": "Suomi", "language": "FI", "source": 0}],
        "registeredOffices": {"order": 0, "version": 0, "name": "HELSINKI", "language": "FI", "source": 0},
        "contactDetails": [{"version": 0, "value": "www.acme.fi", "type": "Kotisivun www-osoite", "language": "FI", "source": 0}],
        "registeredEntries": [
            {"description": "Rekisterissä", "status": 2, "register": 1, "language": "FI", "authority": 2},
            {"description": "Ennakkoperintärekisterissä", "status": 2, "register": 5, "language": "FI", "authority": 1}
        ],
        "businessIdChanges": [],
        "openDataLicence": "CC BY 4.0"
    })
}

/// Child row contents with the per-sync columns removed.
async fn contents(store: &MemoryStore, key: &AggregateKey) -> Vec<(ChildKind, Vec<Value>)> {
    let mut all = Vec::new();
    for kind in ChildKind::ALL {
        let rows = store
            .children(kind, key)
            .await
            .into_iter()
            .map(|child| {
                let mut row = child.row;
                if let Some(map) = row.as_object_mut() {
                    map.remove("pk");
                    map.remove("data_fetched");
                }
                row
            })
            .collect();
        all.push((kind, rows));
    }
    all
}

#[tokio::test]
async fn upsert_is_idempotent() {
    let store = MemoryStore::new();
    let engine = SyncEngine::new(store.clone());
    let key = AggregateKey::from("acme");
    let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let t2 = t1 + Duration::days(1);

    let first = decompose(&key, t1, Some(&full_document())).unwrap();
    engine.upsert(&first).await.unwrap();
    let after_first = contents(&store, &key).await;

    let second = decompose(&key, t2, Some(&full_document())).unwrap();
    engine.upsert(&second).await.unwrap();
    let after_second = contents(&store, &key).await;

    assert_eq!(after_first, after_second);
    assert_eq!(store.company_count().await, 1);
    assert_eq!(store.company(&key).await.unwrap().data_fetched, t2);

    // Every surviving row belongs to the second sync.
    for kind in ChildKind::ALL {
        for child in store.children(kind, &key).await {
            assert_eq!(child.row["data_fetched"], json!(t2));
        }
    }
}

#[tokio::test]
async fn round_trip_example() {
    let raw = json!({
        "businessId": "1234567-8",
        "name": "Acme",
        "names": [{"name": "Acme Oy", "language": "fi", "version": 0}]
    });
    let fetcher = ScriptedFetcher::default().serve("1234567-8", raw);
    let orchestrator = Orchestrator::new(fetcher, SyncEngine::new(MemoryStore::new()));

    let result = orchestrator.sync_single("1234567-8", Some("rt")).await;
    assert_eq!(result.outcome, Outcome::Success);

    let store = orchestrator.engine().store();
    let key = AggregateKey::from("rt");
    let company = store.company(&key).await.unwrap();
    assert_eq!(company.company_number.as_deref(), Some("1234567-8"));

    let names = store.children(ChildKind::Names, &key).await;
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].row["name"], "Acme Oy");
    assert_eq!(names[0].row["version"], "current");
    assert_eq!(names[0].row["language"], "fi");
}

#[tokio::test]
async fn partial_batch_isolation() {
    let store = MemoryStore::new();
    let fetcher = ScriptedFetcher::default()
        .serve("1111111-1", json!({"businessId": "1111111-1", "name": "A", "names": [{"name": "A Oy"}]}))
        .serve("3333333-3", json!({"businessId": "3333333-3", "name": "C", "names": [{"name": "C Oy"}]}));
    let orchestrator = Orchestrator::new(fetcher, SyncEngine::new(store.clone()));

    // C's child inserts fail inside its transaction.
    store.poison(&AggregateKey::from("key-c"));

    let source = StaticCandidates(vec![
        Candidate::new("1111111-1", Some("key-a".into())),
        Candidate::new("2222222-2", Some("key-b".into())),
        Candidate::new("3333333-3", Some("key-c".into())),
    ]);
    let results = orchestrator.run_batch(&source, None).await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].company_number, "1111111-1");
    assert_eq!(results[0].outcome, Outcome::Success);
    assert_eq!(results[1].outcome, Outcome::Skipped(SkipReason::NotFound));
    assert!(matches!(results[2].outcome, Outcome::PersistenceFailure(_)));

    assert!(store.company(&AggregateKey::from("key-a")).await.is_some());
    assert_eq!(store.children(ChildKind::Names, &AggregateKey::from("key-a")).await.len(), 1);
    assert!(store.company(&AggregateKey::from("key-b")).await.is_none());
    assert!(store.company(&AggregateKey::from("key-c")).await.is_none());
}

#[tokio::test]
async fn no_orphans_after_rollback() {
    let store = MemoryStore::new();
    let engine = SyncEngine::new(store.clone());
    let key = AggregateKey::from("acme");

    engine
        .upsert(&decompose(&key, Utc::now(), Some(&full_document())).unwrap())
        .await
        .unwrap();
    let before = contents(&store, &key).await;

    store.poison(&key);
    let err = engine
        .upsert(&decompose(&key, Utc::now(), Some(&full_document())).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Persistence { .. }));

    assert!(store.orphans().await.is_empty());
    assert_eq!(contents(&store, &key).await, before);
}

#[tokio::test]
async fn empty_document_never_overwrites_on_upsert() {
    let store = MemoryStore::new();
    let engine = SyncEngine::new(store.clone());
    let key = AggregateKey::from("acme");
    engine
        .upsert(&decompose(&key, Utc::now(), Some(&full_document())).unwrap())
        .await
        .unwrap();

    let empty = decompose(&key, Utc::now(), None).unwrap();
    assert_eq!(empty, CompanyAggregate::empty(key.clone(), empty.data_fetched()));
    assert!(matches!(engine.upsert(&empty).await, Err(SyncError::NothingToSync { .. })));

    let company = store.company(&key).await.unwrap();
    assert_eq!(company.company_name.as_deref(), Some("Acme Oy"));
    assert_eq!(store.children(ChildKind::Addresses, &key).await.len(), 2);
}

#[tokio::test]
async fn resync_drops_kinds_that_disappeared() {
    let store = MemoryStore::new();
    let engine = SyncEngine::new(store.clone());
    let key = AggregateKey::from("acme");
    engine
        .upsert(&decompose(&key, Utc::now(), Some(&full_document())).unwrap())
        .await
        .unwrap();

    let mut trimmed = full_document();
    if let Some(map) = trimmed.as_object_mut() {
        map.remove("registeredEntries");
        map.insert("addresses".into(), Value::Null);
    }
    engine
        .upsert(&decompose(&key, Utc::now(), Some(&trimmed)).unwrap())
        .await
        .unwrap();

    assert!(store.children(ChildKind::RegisteredEntries, &key).await.is_empty());
    assert!(store.children(ChildKind::Addresses, &key).await.is_empty());
    assert_eq!(store.children(ChildKind::Names, &key).await.len(), 2);
}

#[tokio::test]
async fn translated_labels_reach_the_store() {
    let store = MemoryStore::new();
    let engine = SyncEngine::new(store.clone());
    let key = AggregateKey::from("acme");
    engine
        .insert(&decompose(&key, Utc::now(), Some(&full_document())).unwrap())
        .await
        .unwrap();

    let addresses = store.children(ChildKind::Addresses, &key).await;
    assert_eq!(addresses[0].row["address_type"], "physical_address");
    assert_eq!(addresses[0].row["source"], "common");
    assert_eq!(addresses[1].row["address_type"], "mailing_address");

    let entries = store.children(ChildKind::RegisteredEntries, &key).await;
    assert_eq!(entries[1].row["register"], "prepayment-register");
    assert_eq!(entries[1].row["authority"], "tax-administration");
    assert_eq!(entries[0].row["status"], "registered");

    let lines = store.children(ChildKind::BusinessLines, &key).await;
    assert_eq!(lines[0].row["code"], "62010");
    assert_eq!(lines[0].row["source"], "tax-administration");

    // A single object decomposes to one row.
    assert_eq!(store.children(ChildKind::RegisteredOffices, &key).await.len(), 1);
}

#[tokio::test]
async fn empty_child_entries_store_no_rows() {
    let mut document = full_document();
    if let Some(map) = document.as_object_mut() {
        map.insert("registeredOffices".into(), json!({}));
        map.insert("languages".into(), json!([{}]));
        map.insert("contactDetails".into(), json!([null]));
    }
    let fetcher = ScriptedFetcher::default().serve("1234567-8", document);
    let store = MemoryStore::new();
    let orchestrator = Orchestrator::new(fetcher, SyncEngine::new(store.clone()));

    let result = orchestrator.sync_single("1234567-8", Some("acme")).await;
    assert_eq!(result.outcome, Outcome::Success);

    let key = AggregateKey::from("acme");
    assert!(store.children(ChildKind::RegisteredOffices, &key).await.is_empty());
    assert!(store.children(ChildKind::Languages, &key).await.is_empty());
    assert!(store.children(ChildKind::ContactDetails, &key).await.is_empty());
    assert_eq!(store.children(ChildKind::Names, &key).await.len(), 2);
}

#[tokio::test]
async fn overlapping_transactions_keep_both_companies() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let first = decompose(&AggregateKey::from("key-a"), now, Some(&full_document())).unwrap();
    let second = decompose(&AggregateKey::from("key-b"), now, Some(&full_document())).unwrap();

    let mut tx_a = store.begin().await.unwrap();
    let mut tx_b = store.begin().await.unwrap();
    for (tx, aggregate) in [(&mut tx_a, &first), (&mut tx_b, &second)] {
        tx.insert_company(&aggregate.company).await.unwrap();
        for rows in aggregate.child_rows() {
            tx.insert_children(rows).await.unwrap();
        }
    }
    tx_a.commit().await.unwrap();
    tx_b.commit().await.unwrap();

    assert_eq!(store.company_count().await, 2);
    for kind in ChildKind::ALL {
        let expected = first
            .child_rows()
            .iter()
            .find(|rows| rows.kind() == kind)
            .map_or(0, |rows| rows.len());
        assert_eq!(store.children(kind, first.key()).await.len(), expected);
        assert_eq!(store.children(kind, second.key()).await.len(), expected);
    }
    assert!(store.orphans().await.is_empty());
}
