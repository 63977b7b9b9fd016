use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use docfacade::{backend::DocumentStream, bson, memory::InMemoryStore, prelude::*};
use futures::{StreamExt, TryStreamExt, stream};
use serde_json::json;

fn set(field: &str, value: impl Into<Value>) -> Document {
    Document::new().with("$set", Document::new().with(field, value))
}

fn item(name: &str) -> Document {
    Document::new().with("item", name)
}

fn store() -> DocumentStore<InMemoryStore> {
    DocumentStore::new(InMemoryStore::new())
}

/// Counts every call that reaches the store.
#[derive(Debug, Default)]
struct RecordingBackend {
    inner: InMemoryStore,
    calls: AtomicUsize,
}

impl RecordingBackend {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StoreBackend for RecordingBackend {
    async fn insert_one(&self, namespace: &Namespace, document: bson::Document) -> DocumentStoreResult<DocumentId> {
        self.record();
        self.inner.insert_one(namespace, document).await
    }

    async fn find_one_and_update(
        &self,
        namespace: &Namespace,
        filter: bson::Document,
        update: bson::Document,
    ) -> DocumentStoreResult<Option<bson::Document>> {
        self.record();
        self.inner.find_one_and_update(namespace, filter, update).await
    }

    async fn find_one_and_delete(
        &self,
        namespace: &Namespace,
        filter: bson::Document,
    ) -> DocumentStoreResult<Option<bson::Document>> {
        self.record();
        self.inner.find_one_and_delete(namespace, filter).await
    }

    async fn find(&self, namespace: &Namespace, filter: bson::Document) -> DocumentStoreResult<DocumentStream> {
        self.record();
        self.inner.find(namespace, filter).await
    }
}

/// Scans yield one document, then fail as if the cursor was killed.
#[derive(Debug)]
struct InterruptedBackend;

fn unsupported_call<T>() -> DocumentStoreResult<T> {
    Err(DocumentStoreError::Store("not supported".into()))
}

#[async_trait]
impl StoreBackend for InterruptedBackend {
    async fn insert_one(&self, _: &Namespace, _: bson::Document) -> DocumentStoreResult<DocumentId> {
        unsupported_call()
    }

    async fn find_one_and_update(
        &self,
        _: &Namespace,
        _: bson::Document,
        _: bson::Document,
    ) -> DocumentStoreResult<Option<bson::Document>> {
        unsupported_call()
    }

    async fn find_one_and_delete(&self, _: &Namespace, _: bson::Document) -> DocumentStoreResult<Option<bson::Document>> {
        unsupported_call()
    }

    async fn find(&self, _: &Namespace, _: bson::Document) -> DocumentStoreResult<DocumentStream> {
        let items = vec![
            Ok(bson::doc! { "_id": bson::oid::ObjectId::new(), "item": "a" }),
            Err(DocumentStoreError::Store("cursor killed".into())),
        ];
        Ok(stream::iter(items).boxed())
    }
}

/// Never answers within any reasonable scope.
#[derive(Debug)]
struct StalledBackend;

async fn stall<T>() -> DocumentStoreResult<T> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Err(DocumentStoreError::Store("answered too late".into()))
}

#[async_trait]
impl StoreBackend for StalledBackend {
    async fn insert_one(&self, _: &Namespace, _: bson::Document) -> DocumentStoreResult<DocumentId> {
        stall().await
    }

    async fn find_one_and_update(
        &self,
        _: &Namespace,
        _: bson::Document,
        _: bson::Document,
    ) -> DocumentStoreResult<Option<bson::Document>> {
        stall().await
    }

    async fn find_one_and_delete(&self, _: &Namespace, _: bson::Document) -> DocumentStoreResult<Option<bson::Document>> {
        stall().await
    }

    async fn find(&self, _: &Namespace, _: bson::Document) -> DocumentStoreResult<DocumentStream> {
        stall().await
    }
}

#[tokio::test]
async fn add_then_get_all_includes_document_with_its_identifier() {
    let store = store();
    let items = store.collection("test", "items");

    items.add(&item("z")).await.unwrap();
    let id = items.add(&item("a")).await.unwrap();

    let all = items.get_all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.contains(&Document::by_id(id).with("item", "a")));
    assert!(all.iter().all(|doc| doc.id().is_some()));
}

#[tokio::test]
async fn update_by_id_overwrites_named_fields_only() {
    let store = store();
    let items = store.collection("test", "items");
    let original = item("a")
        .with("qty", 3)
        .with("dims", Document::new().with("h", 1).with("w", 2));
    let id = items.add(&original).await.unwrap();

    let update = Document::new().with(
        "$set",
        Document::new()
            .with("item", "b")
            .with("dims", Document::new().with("h", 5)),
    );
    let updated = items
        .update_by_id(&id.to_hex(), &update)
        .await
        .unwrap()
        .into_option()
        .unwrap();

    assert_eq!(updated.id(), Some(id));
    assert_eq!(updated.get("item"), Some(&Value::from("b")));
    assert_eq!(updated.get("qty"), Some(&Value::Int(3)));
    // replaced wholesale: no `w` carried over from the previous value
    assert_eq!(
        updated.get("dims"),
        Some(&Value::Object(Document::new().with("h", 5)))
    );
}

#[tokio::test]
async fn remove_by_id_returns_pre_image_and_get_all_excludes_it() {
    let store = store();
    let items = store.collection("test", "items");
    let keep = items.add(&item("keep")).await.unwrap();
    let id = items.add(&item("a")).await.unwrap();

    let removed = items.remove_by_id(&id.to_hex()).await.unwrap();

    assert_eq!(removed, Outcome::Matched(Document::by_id(id).with("item", "a")));
    let remaining: Vec<_> = items
        .get_all()
        .await
        .unwrap()
        .iter()
        .filter_map(Document::id)
        .collect();
    assert_eq!(remaining, vec![keep]);
}

#[tokio::test]
async fn invalid_identifiers_fail_before_reaching_the_store() {
    let backend = RecordingBackend::default();
    let store = DocumentStore::new(backend);
    let items = store.collection("test", "items");

    for bad in ["", "xyz", "5f8f8c44b54764421b7156zz", "5f8f8c44b54764421b7156c3ff"] {
        assert!(matches!(
            items.update_by_id(bad, &set("item", "b")).await,
            Err(DocumentStoreError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            items.remove_by_id(bad).await,
            Err(DocumentStoreError::InvalidIdentifier(_))
        ));
    }

    assert_eq!(store.backend().calls(), 0);
}

#[tokio::test]
async fn encoding_failures_abort_before_reaching_the_store() {
    let store = DocumentStore::new(RecordingBackend::default());
    let items = store.collection("test", "items");

    let err = items.add(&Document::new().with("bad\0key", 1)).await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::Encoding(_)));

    let err = items
        .update(&item("a"), &set("bad\0key", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::Encoding(_)));

    assert_eq!(store.backend().calls(), 0);
}

#[tokio::test]
async fn add_rejects_caller_supplied_identifiers() {
    let store = DocumentStore::new(RecordingBackend::default());
    let items = store.collection("test", "items");

    let err = items
        .add(&Document::by_id(DocumentId::generate()).with("item", "a"))
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::Encoding(_)));
    assert_eq!(store.backend().calls(), 0);
}

#[tokio::test]
async fn add_update_remove_scenario() {
    let store = store();
    let items = store.database("test").collection("test");

    // by filter
    let first = items.add(&item("a")).await.unwrap();
    let updated = items.update(&item("a"), &set("item", "b")).await.unwrap();
    assert_eq!(updated, Outcome::Matched(Document::by_id(first).with("item", "b")));
    let removed = items.remove(&item("b")).await.unwrap();
    assert_eq!(removed, updated);
    assert!(items.get_all().await.unwrap().is_empty());

    // by identifier
    let x = items.add(&item("a")).await.unwrap();
    let updated = items.update_by_id(&x.to_hex(), &set("item", "b")).await.unwrap();
    let doc = updated.document().unwrap();
    assert_eq!(doc.get("item").and_then(Value::as_str), Some("b"));
    assert_eq!(doc.id(), Some(x));

    let removed = items.remove_by_id(&x.to_hex()).await.unwrap();
    assert_eq!(removed, updated);
    assert!(!items.get_all().await.unwrap().iter().any(|d| d.id() == Some(x)));
}

#[tokio::test]
async fn get_all_on_empty_collection_is_empty() {
    let store = store();

    assert!(store.collection("test", "nothing").get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn misses_are_reported_as_not_found() {
    let store = store();
    let items = store.collection("test", "items");
    items.add(&item("a")).await.unwrap();
    let unknown = DocumentId::generate().to_hex();

    assert!(items.update(&item("zzz"), &set("item", "b")).await.unwrap().is_not_found());
    assert!(items.update_by_id(&unknown, &set("item", "b")).await.unwrap().is_not_found());
    assert!(items.remove(&item("zzz")).await.unwrap().is_not_found());
    assert!(items.remove_by_id(&unknown).await.unwrap().is_not_found());
    assert_eq!(items.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_affects_at_most_one_document() {
    let store = store();
    let items = store.collection("test", "items");
    items.add(&item("a")).await.unwrap();
    items.add(&item("a")).await.unwrap();

    items.update(&item("a"), &set("item", "b")).await.unwrap();

    let names: Vec<_> = items
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .filter_map(|doc| doc.get("item").and_then(Value::as_str).map(str::to_string))
        .collect();
    assert_eq!(names, vec!["b", "a"]);
}

#[tokio::test]
async fn malformed_update_operators_are_store_errors() {
    let store = store();
    let items = store.collection("test", "items");
    let id = items.add(&item("a")).await.unwrap();

    let err = items.update_by_id(&id.to_hex(), &item("b")).await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::Store(_)));

    let bogus = Document::new().with("$bogus", Document::new().with("item", "b"));
    let err = items.update_by_id(&id.to_hex(), &bogus).await.unwrap_err();
    assert!(err.is_store_failure());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_do_not_interleave() {
    let store = Arc::new(store());
    let id = store
        .collection("test", "items")
        .add(&Document::new().with("a", 0).with("b", 0))
        .await
        .unwrap()
        .to_hex();

    for round in 0..20 {
        let tasks: Vec<_> = [1, 2]
            .into_iter()
            .map(|n| {
                let store = Arc::clone(&store);
                let id = id.clone();
                tokio::spawn(async move {
                    let update = Document::new().with(
                        "$set",
                        Document::new().with("a", n * 100 + round).with("b", n * 100 + round),
                    );
                    store
                        .collection("test", "items")
                        .update_by_id(&id, &update)
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert!(matches!(task.await.unwrap(), Ok(Outcome::Matched(_))));
        }

        let all = store.collection("test", "items").get_all().await.unwrap();
        let (a, b) = (all[0].get("a").cloned(), all[0].get("b").cloned());
        assert_eq!(a, b);
        assert!([100 + round, 200 + round].map(|v| Some(Value::from(v))).contains(&a));
    }
}

#[tokio::test]
async fn stalled_calls_report_timeouts() {
    let store = DocumentStore::with_config(
        StalledBackend,
        StoreConfig::default().with_call_timeout(Duration::from_millis(20)),
    );
    let items = store.collection("test", "items");
    let id = DocumentId::generate().to_hex();

    assert!(matches!(
        items.add(&item("a")).await,
        Err(DocumentStoreError::Timeout { operation: "add", .. })
    ));
    assert!(items.update(&item("a"), &set("item", "b")).await.unwrap_err().is_timeout());
    assert!(items.update_by_id(&id, &set("item", "b")).await.unwrap_err().is_timeout());
    assert!(items.remove(&item("a")).await.unwrap_err().is_timeout());
    assert!(items.remove_by_id(&id).await.unwrap_err().is_timeout());
    assert!(items.get_all().await.unwrap_err().is_timeout());
    assert!(items.scan().await.unwrap_err().is_timeout());
}

#[tokio::test]
async fn timeouts_can_be_overridden_per_handle() {
    let store = DocumentStore::new(StalledBackend);
    let items = store.collection("test", "items");
    assert_eq!(items.timeout(), Duration::from_secs(30));

    let hurried = items.with_timeout(Duration::from_millis(10));
    let err = hurried.get_all().await.unwrap_err();

    assert!(matches!(
        err,
        DocumentStoreError::Timeout { after, .. } if after == Duration::from_millis(10)
    ));
    assert_eq!(items.timeout(), Duration::from_secs(30));
}

#[tokio::test]
async fn scan_reads_lazily_and_stays_exhausted() {
    let store = store();
    let items = store.collection("test", "items");
    for name in ["a", "b", "c"] {
        items.add(&item(name)).await.unwrap();
    }

    let mut cursor = items.scan().await.unwrap();
    let mut seen = Vec::new();
    while let Some(doc) = cursor.next().await {
        seen.push(doc.unwrap().get("item").and_then(Value::as_str).map(str::to_string));
    }

    assert_eq!(seen, vec![Some("a".into()), Some("b".into()), Some("c".into())]);
    assert!(cursor.is_closed());
    assert!(cursor.next().await.is_none());
    assert_eq!(items.scan().await.unwrap().collect_all().await.unwrap().len(), 3);

    let streamed: Vec<Document> = items.scan().await.unwrap().into_stream().try_collect().await.unwrap();
    assert_eq!(streamed, items.get_all().await.unwrap());
}

#[tokio::test]
async fn json_documents_round_trip_through_the_store() {
    let store = store();
    let items = store.collection("test", "items");
    let original = Document::try_from(json!({
        "item": "journal",
        "qty": 25,
        "price": 9.5,
        "tags": ["blank", "red"],
        "size": { "h": 14, "w": 21, "uom": "cm" },
        "discontinued": false,
        "notes": null,
    }))
    .unwrap();

    let id = items.add(&original).await.unwrap();
    let stored = items.get_all().await.unwrap().remove(0);

    assert_eq!(stored.id(), Some(id));
    assert_eq!(stored.without_id(), original);

    let rendered: serde_json::Value = stored.into();
    assert_eq!(rendered["_id"], json!(id.to_hex()));
}

#[tokio::test]
async fn stores_can_borrow_a_shared_backend() {
    let backend = InMemoryStore::new();

    {
        let store = DocumentStore::new(&backend);
        store.collection("test", "items").add(&item("a")).await.unwrap();
        store.shutdown().await.unwrap();
    }

    assert_eq!(backend.count(&Namespace::new("test", "items")).await, 1);
}

#[tokio::test]
async fn interrupted_get_all_discards_partial_results() {
    let store = DocumentStore::new(InterruptedBackend);
    let items = store.collection("test", "items");

    assert!(matches!(items.get_all().await, Err(DocumentStoreError::Store(_))));

    let mut cursor = items.scan().await.unwrap();
    assert!(cursor.next().await.unwrap().is_ok());
    assert!(matches!(cursor.next().await, Some(Err(DocumentStoreError::Store(_)))));
    assert!(cursor.next().await.is_none());
}

#[tokio::test]
async fn get_all_fails_on_undecodable_documents() {
    let backend = InMemoryStore::new();
    let namespace = Namespace::new("test", "items");
    backend
        .insert_one(&namespace, bson::doc! { "item": "a" })
        .await
        .unwrap();
    backend
        .insert_one(&namespace, bson::doc! { "item": "b", "when": bson::DateTime::from_millis(0) })
        .await
        .unwrap();

    let store = DocumentStore::new(&backend);
    let err = store.collection("test", "items").get_all().await.unwrap_err();

    assert!(matches!(err, DocumentStoreError::Encoding(ref msg) if msg.contains("when")));
}

#[tokio::test]
async fn embedded_filters_match_in_field_order() {
    let store = store();
    let items = store.collection("test", "items");
    let dims = Document::new().with("w", 1).with("h", 2);
    let id = items.add(&item("a").with("dims", dims.clone())).await.unwrap();

    let swapped = Document::new().with("dims", Document::new().with("h", 2).with("w", 1));
    assert!(items.update(&swapped, &set("item", "b")).await.unwrap().is_not_found());

    let updated = items
        .update(&Document::new().with("dims", dims), &set("item", "b"))
        .await
        .unwrap()
        .into_option()
        .unwrap();
    assert_eq!(updated.id(), Some(id));
    assert_eq!(
        updated.keys().map(String::as_str).collect::<Vec<_>>(),
        ["_id", "item", "dims"]
    );
}
