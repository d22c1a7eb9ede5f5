//! End-to-end tests of the facade contract across both backends.
//!
//! The two implementations must produce equivalent externally observable
//! behavior everywhere the contract promises it, and exactly the
//! documented divergences everywhere it does not.

use std::collections::HashMap;
use std::sync::Arc;

use hashi::document::DocumentService;
use hashi::relational::RelationalService;
use hashi::{
    BufferLogger, Condition, DataService, DbError, FieldKind, LogLevel, RetryPolicy,
    SchemaDescriptor, Search, ServiceRegistry, Sort, Value,
};

fn book_schema() -> Vec<SchemaDescriptor> {
    vec![SchemaDescriptor::new("book")
        .field("title", FieldKind::Text)
        .field("price", FieldKind::Number)]
}

async fn seed_books(service: &dyn DataService, books: &[(&str, f64)]) {
    for (title, price) in books {
        let mut values = HashMap::new();
        values.insert("title".to_string(), Value::from(*title));
        values.insert("price".to_string(), Value::from(*price));

        let mut entity = service.create("book", values).await.unwrap();
        // The document backend defers persistence to an explicit save
        if !service.persists_on_create() {
            assert!(service.save(&mut entity).await.unwrap());
        }
    }
}

fn titles(results: &[hashi::Entity]) -> Vec<String> {
    results
        .iter()
        .map(|entity| match entity.get("title") {
            Some(Value::Str(title)) => title,
            other => panic!("expected title string, got {other:?}"),
        })
        .collect()
}

async fn connected_pair() -> (
    DocumentService,
    RelationalService,
    BufferLogger,
    BufferLogger,
) {
    let document = DocumentService::memory();
    let relational = RelationalService::memory();
    let document_log = BufferLogger::new();
    let relational_log = BufferLogger::new();

    document
        .connect(
            Arc::new(document_log.clone()),
            "memory://books",
            book_schema(),
        )
        .await
        .unwrap();
    relational
        .connect(
            Arc::new(relational_log.clone()),
            "postgres://books",
            book_schema(),
        )
        .await
        .unwrap();

    (document, relational, document_log, relational_log)
}

// =============================================================================
// Preconditions
// =============================================================================

#[tokio::test]
async fn test_every_operation_rejects_before_connect() {
    let services: Vec<Box<dyn DataService>> = vec![
        Box::new(DocumentService::memory()),
        Box::new(RelationalService::memory()),
    ];

    for service in &services {
        assert!(matches!(
            service.create("book", HashMap::new()).await.unwrap_err(),
            DbError::NotConnected
        ));
        assert!(matches!(
            service
                .fetch("book", "title", Value::from("dune"))
                .await
                .unwrap_err(),
            DbError::NotConnected
        ));
        assert!(matches!(
            service.fetch_all("book", None, None).await.unwrap_err(),
            DbError::NotConnected
        ));
        assert!(matches!(
            service
                .find_all("book", None, None, None, None)
                .await
                .unwrap_err(),
            DbError::NotConnected
        ));
    }
}

#[tokio::test]
async fn test_disconnect_is_always_safe() {
    // Never connected, no logger ever supplied: still resolves
    DocumentService::memory().disconnect().await;
    RelationalService::memory().disconnect().await;

    // Connected, driver refuses: still resolves and clears state
    let (document, relational, document_log, relational_log) = connected_pair().await;
    document.driver().fail_disconnect(true);
    relational.driver().fail_close(true);

    document.disconnect().await;
    relational.disconnect().await;

    assert_eq!(document_log.count(LogLevel::Error), 1);
    assert_eq!(relational_log.count(LogLevel::Error), 1);
    assert!(matches!(
        document.create("book", HashMap::new()).await.unwrap_err(),
        DbError::NotConnected
    ));
    assert!(matches!(
        relational.create("book", HashMap::new()).await.unwrap_err(),
        DbError::NotConnected
    ));
}

// =============================================================================
// Retry Loop
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_connect_succeeds_once_store_comes_up() {
    let document = DocumentService::memory();
    document.driver().fail_next_connects(2);
    let log = BufferLogger::new();

    document
        .connect(Arc::new(log.clone()), "memory://books", book_schema())
        .await
        .unwrap();

    // Two failed cycles, one error line each, then success
    assert_eq!(log.count(LogLevel::Error), 2);
    assert!(document.create("book", HashMap::new()).await.is_ok());

    let relational = RelationalService::memory();
    relational.driver().fail_next_authenticates(1);
    relational.driver().fail_next_syncs(1);
    let log = BufferLogger::new();

    relational
        .connect(Arc::new(log.clone()), "postgres://books", book_schema())
        .await
        .unwrap();

    // One authenticate failure, one sync failure: two error lines
    assert_eq!(log.count(LogLevel::Error), 2);
    assert!(relational.create("book", HashMap::new()).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_connect_never_resolves_while_store_is_down() {
    let document = DocumentService::memory();
    let log = BufferLogger::new();

    let pending = document.connect(Arc::new(log.clone()), "", book_schema());
    let result = tokio::time::timeout(std::time::Duration::from_millis(2999), pending).await;

    assert!(result.is_err(), "connect must not resolve while failing");
    assert_eq!(log.count(LogLevel::Error), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bounded_retry_is_an_opt_in_generalization() {
    let relational =
        RelationalService::memory().with_retry(RetryPolicy::new().with_max_attempts(2));
    let log = BufferLogger::new();

    let err = relational
        .connect(Arc::new(log.clone()), "", book_schema())
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Connection { .. }));
    assert_eq!(log.count(LogLevel::Error), 2);
}

// =============================================================================
// Creation Asymmetry
// =============================================================================

#[tokio::test]
async fn test_create_persistence_asymmetry_is_observable() {
    let (document, relational, _, _) = connected_pair().await;

    assert!(!document.persists_on_create());
    assert!(relational.persists_on_create());

    let unsaved = document.create("book", HashMap::new()).await.unwrap();
    assert!(document
        .fetch("book", "id", Value::Str(unsaved.id().unwrap().to_string()))
        .await
        .unwrap()
        .is_none());

    let saved = relational.create("book", HashMap::new()).await.unwrap();
    assert!(relational
        .fetch("book", "id", Value::Str(saved.id().unwrap().to_string()))
        .await
        .unwrap()
        .is_some());
}

// =============================================================================
// End-to-End Query Translation
// =============================================================================

#[tokio::test]
async fn test_end_to_end_range_query_document() {
    let (document, _, log, _) = connected_pair().await;
    seed_books(&document, &[("cheap", 5.0), ("mid", 50.0), ("dear", 150.0)]).await;
    log.clear();

    let results = document
        .find_all(
            "book",
            Some(&Search::new().field("price", Condition::range(10.0, 100.0))),
            None,
            None,
            None,
        )
        .await
        .unwrap();

    assert_eq!(titles(&results), vec!["mid"]);
    // Exactly one execution and exactly one debug line (no modifiers)
    assert_eq!(document.driver().find_calls(), 1);
    let lines = log.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].level, LogLevel::Debug);
    assert!(lines[0].message.contains("\"$gt\":10.0"));
    assert!(lines[0].message.contains("\"$lt\":100.0"));
}

#[tokio::test]
async fn test_end_to_end_range_query_relational() {
    let (_, relational, _, log) = connected_pair().await;
    seed_books(&relational, &[("cheap", 5.0), ("mid", 50.0), ("dear", 150.0)]).await;
    let calls_before = relational.driver().select_calls();
    log.clear();

    let results = relational
        .find_all(
            "book",
            Some(&Search::new().field("price", Condition::range(10.0, 100.0))),
            None,
            None,
            None,
        )
        .await
        .unwrap();

    assert_eq!(titles(&results), vec!["mid"]);
    assert_eq!(relational.driver().select_calls(), calls_before + 1);
    let lines = log.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(
        lines[0].message,
        r#"performing search - WHERE "price" BETWEEN 10 AND 100"#
    );
}

#[tokio::test]
async fn test_backends_agree_away_from_range_boundaries() {
    let (document, relational, _, _) = connected_pair().await;
    let books = [("a", 5.0), ("b", 20.0), ("c", 50.0), ("d", 150.0)];
    seed_books(&document, &books).await;
    seed_books(&relational, &books).await;

    let search = Search::new().field("price", Condition::range(10.0, 100.0));
    let sort = Sort::by("price", 1);

    let from_document = document
        .find_all("book", Some(&search), Some(&sort), None, None)
        .await
        .unwrap();
    let from_relational = relational
        .find_all("book", Some(&search), Some(&sort), None, None)
        .await
        .unwrap();

    assert_eq!(titles(&from_document), titles(&from_relational));
    assert_eq!(titles(&from_document), vec!["b", "c"]);
}

#[tokio::test]
async fn test_range_boundary_inclusivity_diverges_as_documented() {
    let (document, relational, _, _) = connected_pair().await;
    let books = [("boundary", 10.0), ("inside", 50.0)];
    seed_books(&document, &books).await;
    seed_books(&relational, &books).await;

    let search = Search::new().field("price", Condition::range(10.0, 100.0));

    // Document: independent exclusive $gt/$lt drop the boundary row
    let from_document = document
        .find_all("book", Some(&search), None, None, None)
        .await
        .unwrap();
    assert_eq!(titles(&from_document), vec!["inside"]);

    // Relational: inclusive BETWEEN keeps it
    let sort = Sort::by("price", 1);
    let from_relational = relational
        .find_all("book", Some(&search), Some(&sort), None, None)
        .await
        .unwrap();
    assert_eq!(titles(&from_relational), vec!["boundary", "inside"]);
}

#[tokio::test]
async fn test_all_undefined_criteria_match_everything() {
    let (document, relational, _, _) = connected_pair().await;
    let books = [("a", 1.0), ("b", 2.0)];
    seed_books(&document, &books).await;
    seed_books(&relational, &books).await;

    let search = Search::new().unset("title").unset("price");

    assert_eq!(
        document
            .find_all("book", Some(&search), None, None, None)
            .await
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        relational
            .find_all("book", Some(&search), None, None, None)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_pattern_match_agrees_across_backends() {
    let (document, relational, _, _) = connected_pair().await;
    let books = [("dune", 1.0), ("dawn", 2.0), ("emma", 3.0)];
    seed_books(&document, &books).await;
    seed_books(&relational, &books).await;

    let search = Search::new().matches("title", "^d");
    let sort = Sort::by("title", 1);

    let from_document = document
        .find_all("book", Some(&search), Some(&sort), None, None)
        .await
        .unwrap();
    let from_relational = relational
        .find_all("book", Some(&search), Some(&sort), None, None)
        .await
        .unwrap();

    assert_eq!(titles(&from_document), vec!["dawn", "dune"]);
    assert_eq!(titles(&from_document), titles(&from_relational));
}

// =============================================================================
// Sort, Offset, Limit
// =============================================================================

#[tokio::test]
async fn test_sort_direction_sign_semantics() {
    let (document, relational, _, _) = connected_pair().await;
    let books = [("a", 1.0), ("c", 3.0), ("b", 2.0)];
    seed_books(&document, &books).await;
    seed_books(&relational, &books).await;

    for service in [&document as &dyn DataService, &relational as &dyn DataService] {
        let descending = service
            .find_all("book", None, Some(&Sort::by("title", -1)), None, None)
            .await
            .unwrap();
        assert_eq!(titles(&descending), vec!["c", "b", "a"]);

        let ascending = service
            .find_all("book", None, Some(&Sort::by("title", 1)), None, None)
            .await
            .unwrap();
        assert_eq!(titles(&ascending), vec!["a", "b", "c"]);
    }
}

#[tokio::test]
async fn test_multi_key_sort_asymmetry() {
    let (document, relational, _, _) = connected_pair().await;
    // Ties on title; the secondary price key distinguishes the backends
    let books = [("a", 2.0), ("b", 1.0), ("a", 1.0)];
    seed_books(&document, &books).await;
    seed_books(&relational, &books).await;

    let sort = Sort::by("title", 1).then("price", 1);

    let from_document = document
        .find_all("book", None, Some(&sort), None, None)
        .await
        .unwrap();
    let document_keys: Vec<f64> = from_document
        .iter()
        .map(|e| e.get("price").unwrap().as_f64().unwrap())
        .collect();
    // Document backend honors the secondary key
    assert_eq!(document_keys, vec![1.0, 2.0, 1.0]);

    let from_relational = relational
        .find_all("book", None, Some(&sort), None, None)
        .await
        .unwrap();
    let relational_keys: Vec<f64> = from_relational
        .iter()
        .map(|e| e.get("price").unwrap().as_f64().unwrap())
        .collect();
    // Relational backend keeps insertion order within the tie
    assert_eq!(relational_keys, vec![2.0, 1.0, 1.0]);
}

#[tokio::test]
async fn test_offset_and_limit_page_through_results() {
    let (document, relational, _, _) = connected_pair().await;
    let books = [("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)];
    seed_books(&document, &books).await;
    seed_books(&relational, &books).await;

    let sort = Sort::by("price", 1);
    for service in [&document as &dyn DataService, &relational as &dyn DataService] {
        let page = service
            .find_all("book", None, Some(&sort), Some(1), Some(2))
            .await
            .unwrap();
        assert_eq!(titles(&page), vec!["b", "c"]);
    }
}

// =============================================================================
// Property Access and Round Trips
// =============================================================================

#[tokio::test]
async fn test_property_bag_round_trip() {
    let (document, _, _, _) = connected_pair().await;

    let mut book = document.create("book", HashMap::new()).await.unwrap();
    document.set_prop(&mut book, "title", Some(Value::from("dune")));
    document.set_prop(&mut book, "price", Some(Value::from(9.5)));
    document.save(&mut book).await.unwrap();

    // Unset on the handle, then persist the removal
    document.set_prop(&mut book, "price", None);
    document.save(&mut book).await.unwrap();

    let fetched = document
        .fetch("book", "title", Value::from("dune"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.get_prop(&fetched, "title"), Some(Value::from("dune")));
    assert_eq!(document.get_prop(&fetched, "price"), None);
    assert!(fetched.created_at().is_some());
}

#[tokio::test]
async fn test_fetch_all_filters_by_single_field() {
    let (_, relational, _, _) = connected_pair().await;
    seed_books(&relational, &[("dune", 1.0), ("dune", 2.0), ("emma", 3.0)]).await;

    let all = relational.fetch_all("book", None, None).await.unwrap();
    assert_eq!(all.len(), 3);

    let filtered = relational
        .fetch_all("book", Some("title"), Some(Value::from("dune")))
        .await
        .unwrap();
    assert_eq!(filtered.len(), 2);
}

#[tokio::test]
async fn test_remove_round_trip_both_backends() {
    let (document, relational, _, _) = connected_pair().await;
    seed_books(&document, &[("dune", 1.0)]).await;
    seed_books(&relational, &[("dune", 1.0)]).await;

    for service in [&document as &dyn DataService, &relational as &dyn DataService] {
        let entity = service
            .fetch("book", "title", Value::from("dune"))
            .await
            .unwrap()
            .unwrap();
        assert!(service.remove(&entity).await.unwrap());
        assert!(service
            .fetch("book", "title", Value::from("dune"))
            .await
            .unwrap()
            .is_none());
    }
}

// =============================================================================
// Registry
// =============================================================================

#[tokio::test]
async fn test_registry_selects_backend_by_key() {
    let log = BufferLogger::new();
    let mut registry = ServiceRegistry::new(Arc::new(log.clone()));
    registry.register("document", || Box::new(DocumentService::memory()));
    registry.register("relational", || Box::new(RelationalService::memory()));

    let service = registry.create("document").unwrap();
    service
        .connect(Arc::new(log.clone()), "memory://books", book_schema())
        .await
        .unwrap();
    seed_books(service.as_ref(), &[("dune", 1.0)]).await;
    assert_eq!(
        service.fetch_all("book", None, None).await.unwrap().len(),
        1
    );

    let err = registry.create("graph").err().unwrap();
    assert!(matches!(err, DbError::UnknownService { .. }));
}
