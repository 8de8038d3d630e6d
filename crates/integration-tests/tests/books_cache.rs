//! Catalog reads through the query cache against a mock backend.

#![allow(clippy::unwrap_used)]

use bookstore_core::{BookId, BookUpdate, NewBook, Price};
use bookstore_integration_tests::{book_json, store_for};
use bookstore_storefront::{BooksApi, ClientError, QueryStatus, Store, StoreConfig};
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn new_book() -> NewBook {
    NewBook {
        title: "Emma".to_string(),
        description: "A novel".to_string(),
        category: "classics".to_string(),
        trending: false,
        cover_image: "emma.png".to_string(),
        old_price: Price::from_cents(1200),
        new_price: Price::from_cents(900),
    }
}

// =============================================================================
// Cache hits and invalidation
// =============================================================================

#[tokio::test]
async fn test_listing_is_fetched_once_until_a_write() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/books/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([book_json("b1", "Dune", 10.0)])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/books/create-book"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Book posted successfully"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let books = store.books();

    let first = books.fetch_all_books().await.unwrap();
    let cached = books.fetch_all_books().await.unwrap();
    assert_eq!(first, cached);
    assert_eq!(first[0].title, "Dune");

    books.add_book(&new_book()).await.unwrap();
    let entry = books.cache().peek(&BooksApi::all_books_query().key).unwrap();
    assert!(entry.stale);

    books.fetch_all_books().await.unwrap();
    books.fetch_all_books().await.unwrap();
    // `expect(2)` is verified when the server drops.
}

#[tokio::test]
async fn test_failed_write_keeps_cached_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/books/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/books/b1"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "Failed to delete a book"})))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let books = store.books();
    books.fetch_all_books().await.unwrap();

    let err = books.delete_book(&BookId::new("b1")).await.unwrap_err();
    assert_eq!(err.status(), Some(500));

    books.fetch_all_books().await.unwrap();
    assert!(books.cache().peek(&BooksApi::all_books_query().key).unwrap().is_fresh());
}

#[tokio::test]
async fn test_update_invalidates_by_id_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/books/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(book_json("b1", "Dune", 10.0)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/books/edit/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Book updated successfully"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let books = store.books();
    let id = BookId::new("b1");

    let book = books.fetch_book_by_id(&id).await.unwrap();
    assert_eq!(book.new_price, Price::from_cents(1000));

    let update = BookUpdate {
        new_price: Some(Price::from_cents(800)),
        ..BookUpdate::default()
    };
    books.update_book(&id, &update).await.unwrap();
    books.fetch_book_by_id(&id).await.unwrap();
}

#[tokio::test]
async fn test_empty_update_is_rejected_locally() {
    let server = MockServer::start().await;
    let store = store_for(&server);

    let err = store
        .books()
        .update_book(&BookId::new("b1"), &BookUpdate::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidRequest(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

// =============================================================================
// De-duplication and failures
// =============================================================================

#[tokio::test]
async fn test_concurrent_reads_share_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/books/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([book_json("b1", "Dune", 10.0)]))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let books = store.books();

    let (a, b, c) = tokio::join!(books.fetch_all_books(), books.fetch_all_books(), books.fetch_all_books());

    assert_eq!(a.unwrap().len(), 1);
    assert_eq!(b.unwrap().len(), 1);
    assert_eq!(c.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_book_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/books/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Book not Found!"})))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store.books().fetch_book_by_id(&BookId::new("nope")).await.unwrap_err();

    assert!(err.is_not_found());
    let entry = store
        .books()
        .cache()
        .peek(&BooksApi::book_query(&BookId::new("nope")).key)
        .unwrap();
    assert_eq!(entry.status, QueryStatus::Rejected);
    assert_eq!(entry.error, Some(err));
}

#[tokio::test]
async fn test_unreachable_backend_is_a_network_error() {
    // Nothing listens on the discard port.
    let config = StoreConfig::new(Url::parse("http://127.0.0.1:9").unwrap());
    let store = Store::new(&config).unwrap();

    let err = store.books().fetch_all_books().await.unwrap_err();

    assert!(matches!(err, ClientError::Network(_)));
}

#[tokio::test]
async fn test_ids_are_percent_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/books/a%20b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(book_json("a b", "Spaced", 1.0)))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let book = store.books().fetch_book_by_id(&BookId::new("a b")).await.unwrap();

    assert_eq!(book.id.as_str(), "a b");
}

#[tokio::test]
async fn test_background_state_reports_loading_then_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/books/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([book_json("b1", "Dune", 10.0)])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let books = store.books();

    let state = books.all_books_state();
    assert!(state.is_loading());

    let listing = books.fetch_all_books().await.unwrap();
    assert_eq!(listing.len(), 1);

    let state = books.all_books_state();
    assert!(state.is_fresh());
    let decoded: Vec<bookstore_core::Book> = state.decode().unwrap().unwrap();
    assert_eq!(decoded, listing);
}
