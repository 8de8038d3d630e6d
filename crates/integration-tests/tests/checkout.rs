//! Order placement end to end.

#![allow(clippy::unwrap_used)]

use bookstore_core::{BookId, CheckoutError, CheckoutForm, Email, NewOrder, Price};
use bookstore_integration_tests::{book_json, order_json, store_for};
use bookstore_storefront::{CheckoutFlowError, CheckoutOutcome, ClientError, place_order};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn form() -> CheckoutForm {
    CheckoutForm {
        name: "Ada Lovelace".to_string(),
        phone: "1234567".to_string(),
        address: "12 Analytical St".to_string(),
        city: "London".to_string(),
        country: "UK".to_string(),
        state: "Greater London".to_string(),
        zipcode: "N1".to_string(),
        terms_accepted: true,
    }
}

fn email() -> Email {
    Email::parse("ada@example.com").unwrap()
}

async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/books/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            book_json("b1", "Dune", 10.0),
            book_json("b2", "Emma", 5.5),
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_order_is_placed_from_cart() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/orders/"))
        .and(body_json(json!({
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "address": {
                "city": "London",
                "country": "UK",
                "state": "Greater London",
                "zipcode": "N1"
            },
            "phone": "1234567",
            "productIds": ["b1", "b2"],
            "totalPrice": 25.5
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(order_json("o1", "ada@example.com", &["b1", "b2"], 25.5)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let catalog = store.books().fetch_all_books().await.unwrap();
    for book in &catalog {
        store.add_to_cart(book);
    }
    store.add_to_cart(&catalog[0]);
    assert_eq!(store.cart().total(), Price::from_cents(2550));

    let outcome = place_order(&store, &form(), Some(&email()), &|order: &NewOrder| {
        order.product_ids == [BookId::new("b1"), BookId::new("b2")]
    })
    .await
    .unwrap();

    let CheckoutOutcome::Placed(order) = &outcome else {
        panic!("expected a placed order, got {outcome:?}");
    };
    assert_eq!(order.id.as_str(), "o1");
    assert_eq!(order.total_price, Price::from_cents(2550));
    // The cart is left to the caller.
    assert_eq!(store.cart().len(), 2);
}

#[tokio::test]
async fn test_placing_an_order_refreshes_order_listings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/orders/email/ada%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/orders/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(order_json("o1", "ada@example.com", &["b1"], 10.0)),
        )
        .mount(&server)
        .await;

    let store = store_for(&server);
    store.orders().fetch_orders_by_email(&email()).await.unwrap();
    store.add_to_cart(&serde_json::from_value(book_json("b1", "Dune", 10.0)).unwrap());

    place_order(&store, &form(), Some(&email()), &|_: &NewOrder| true)
        .await
        .unwrap();

    store.orders().fetch_orders_by_email(&email()).await.unwrap();
    store.orders().fetch_orders_by_email(&email()).await.unwrap();
}

#[tokio::test]
async fn test_missing_fields_are_reported_together() {
    let server = MockServer::start().await;
    let store = store_for(&server);
    store.add_to_cart(&serde_json::from_value(book_json("b1", "Dune", 10.0)).unwrap());

    let incomplete = CheckoutForm {
        name: String::new(),
        phone: " ".to_string(),
        ..form()
    };
    let err = place_order(&store, &incomplete, Some(&email()), &|_: &NewOrder| true)
        .await
        .unwrap_err();

    let CheckoutFlowError::Validation(CheckoutError::InvalidFields(fields)) = &err else {
        panic!("expected field errors, got {err:?}");
    };
    let messages: Vec<&str> = fields.iter().map(|f| f.message).collect();
    assert_eq!(messages, ["Name is required.", "Phone number is required."]);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_signed_out_customer_cannot_order() {
    let server = MockServer::start().await;
    let store = store_for(&server);
    store.add_to_cart(&serde_json::from_value(book_json("b1", "Dune", 10.0)).unwrap());

    let err = place_order(&store, &form(), None, &|_: &NewOrder| true)
        .await
        .unwrap_err();

    assert_eq!(err, CheckoutFlowError::Validation(CheckoutError::NotSignedIn));
}

#[tokio::test]
async fn test_rejected_order_is_returned_as_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/orders/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "Failed to create order"})))
        .mount(&server)
        .await;

    let store = store_for(&server);
    store.add_to_cart(&serde_json::from_value(book_json("b1", "Dune", 10.0)).unwrap());

    let err = place_order(&store, &form(), Some(&email()), &|_: &NewOrder| true)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CheckoutFlowError::Request(ClientError::Http {
            status: 500,
            message: "Failed to create order".to_string()
        })
    );
}
