//! Order placement.
//!
//! Validation and command building are pure and live in
//! [`bookstore_core::checkout`]. This module adds the confirmation step and
//! the network call.

use std::future::Future;

use bookstore_core::{CheckoutError, CheckoutForm, Email, NewOrder, Order, build_order};
use thiserror::Error;
use tracing::{info, instrument};

use crate::error::ClientError;
use crate::store::Store;

/// Asks the customer to confirm an order before it is submitted.
pub trait Confirm: Sync {
    /// Return `true` to submit `order`.
    fn confirm(&self, order: &NewOrder) -> impl Future<Output = bool> + Send;
}

/// Synchronous confirmations, e.g. `|_| true` in tests.
impl<F> Confirm for F
where
    F: Fn(&NewOrder) -> bool + Sync,
{
    fn confirm(&self, order: &NewOrder) -> impl Future<Output = bool> + Send {
        std::future::ready(self(order))
    }
}

/// How a checkout attempt ended, short of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The backend accepted the order.
    Placed(Order),
    /// The customer declined at the confirmation step. Nothing was sent.
    Cancelled,
}

/// Why a checkout attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutFlowError {
    /// The form, sign-in state or cart was not ready. Nothing was sent.
    #[error(transparent)]
    Validation(#[from] CheckoutError),

    /// The order request failed.
    #[error("Failed to place order: {0}")]
    Request(#[from] ClientError),
}

/// Validate the form, confirm, and submit the order.
///
/// The cart is left as is; callers clear it after a placed order if they
/// want to.
///
/// # Errors
///
/// Returns `CheckoutFlowError::Validation` before any request is made, or
/// `CheckoutFlowError::Request` if submission fails.
#[instrument(skip_all)]
pub async fn place_order<C: Confirm>(
    store: &Store,
    form: &CheckoutForm,
    email: Option<&Email>,
    confirm: &C,
) -> Result<CheckoutOutcome, CheckoutFlowError> {
    let cart = store.cart().snapshot();
    let order = build_order(form, email, &cart)?;

    if !confirm.confirm(&order).await {
        info!("Checkout cancelled by customer");
        return Ok(CheckoutOutcome::Cancelled);
    }

    let placed = store.orders().create_order(&order).await?;
    Ok(CheckoutOutcome::Placed(placed))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bookstore_core::{CartItem, Price};
    use url::Url;

    use super::*;
    use crate::config::StoreConfig;

    fn form() -> CheckoutForm {
        CheckoutForm {
            name: "Ada".to_string(),
            phone: "1234567".to_string(),
            address: "12 Analytical St".to_string(),
            city: "London".to_string(),
            country: "UK".to_string(),
            state: "Greater London".to_string(),
            zipcode: "N1".to_string(),
            terms_accepted: true,
        }
    }

    fn store() -> Store {
        // Nothing listens here; any request would fail with a network error.
        let config = StoreConfig::new(Url::parse("http://127.0.0.1:9").unwrap());
        Store::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_declined_confirmation_sends_nothing() {
        let store = store();
        store.cart().add(CartItem::new("b1", "Dune", Price::from_cents(1000)));
        let email = Email::parse("ada@example.com").unwrap();

        let outcome = place_order(&store, &form(), Some(&email), &|_: &NewOrder| false)
            .await
            .unwrap();

        assert_eq!(outcome, CheckoutOutcome::Cancelled);
        assert_eq!(store.cart().len(), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_skips_confirmation() {
        let store = store();
        let email = Email::parse("ada@example.com").unwrap();

        let err = place_order(&store, &form(), Some(&email), &|_: &NewOrder| -> bool {
            panic!("confirmation must not be asked for an empty cart")
        })
        .await
        .unwrap_err();

        assert_eq!(err, CheckoutFlowError::Validation(CheckoutError::EmptyCart));
    }

    #[tokio::test]
    async fn test_request_failure_is_returned_as_data() {
        let store = store();
        store.cart().add(CartItem::new("b1", "Dune", Price::from_cents(1000)));
        let email = Email::parse("ada@example.com").unwrap();

        let err = place_order(&store, &form(), Some(&email), &|_: &NewOrder| true)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutFlowError::Request(ClientError::Network(_))));
    }
}
