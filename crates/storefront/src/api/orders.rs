//! Orders API: `/api/v1/orders`.

use bookstore_core::{Email, NewOrder, Order};
use reqwest::Method;
use tracing::{info, instrument};

use super::{ORDERS, decode, segment};
use crate::cache::{MutationDescriptor, QueryCache, QueryDescriptor, QueryKey, Tag};
use crate::client::ResourceClient;
use crate::error::ClientError;

/// Orders resource with cached reads.
#[derive(Debug, Clone)]
pub struct OrdersApi {
    client: ResourceClient,
    cache: QueryCache,
}

impl OrdersApi {
    #[must_use]
    pub const fn new(client: ResourceClient, cache: QueryCache) -> Self {
        Self { client, cache }
    }

    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    #[must_use]
    pub fn all_orders_query() -> QueryDescriptor {
        QueryDescriptor::new(QueryKey::unit("fetchOrders"), [Tag::kind(ORDERS)])
    }

    #[must_use]
    pub fn orders_by_email_query(email: &Email) -> QueryDescriptor {
        QueryDescriptor::new(
            QueryKey::new("fetchOrdersByEmail", email.as_str()),
            [Tag::kind(ORDERS)],
        )
    }

    /// Every order.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` if the fetch fails or the body is not a list
    /// of orders.
    #[instrument(skip(self))]
    pub async fn fetch_orders(&self) -> Result<Vec<Order>, ClientError> {
        let client = self.client.clone();
        let value = self
            .cache
            .query(&Self::all_orders_query(), move || async move { client.get("/").await })
            .await?;
        decode(&value)
    }

    /// Orders placed with `email`.
    ///
    /// # Errors
    ///
    /// Returns a `ClientError` if the fetch fails or the body is not a list
    /// of orders.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn fetch_orders_by_email(&self, email: &Email) -> Result<Vec<Order>, ClientError> {
        let client = self.client.clone();
        let path = format!("/email/{}", segment(email.as_str()));
        let value = self
            .cache
            .query(&Self::orders_by_email_query(email), move || async move {
                client.get(&path).await
            })
            .await?;
        decode(&value)
    }

    /// Submit an order. Invalidates every cached order listing on success.
    ///
    /// # Errors
    ///
    /// Returns the request's `ClientError`, or `ClientError::Decode` if the
    /// created order cannot be parsed.
    #[instrument(skip(self, order), fields(items = order.product_ids.len()))]
    pub async fn create_order(&self, order: &NewOrder) -> Result<Order, ClientError> {
        let mutation = MutationDescriptor::new("createOrder", [Tag::kind(ORDERS)]);
        let created: Order = self
            .cache
            .mutate(&mutation, || {
                self.client.request_json(Method::POST, "/", Some(order))
            })
            .await?;
        info!(order_id = %created.id, total = %created.total_price, "Order placed");
        Ok(created)
    }
}
