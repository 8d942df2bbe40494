//! # ActorClient Trait
//!
//! Shared behaviour for record-specific client wrappers (`OrderClient`, `DishClient`):
//! default `get`, `delete` and `list` built on the inner `ResourceClient`, with framework
//! errors mapped to the wrapper's own error type.
use crate::{ActorEntity, FrameworkError, ResourceClient};
use async_trait::async_trait;

/// Trait for record-specific clients to inherit the plain store operations.
///
/// ```rust,ignore
/// #[async_trait]
/// impl ActorClient<Order> for OrderClient {
///     type Error = OrderError;
///     fn inner(&self) -> &ResourceClient<Order> { &self.inner }
///     fn map_error(e: FrameworkError) -> OrderError { OrderError::from(e) }
/// }
///
/// let order = order_client.get(OrderId(1)).await?;
/// ```
#[async_trait]
pub trait ActorClient<T: ActorEntity>: Send + Sync {
    /// The record-specific error type.
    type Error: Send + Sync;

    /// Access the inner generic ResourceClient.
    fn inner(&self) -> &ResourceClient<T>;

    /// Map framework errors to the record error type.
    fn map_error(e: FrameworkError) -> Self::Error;

    /// Fetch a record by ID.
    #[tracing::instrument(skip(self))]
    async fn get(&self, id: T::Id) -> Result<Option<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().get(id).await.map_err(Self::map_error)
    }

    /// Delete a record by ID.
    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: T::Id) -> Result<(), Self::Error> {
        tracing::debug!("Sending request");
        self.inner().delete(id).await.map_err(Self::map_error)
    }

    /// List records matching `query`.
    #[tracing::instrument(skip(self))]
    async fn list(&self, query: T::Query) -> Result<Vec<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().list(query).await.map_err(Self::map_error)
    }
}
