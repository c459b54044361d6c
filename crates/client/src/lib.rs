//! Typed async HTTP client for the product catalog API.
//!
//! ```no_run
//! # async fn demo() -> client::Result<()> {
//! let catalog = client::ProductsClient::new("http://localhost:3000")?;
//! let page = catalog.list(&client::ListOptions::default()).await?;
//! println!("{} products", page.data.total);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod types;

use common::{ProductId, RequestId};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

pub use error::{ClientError, Problem, Result};
pub use types::{
    CommandOutcome, Fetched, ListOptions, NewProduct, Page, Product, ProductUpdate,
    SkuAvailability, Source,
};

/// Header carrying the idempotency key of a command.
const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// Client for the `/api/products` endpoints.
#[derive(Debug, Clone)]
pub struct ProductsClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ProductsClient {
    /// Creates a client for the API at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a client reusing an existing `reqwest` client.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::Url(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Url(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn products(&self, method: Method, rest: &[&str]) -> Result<RequestBuilder> {
        let mut segments = vec!["api", "products"];
        segments.extend_from_slice(rest);
        Ok(self.http.request(method, self.url(&segments)?))
    }

    /// Returns true if the server reports itself healthy.
    pub async fn health(&self) -> Result<bool> {
        let response = self.http.get(self.url(&["health"])?).send().await?;
        Ok(response.status().is_success())
    }

    /// Lists one page of products.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, options: &ListOptions) -> Result<Fetched<Page<Product>>> {
        let request = self.products(Method::GET, &[])?.query(&options.to_query());
        decode(send(request).await?).await
    }

    /// Loads one product, or `None` if it does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Option<Fetched<Product>>> {
        let id = id.to_string();
        match send(self.products(Method::GET, &[id.as_str()])?).await {
            Ok(response) => decode(response).await.map(Some),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Checks whether a SKU is taken. The server normalizes `sku` first.
    #[tracing::instrument(skip(self))]
    pub async fn sku_exists(&self, sku: &str) -> Result<Fetched<SkuAvailability>> {
        decode(send(self.products(Method::GET, &["sku-exists", sku])?).await?).await
    }

    /// Creates a product and returns its id.
    #[tracing::instrument(skip(self, product), fields(sku = %product.sku))]
    pub async fn create(
        &self,
        product: &NewProduct,
        request_id: Option<RequestId>,
    ) -> Result<CommandOutcome<ProductId>> {
        let request = with_request_id(self.products(Method::POST, &[])?, request_id).json(product);
        let response = send(request).await?;

        if response.status() == StatusCode::CREATED {
            let created: types::Created = response.json().await?;
            Ok(CommandOutcome::Completed(created.id))
        } else {
            replay(response).await
        }
    }

    /// Replaces name, prices and stock of a product.
    #[tracing::instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
        request_id: Option<RequestId>,
    ) -> Result<CommandOutcome<()>> {
        let id = id.to_string();
        let request =
            with_request_id(self.products(Method::PUT, &[id.as_str()])?, request_id).json(update);
        unit(send(request).await?).await
    }

    /// Deletes a product.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<()> {
        let id = id.to_string();
        send(self.products(Method::DELETE, &[id.as_str()])?).await?;
        Ok(())
    }

    /// Freezes the price of a product.
    pub async fn lock_price(
        &self,
        id: ProductId,
        request_id: Option<RequestId>,
    ) -> Result<CommandOutcome<()>> {
        self.set_price_lock(id, "lock-price", request_id).await
    }

    /// Releases a price lock.
    pub async fn unlock_price(
        &self,
        id: ProductId,
        request_id: Option<RequestId>,
    ) -> Result<CommandOutcome<()>> {
        self.set_price_lock(id, "unlock-price", request_id).await
    }

    #[tracing::instrument(skip(self))]
    async fn set_price_lock(
        &self,
        id: ProductId,
        action: &str,
        request_id: Option<RequestId>,
    ) -> Result<CommandOutcome<()>> {
        let id = id.to_string();
        let request = with_request_id(
            self.products(Method::POST, &[id.as_str(), action])?,
            request_id,
        );
        unit(send(request).await?).await
    }
}

fn with_request_id(request: RequestBuilder, request_id: Option<RequestId>) -> RequestBuilder {
    match request_id {
        Some(id) => request.header(IDEMPOTENCY_HEADER, id.to_string()),
        None => request,
    }
}

/// Sends a request and turns error statuses into [`ClientError::Api`].
async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let problem = response.json::<Problem>().await.unwrap_or_else(|_| Problem {
        title: status.canonical_reason().unwrap_or("Error").to_string(),
        ..Problem::default()
    });
    tracing::debug!(status = status.as_u16(), kind = %problem.kind, "API request failed");
    Err(ClientError::Api {
        status: status.as_u16(),
        problem,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    Ok(response.json().await?)
}

/// Maps `204` to completion and a `200` replay body to `AlreadyProcessed`.
async fn unit(response: Response) -> Result<CommandOutcome<()>> {
    if response.status() == StatusCode::NO_CONTENT {
        Ok(CommandOutcome::Completed(()))
    } else {
        replay(response).await
    }
}

async fn replay<T>(response: Response) -> Result<CommandOutcome<T>> {
    let body: types::Replay = response.json().await?;
    Ok(CommandOutcome::AlreadyProcessed {
        request_id: body.request_id,
    })
}
