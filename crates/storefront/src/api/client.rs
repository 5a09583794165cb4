//! `reqwest` implementation of [`CommerceApi`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use trumall_core::{
    Address, AddressId, AddressInput, CartLine, CartLineId, CheckoutRequest, CheckoutRequestId,
    CheckoutSession, OrderId, PaymentStatus, ProductId, ShippingMethod, ShippingOption,
    ShippingQuote,
};
use uuid::Uuid;

use super::types::{
    AddToCartBody, AddressListResponse, CartItemRecord, CheckoutResponse, ErrorBody,
    PaymentStatusQuery, PaymentStatusResponse, ProductBody, ShippingCalculateBody,
    ShippingCalculationRecord, ShippingMethodsResponse,
};
use super::{ApiError, CommerceApi};
use crate::config::{StorefrontConfig, bearer_value};

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest body excerpt kept in logs and error messages.
const BODY_EXCERPT_CHARS: usize = 200;

/// Client for the Trumall REST API.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct HttpApi {
    inner: Arc<HttpApiInner>,
}

struct HttpApiInner {
    client: reqwest::Client,
    config: StorefrontConfig,
}

impl HttpApi {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the token cannot be used as a header value or the
    /// HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();

        let mut auth_value = HeaderValue::from_str(&bearer_value(config))
            .map_err(|e| ApiError::InvalidHeader(format!("Invalid API token format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpApiInner {
                client,
                config: config.clone(),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        self.inner.config.endpoint(path)
    }

    /// Attach a request ID, send, and turn non-success statuses into errors.
    ///
    /// `tolerated` statuses are handed back to the caller instead of being
    /// treated as failures.
    async fn send(
        &self,
        request: RequestBuilder,
        tolerated: &[StatusCode],
    ) -> Result<Response, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        let response = request
            .header(REQUEST_ID_HEADER, &request_id)
            .send()
            .await?;

        let status = response.status();
        debug!(request_id = %request_id, status = %status, "API response");

        if status.is_success() || tolerated.contains(&status) {
            return Ok(response);
        }

        Err(error_from_response(response).await)
    }

    /// Parse a cart snapshot body into lines.
    async fn cart_lines(response: Response) -> Result<Vec<CartLine>, ApiError> {
        // A Go nil slice serialises as `null`
        let records: Option<Vec<CartItemRecord>> = read_json(response).await?;
        Ok(records
            .unwrap_or_default()
            .into_iter()
            .map(CartLine::from)
            .filter(|line| line.quantity > 0)
            .collect())
    }
}

#[async_trait]
impl CommerceApi for HttpApi {
    #[instrument(skip(self))]
    async fn get_cart(&self) -> Result<Vec<CartLine>, ApiError> {
        let request = self.inner.client.get(self.url("/cart"));
        // 404/204 mean "no cart yet" here only; on mutations they are errors
        let response = self
            .send(request, &[StatusCode::NOT_FOUND, StatusCode::NO_CONTENT])
            .await?;
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT
        ) {
            return Ok(Vec::new());
        }
        Self::cart_lines(response).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_to_cart(&self, product_id: &ProductId, quantity: u32) -> Result<(), ApiError> {
        let body = AddToCartBody {
            product_id,
            quantity,
        };
        let request = self.inner.client.post(self.url("/cart/add")).json(&body);
        self.send(request, &[]).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn increase_quantity(&self, product_id: &ProductId) -> Result<Vec<CartLine>, ApiError> {
        let request = self
            .inner
            .client
            .post(self.url("/cart/increase"))
            .json(&ProductBody { product_id });
        let response = self.send(request, &[]).await?;
        Self::cart_lines(response).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn decrease_quantity(&self, product_id: &ProductId) -> Result<Vec<CartLine>, ApiError> {
        let request = self
            .inner
            .client
            .post(self.url("/cart/decrease"))
            .json(&ProductBody { product_id });
        let response = self.send(request, &[]).await?;
        Self::cart_lines(response).await
    }

    #[instrument(skip(self), fields(line_id = %line_id))]
    async fn remove_line(&self, line_id: &CartLineId) -> Result<(), ApiError> {
        let path = format!("/cart/{}", urlencoding::encode(line_id.as_str()));
        let request = self.inner.client.delete(self.url(&path));
        self.send(request, &[]).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), ApiError> {
        let request = self.inner.client.delete(self.url("/cart/clear"));
        self.send(request, &[]).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_addresses(&self) -> Result<Vec<Address>, ApiError> {
        let request = self.inner.client.get(self.url("/addresses"));
        let response = self.send(request, &[]).await?;
        let list: Option<AddressListResponse> = read_json(response).await?;
        Ok(list.map(AddressListResponse::into_vec).unwrap_or_default())
    }

    #[instrument(skip(self, input))]
    async fn create_address(&self, input: &AddressInput) -> Result<Address, ApiError> {
        let request = self.inner.client.post(self.url("/addresses")).json(input);
        let response = self.send(request, &[]).await?;
        read_json(response).await
    }

    #[instrument(skip(self, input), fields(address_id = %id))]
    async fn update_address(
        &self,
        id: &AddressId,
        input: &AddressInput,
    ) -> Result<Address, ApiError> {
        let path = format!("/addresses/{}", urlencoding::encode(id.as_str()));
        let request = self.inner.client.put(self.url(&path)).json(input);
        let response = self.send(request, &[]).await?;
        read_json(response).await
    }

    #[instrument(skip(self), fields(address_id = %id))]
    async fn delete_address(&self, id: &AddressId) -> Result<(), ApiError> {
        let path = format!("/addresses/{}", urlencoding::encode(id.as_str()));
        let request = self.inner.client.delete(self.url(&path));
        self.send(request, &[]).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(address_id = %id))]
    async fn set_default_address(&self, id: &AddressId) -> Result<(), ApiError> {
        let path = format!("/addresses/{}/default", urlencoding::encode(id.as_str()));
        let request = self.inner.client.put(self.url(&path));
        self.send(request, &[]).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(address_id = %address_id))]
    async fn shipping_methods(
        &self,
        address_id: &AddressId,
    ) -> Result<Vec<ShippingOption>, ApiError> {
        let request = self
            .inner
            .client
            .get(self.url("/shipping/methods"))
            .query(&[("address_id", address_id.as_str())]);
        let response = self.send(request, &[]).await?;
        let methods: ShippingMethodsResponse = read_json(response).await?;

        Ok(methods
            .shipping_methods
            .into_iter()
            .filter_map(|record| {
                let code = record.method_code.clone();
                let option = record.into_option();
                if option.is_none() {
                    debug!(method_code = %code, "Skipping unknown shipping method");
                }
                option
            })
            .collect())
    }

    #[instrument(skip(self), fields(address_id = %address_id, method = %method))]
    async fn calculate_shipping(
        &self,
        address_id: &AddressId,
        method: ShippingMethod,
    ) -> Result<ShippingQuote, ApiError> {
        let body = ShippingCalculateBody {
            address_id,
            shipping_method: method,
        };
        let request = self
            .inner
            .client
            .post(self.url("/shipping/calculate"))
            .json(&body);
        let response = self.send(request, &[]).await?;
        let record: ShippingCalculationRecord = read_json(response).await?;
        let code = record.method_code.clone();

        record
            .into_quote()
            .ok_or_else(|| ApiError::Unexpected(format!("unknown shipping method '{code}'")))
    }

    #[instrument(skip(self, request), fields(address_id = %request.address_id, method = %request.shipping_method))]
    async fn checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, ApiError> {
        let http_request = self
            .inner
            .client
            .post(self.url("/cart/checkout"))
            .json(request);
        let response = self.send(http_request, &[]).await?;
        let body: CheckoutResponse = read_json(response).await?;

        if body.order_id.is_empty() || body.checkout_request_id.is_empty() {
            return Err(ApiError::Unexpected(
                "checkout response is missing order or checkout request id".to_string(),
            ));
        }

        Ok(CheckoutSession::from(body))
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn payment_status(
        &self,
        order_id: &OrderId,
        checkout_request_id: &CheckoutRequestId,
    ) -> Result<PaymentStatus, ApiError> {
        let query = PaymentStatusQuery {
            order_id,
            checkout_request_id,
        };
        let request = self
            .inner
            .client
            .get(self.url("/payments/status"))
            .query(&query);
        let response = self.send(request, &[]).await?;
        let body: PaymentStatusResponse = read_json(response).await?;
        Ok(body.status)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Read the body as text first for better error diagnostics, then parse.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %excerpt(&text),
            "Failed to parse Trumall API response"
        );
        ApiError::Parse(e)
    })
}

/// Build an [`ApiError::Api`] from a failed response.
async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let server_message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .map(|b| b.error)
        .filter(|m| !m.trim().is_empty());

    let message = server_message.clone().unwrap_or_else(|| {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            excerpt(&body)
        }
    });

    if status.is_server_error() {
        tracing::error!(status = %status, body = %excerpt(&body), "Trumall API returned server error");
    } else {
        debug!(status = %status, message = %message, "Trumall API rejected request");
    }

    ApiError::Api {
        status: status.as_u16(),
        message,
        server_message,
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(500);
        assert_eq!(excerpt(&long).len(), BODY_EXCERPT_CHARS);
        assert_eq!(excerpt("short"), "short");
    }
}
