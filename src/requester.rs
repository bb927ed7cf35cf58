use async_trait::async_trait;
use serde_json::Value;

use crate::{GatewayConfig, GatewayError, GraphQLRequest};

/// Transport seam between the gateway and the remote API.
///
/// The production implementation posts over HTTPS with reqwest; tests
/// substitute canned envelopes.
#[async_trait]
pub trait GraphQLRequester {
    async fn post(
        &self,
        config: &GatewayConfig,
        request: &GraphQLRequest,
    ) -> Result<Value, GatewayError>;
}

pub struct HttpRequester {
    client: reqwest::Client,
}

impl HttpRequester {
    pub fn new() -> Self {
        HttpRequester {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl GraphQLRequester for HttpRequester {
    async fn post(
        &self,
        config: &GatewayConfig,
        request: &GraphQLRequest,
    ) -> Result<Value, GatewayError> {
        let response = self
            .client
            .post(&config.endpoint)
            .basic_auth(&config.public_key, Some(&config.private_key))
            .header("Braintree-Version", &config.version)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        Ok(response.json::<Value>().await?)
    }
}
