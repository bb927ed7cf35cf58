use serde_json::{Value, json};
use tracing::error;

use crate::error::{GatewayError, GatewayResult, parse_request_id};
use crate::requester::GraphQLRequester;
use crate::{GatewayConfig, GraphQLRequest};

const PING_QUERY: &str = "{ ping }";

const CLIENT_TOKEN_QUERY: &str = "mutation { createClientToken(input: {}) { clientToken } }";

const CHARGE_QUERY: &str = r#"mutation($input: ChargePaymentMethodInput!) {
  chargePaymentMethod(input: $input) {
    transaction {
      id
    }
  }
}"#;

const VAULT_QUERY: &str = r#"mutation($input: VaultPaymentMethodInput!) {
  vaultPaymentMethod(input: $input) {
    paymentMethod {
      id
      usage
    }
  }
}"#;

// Aliased to `transaction` so the response key matches the operation name.
const TRANSACTION_QUERY: &str = r#"query($id: ID!) {
  transaction: node(id: $id) {
    ... on Transaction {
      id
      amount {
        value
        currencyIsoCode
      }
      status
      createdAt
      paymentMethodSnapshot {
        __typename
        ... on CreditCardDetails {
          bin
          brandCode
          cardholderName
          expirationMonth
          expirationYear
          last4
          binData {
            countryOfIssuance
          }
          origin {
            type
          }
        }
        ... on PayPalTransactionDetails {
          payer {
            email
            payerId
            firstName
            lastName
          }
          payerStatus
        }
      }
    }
  }
}"#;

/// Adapter over the remote payment GraphQL API.
///
/// Every operation funnels through [`PaymentGateway::execute`], which
/// guarantees the caller gets either a validated envelope or a
/// [`GatewayError`] — raw transport failures never cross this boundary.
pub struct PaymentGateway {
    config: GatewayConfig,
    requester: Box<dyn GraphQLRequester + Send + Sync>,
}

impl PaymentGateway {
    pub fn new(config: GatewayConfig, requester: Box<dyn GraphQLRequester + Send + Sync>) -> Self {
        PaymentGateway { config, requester }
    }

    /// Health check against the remote API.
    pub async fn ping(&self) -> GatewayResult<Value> {
        self.execute("ping", PING_QUERY, json!({})).await
    }

    /// Creates the credential the browser-side drop-in form bootstraps from,
    /// returned under `data.createClientToken.clientToken`.
    pub async fn create_client_token(&self) -> GatewayResult<Value> {
        self.execute("createClientToken", CLIENT_TOKEN_QUERY, json!({}))
            .await
    }

    /// Charges a single-use payment method for the given amount. On success
    /// the envelope carries `data.chargePaymentMethod.transaction.id`.
    pub async fn charge(&self, payment_method_id: &str, amount: &str) -> GatewayResult<Value> {
        let variables = json!({
            "input": {
                "paymentMethodId": payment_method_id,
                "transaction": {
                    "amount": amount,
                },
            }
        });
        self.execute("chargePaymentMethod", CHARGE_QUERY, variables)
            .await
    }

    /// Converts a single-use payment method into a reusable vaulted one.
    pub async fn vault(&self, single_use_payment_method_id: &str) -> GatewayResult<Value> {
        let variables = json!({
            "input": {
                "paymentMethodId": single_use_payment_method_id,
            }
        });
        self.execute("vaultPaymentMethod", VAULT_QUERY, variables)
            .await
    }

    /// Fetches a transaction node by global id, including its polymorphic
    /// payment-method snapshot.
    pub async fn fetch_transaction(&self, transaction_id: &str) -> GatewayResult<Value> {
        self.execute("transaction", TRANSACTION_QUERY, json!({ "id": transaction_id }))
            .await
    }

    /// Shared request path. A response counts as successful iff `data` is
    /// non-null AND `data[operation_name]` is non-null — the presence of an
    /// `errors` array alone does not fail a call.
    async fn execute(
        &self,
        operation_name: &str,
        query: &str,
        variables: Value,
    ) -> GatewayResult<Value> {
        let request = GraphQLRequest {
            query: query.to_string(),
            variables,
        };
        let response = self.requester.post(&self.config, &request).await?;

        let has_errors = response
            .get("errors")
            .and_then(Value::as_array)
            .is_some_and(|errors| !errors.is_empty());
        if has_errors {
            // Diagnostic only; does not affect the success check below.
            error!(
                operation = operation_name,
                request_id = ?parse_request_id(&response),
                response = %response,
                request = %serde_json::to_string(&request).unwrap_or_default(),
                "errors present on GraphQL response"
            );
        }

        let data_present = response
            .get("data")
            .and_then(|data| data.get(operation_name))
            .is_some_and(|value| !value.is_null());

        if data_present {
            Ok(response)
        } else {
            Err(GatewayError::from_response(operation_name, &response))
        }
    }
}
