pub mod checkout;
pub mod config;
pub mod error;
pub mod payment_gateway;
pub mod requester;
pub mod server;

pub use checkout::StatusResult;
pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use payment_gateway::PaymentGateway;
pub use requester::{GraphQLRequester, HttpRequester};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One GraphQL operation on the wire: `{"query": ..., "variables": ...}`.
/// Built fresh per call and never mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphQLRequest {
    pub query: String,
    pub variables: Value,
}
