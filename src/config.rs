use clap::Args;

pub const SANDBOX_ENDPOINT: &str = "https://payments.sandbox.braintree-api.com/graphql";

/// Connection settings for the remote payment GraphQL API.
///
/// Read once at startup; the process refuses to start when a required value
/// is missing from both the environment and the command line.
#[derive(Args, Clone, Debug)]
pub struct GatewayConfig {
    /// GraphQL endpoint operations are posted to
    #[arg(long, env = "BT_ENDPOINT", default_value = SANDBOX_ENDPOINT)]
    pub endpoint: String,

    /// Value for the Braintree-Version header, e.g. 2019-01-01
    #[arg(long, env = "BT_VERSION")]
    pub version: String,

    /// Public key, sent as the basic-auth username
    #[arg(long, env = "BT_PUBLIC_KEY")]
    pub public_key: String,

    /// Private key, sent as the basic-auth password
    #[arg(long, env = "BT_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,
}
