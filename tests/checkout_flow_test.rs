use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http_body_util::{BodyExt, Full, combinators::BoxBody};
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use tillgate::{GatewayConfig, HttpRequester, PaymentGateway, server};

#[derive(Clone, Debug)]
struct RecordedCall {
    version: Option<String>,
    authorization: Option<String>,
    body: Value,
}

type CallLog = Arc<Mutex<Vec<RecordedCall>>>;

fn full_body(value: String) -> BoxBody<Bytes, hyper::Error> {
    Full::new(Bytes::from(value))
        .map_err(|never| match never {})
        .boxed()
}

fn successful_transaction() -> Value {
    json!({
        "data": {
            "transaction": {
                "id": "my_id",
                "amount": {"value": "12.12", "currencyIsoCode": "CAD"},
                "status": "SUBMITTED_FOR_SETTLEMENT",
                "createdAt": "2019-08-07T15:47:54.000000Z",
                "paymentMethodSnapshot": {
                    "__typename": "CreditCardDetails",
                    "bin": "545454",
                    "brandCode": "MASTERCARD",
                    "cardholderName": "Billy Bobby Pins",
                    "expirationMonth": "12",
                    "expirationYear": "2020",
                    "last4": "4444",
                    "binData": {"countryOfIssuance": "USA"},
                    "origin": null,
                },
            }
        },
        "extensions": {"requestId": "abc-request-123-id"}
    })
}

fn declined_transaction() -> Value {
    json!({
        "data": {
            "transaction": {
                "id": "spaceodyssey",
                "amount": {"value": "2001.00", "currencyIsoCode": "USD"},
                "status": "PROCESSOR_DECLINED",
                "paymentMethodSnapshot": {
                    "__typename": "CreditCardDetails",
                    "bin": "545454",
                    "brandCode": "MASTERCARD",
                    "cardholderName": "Billy Bobby Pins",
                    "expirationMonth": "12",
                    "expirationYear": "2020",
                    "last4": "4444",
                    "binData": {"countryOfIssuance": "USA"},
                    "origin": null,
                },
            }
        },
        "extensions": {"requestId": "def-request-456-id"}
    })
}

// A stand-in for the remote GraphQL API: inspects the posted document and
// variables and answers with canned envelopes.
async fn remote_response(
    req: Request<hyper::body::Incoming>,
    calls: CallLog,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, std::convert::Infallible> {
    let version = req
        .headers()
        .get("Braintree-Version")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let authorization = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = req.collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    calls.lock().unwrap().push(RecordedCall {
        version,
        authorization,
        body: body.clone(),
    });

    let query = body["query"].as_str().unwrap_or("");
    let envelope = if query.contains("createClientToken") {
        json!({"data": {"createClientToken": {"clientToken": "your_client_token"}}})
    } else if query.contains("chargePaymentMethod") {
        match body
            .pointer("/variables/input/transaction/amount")
            .and_then(Value::as_str)
        {
            Some("10.00") => json!({"data": {"chargePaymentMethod": {"transaction": {"id": "my_id"}}}}),
            _ => json!({
                "data": null,
                "errors": [{
                    "message": "Variable 'amount' has an invalid value. Values of type Amount must contain exactly 0, 2 or 3 decimal places.",
                    "locations": [{"line": 1, "column": 11}]
                }],
                "extensions": {"requestId": "jkl-request-012-id"}
            }),
        }
    } else if query.contains("node(") {
        match body.pointer("/variables/id").and_then(Value::as_str) {
            Some("spaceodyssey") => declined_transaction(),
            _ => successful_transaction(),
        }
    } else if query.contains("ping") {
        json!({"data": {"ping": "pong"}})
    } else {
        json!({"data": null})
    };

    Ok(Response::builder()
        .header("Content-Type", "application/json")
        .body(full_body(envelope.to_string()))
        .unwrap())
}

async fn spawn_remote() -> (SocketAddr, CallLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));

    let log = calls.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let io = TokioIo::new(stream);
            let log = log.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req| remote_response(req, log.clone()));
                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(io, service)
                    .await;
            });
        }
    });

    (addr, calls)
}

async fn spawn_app(remote: SocketAddr) -> String {
    let config = GatewayConfig {
        endpoint: format!("http://{remote}/graphql"),
        version: "2019-01-01".to_string(),
        public_key: "public_key".to_string(),
        private_key: "private_key".to_string(),
    };
    let gateway = Arc::new(PaymentGateway::new(config, Box::new(HttpRequester::new())));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, gateway));

    format!("http://{addr}")
}

fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn root_redirects_to_the_payment_form() {
    let (remote, _) = spawn_remote().await;
    let base = spawn_app(remote).await;

    let response = no_redirect_client()
        .get(format!("{base}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 302);
    assert_eq!(response.headers()["location"], "/checkouts/new");
}

#[tokio::test]
async fn payment_form_embeds_the_client_token() {
    let (remote, _) = spawn_remote().await;
    let base = spawn_app(remote).await;

    let response = no_redirect_client()
        .get(format!("{base}/checkouts/new"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("your_client_token"));
}

#[tokio::test]
async fn a_charge_redirects_to_the_transaction_page() {
    let (remote, _) = spawn_remote().await;
    let base = spawn_app(remote).await;

    let response = no_redirect_client()
        .post(format!("{base}/checkouts"))
        .form(&[
            ("payment_method_nonce", "fake-valid-nonce"),
            ("amount", "10.00"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 302);
    assert_eq!(response.headers()["location"], "/checkouts/my_id");
}

#[tokio::test]
async fn an_invalid_amount_flashes_the_remote_message_on_the_form() {
    let (remote, _) = spawn_remote().await;
    let base = spawn_app(remote).await;
    let client = no_redirect_client();

    let response = client
        .post(format!("{base}/checkouts"))
        .form(&[
            ("payment_method_nonce", "fake-valid-nonce"),
            ("amount", "nine and three quarters"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 302);
    let location = response.headers()["location"].to_str().unwrap().to_string();
    assert!(location.starts_with("/checkouts/new?"), "{location}");

    let form = client.get(format!("{base}{location}")).send().await.unwrap();
    let body = form.text().await.unwrap();
    assert!(body.contains(
        "Error: Variable 'amount' has an invalid value. Values of type Amount must contain exactly 0, 2 or 3 decimal places."
    ));
    assert_eq!(body.matches("class=\"flash-error\"").count(), 1);
}

#[tokio::test]
async fn a_successful_transaction_page_shows_the_result_and_fields() {
    let (remote, _) = spawn_remote().await;
    let base = spawn_app(remote).await;

    let response = no_redirect_client()
        .get(format!("{base}/checkouts/my_id"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    for expected in [
        "Sweet Success!",
        "my_id",
        "12.12",
        "CAD",
        "SUBMITTED_FOR_SETTLEMENT",
        "545454",
        "4444",
        "Billy Bobby Pins",
        "2020",
        "USA",
    ] {
        assert!(body.contains(expected), "missing {expected}");
    }
}

#[tokio::test]
async fn a_declined_transaction_page_shows_the_failure_result() {
    let (remote, _) = spawn_remote().await;
    let base = spawn_app(remote).await;

    let response = no_redirect_client()
        .get(format!("{base}/checkouts/spaceodyssey"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Transaction Unsuccessful"));
    assert!(body.contains("has a status of PROCESSOR_DECLINED"));
}

#[tokio::test]
async fn health_reports_ok_when_the_remote_answers() {
    let (remote, _) = spawn_remote().await;
    let base = spawn_app(remote).await;

    let response = no_redirect_client()
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), r#"{"status":"ok"}"#);
}

#[tokio::test]
async fn outbound_calls_carry_version_and_basic_auth() {
    let (remote, calls) = spawn_remote().await;
    let base = spawn_app(remote).await;

    no_redirect_client()
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap();

    let calls = calls.lock().unwrap();
    let call = calls.last().expect("remote should have been called");
    assert!(call.body["query"].as_str().unwrap_or("").contains("ping"));
    assert_eq!(call.version.as_deref(), Some("2019-01-01"));
    assert!(
        call.authorization
            .as_deref()
            .unwrap_or("")
            .starts_with("Basic "),
        "{:?}",
        call.authorization
    );
}

#[tokio::test]
async fn transport_failures_surface_as_bad_gateway() {
    // Bind then drop so nothing is listening on the remote side.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = listener.local_addr().unwrap();
    drop(listener);

    let base = spawn_app(dead_addr).await;

    let response = no_redirect_client()
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn unknown_routes_return_not_found() {
    let (remote, _) = spawn_remote().await;
    let base = spawn_app(remote).await;

    let response = no_redirect_client()
        .get(format!("{base}/nope"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}
