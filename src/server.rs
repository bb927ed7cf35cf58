use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, combinators::BoxBody};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::error;
use url::form_urlencoded;

use crate::checkout;
use crate::error::GatewayError;
use crate::payment_gateway::PaymentGateway;

// Create a response body from a string
fn full<T: Into<Bytes>>(value: T) -> BoxBody<Bytes, hyper::Error> {
    Full::new(value.into())
        .map_err(|never| match never {})
        .boxed()
}

pub async fn handle_request(
    req: Request<Incoming>,
    gateway: Arc<PaymentGateway>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or("").to_string();

    let result = match (&method, path.as_str()) {
        (&Method::GET, "/") => redirect("/checkouts/new"),

        (&Method::GET, "/health") => health(&gateway).await,

        (&Method::GET, "/checkouts/new") => new_checkout(&query, &gateway).await,

        (&Method::POST, "/checkouts") => create_checkout(req, &gateway).await,

        (&Method::GET, path) if path.starts_with("/checkouts/") => {
            let id = path.trim_start_matches("/checkouts/");
            show_checkout(id, &gateway).await
        }

        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(full("Not Found"))
            .unwrap_or_else(|_| internal_server_error()),
    };

    Ok(result)
}

// Renders the payment form. The client token bootstraps the browser-side
// drop-in form; flash messages from a failed attempt arrive in the query
// string.
async fn new_checkout(
    query: &str,
    gateway: &PaymentGateway,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    let flash = checkout::parse_flash(query);
    match gateway.create_client_token().await {
        Ok(response) => {
            let client_token = response
                .pointer("/data/createClientToken/clientToken")
                .and_then(Value::as_str)
                .unwrap_or("");
            html(checkout::render_checkout_form(client_token, &flash))
        }
        Err(err) => {
            error!(error = %err, "failed to create client token");
            internal_server_error()
        }
    }
}

async fn create_checkout(
    req: Request<Incoming>,
    gateway: &PaymentGateway,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    let body_bytes = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return bad_request("Failed to read request body"),
    };

    let mut payment_method_nonce = None;
    let mut amount = None;
    for (key, value) in form_urlencoded::parse(&body_bytes) {
        match key.as_ref() {
            "payment_method_nonce" => payment_method_nonce = Some(value.into_owned()),
            "amount" => amount = Some(value.into_owned()),
            _ => {}
        }
    }
    let (Some(nonce), Some(amount)) = (payment_method_nonce, amount) else {
        return bad_request("Missing payment_method_nonce or amount");
    };

    match gateway.charge(&nonce, &amount).await {
        Ok(response) => {
            match response
                .pointer("/data/chargePaymentMethod/transaction/id")
                .and_then(Value::as_str)
            {
                Some(id) => redirect(&format!("/checkouts/{id}")),
                // The charge key was present but carried no transaction id;
                // normalize it like any other failed operation.
                None => flash_redirect(&GatewayError::from_response(
                    "chargePaymentMethod",
                    &response,
                )),
            }
        }
        Err(err) => failure_response(err),
    }
}

async fn show_checkout(
    id: &str,
    gateway: &PaymentGateway,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    match gateway.fetch_transaction(id).await {
        Ok(response) => {
            let transaction = response
                .pointer("/data/transaction")
                .cloned()
                .unwrap_or(Value::Null);
            let status = transaction
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("");
            let result = checkout::classify_status(status);
            html(checkout::render_transaction_page(&transaction, &result))
        }
        Err(err) => failure_response(err),
    }
}

async fn health(gateway: &PaymentGateway) -> Response<BoxBody<Bytes, hyper::Error>> {
    match gateway.ping().await {
        Ok(_) => Response::builder()
            .header("Content-Type", "application/json")
            .body(full(r#"{"status":"ok"}"#))
            .unwrap_or_else(|_| internal_server_error()),
        Err(err) => {
            error!(error = %err, "health check against payment API failed");
            bad_gateway()
        }
    }
}

// Remote failures flash back to the form; transport failures never reach end
// users as messages.
fn failure_response(err: GatewayError) -> Response<BoxBody<Bytes, hyper::Error>> {
    match err {
        GatewayError::Remote { .. } => flash_redirect(&err),
        GatewayError::Transport(_) => {
            error!(error = %err, "transport failure talking to payment API");
            bad_gateway()
        }
    }
}

fn flash_redirect(err: &GatewayError) -> Response<BoxBody<Bytes, hyper::Error>> {
    let query = checkout::flash_query(err.messages());
    redirect(&format!("/checkouts/new?{query}"))
}

fn redirect(location: &str) -> Response<BoxBody<Bytes, hyper::Error>> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header("Location", location)
        .body(full(""))
        .unwrap_or_else(|_| internal_server_error())
}

fn html(page: String) -> Response<BoxBody<Bytes, hyper::Error>> {
    Response::builder()
        .header("Content-Type", "text/html; charset=utf-8")
        .body(full(page))
        .unwrap_or_else(|_| internal_server_error())
}

fn bad_request(message: &str) -> Response<BoxBody<Bytes, hyper::Error>> {
    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .body(full(message.to_string()))
        .unwrap_or_else(|_| internal_server_error())
}

fn bad_gateway() -> Response<BoxBody<Bytes, hyper::Error>> {
    Response::builder()
        .status(StatusCode::BAD_GATEWAY)
        .body(full("Payment API unavailable"))
        .unwrap_or_else(|_| internal_server_error())
}

// Create a standard internal server error response
fn internal_server_error() -> Response<BoxBody<Bytes, hyper::Error>> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .body(full("Internal Server Error"))
        .unwrap()
}

#[derive(Clone)]
// An Executor that uses the tokio runtime.
pub struct TokioExecutor;

impl<F> hyper::rt::Executor<F> for TokioExecutor
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    fn execute(&self, fut: F) {
        tokio::task::spawn(fut);
    }
}

/// Accept loop: one connection task per socket, each holding a handle to the
/// shared gateway.
pub async fn serve(listener: TcpListener, gateway: Arc<PaymentGateway>) -> std::io::Result<()> {
    loop {
        let (stream, _addr) = listener.accept().await?;
        let io = TokioIo::new(stream);

        let gateway_clone = Arc::clone(&gateway);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let gateway = gateway_clone.clone();
                handle_request(req, gateway)
            });

            if let Err(e) = hyper_util::server::conn::auto::Builder::new(TokioExecutor)
                .serve_connection(io, service)
                .await
            {
                error!(error = %e, "error processing connection");
            }
        });
    }
}
