use serde_json::Value;
use url::form_urlencoded;

/// Remote statuses that count as a successful outcome on the transaction
/// page. Everything else renders as a failure.
pub const TRANSACTION_SUCCESS_STATUSES: [&str; 6] = [
    "AUTHORIZED",
    "AUTHORIZING",
    "SETTLED",
    "SETTLEMENT_PENDING",
    "SETTLING",
    "SUBMITTED_FOR_SETTLEMENT",
];

/// Result block rendered at the top of the transaction page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusResult {
    pub header: &'static str,
    pub icon: &'static str,
    pub message: String,
}

pub fn classify_status(status: &str) -> StatusResult {
    if TRANSACTION_SUCCESS_STATUSES.contains(&status) {
        StatusResult {
            header: "Sweet Success!",
            icon: "success",
            message: "Your test transaction has been successfully processed. See the Braintree API response and try again.".to_string(),
        }
    } else {
        StatusResult {
            header: "Transaction Unsuccessful",
            icon: "fail",
            message: format!(
                "Your test transaction has a status of {status}. See the Braintree API response and try again."
            ),
        }
    }
}

/// Encodes flash messages as `error` query parameters for the redirect back
/// to the payment form. The flow is stateless, so the messages ride along in
/// the Location header instead of server-side session state.
pub fn flash_query(messages: &[String]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for message in messages {
        serializer.append_pair("error", message);
    }
    serializer.finish()
}

/// Decodes flash messages from a request query string, preserving order.
pub fn parse_flash(query: &str) -> Vec<String> {
    form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == "error")
        .map(|(_, value)| value.into_owned())
        .collect()
}

const CHECKOUT_FORM_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Checkout</title>
  <style>
    body { font-family: sans-serif; margin: 2em auto; max-width: 40em; }
    .flash-error { color: #c62828; margin-bottom: 0.5em; }
    #submit-button { margin-top: 1em; }
  </style>
</head>
<body>
  <h1>Checkout</h1>
{flash}  <form id="payment-form" method="post" action="/checkouts">
    <label for="amount">Amount</label>
    <input type="text" id="amount" name="amount" value="10.00" />
    <div id="dropin-container"></div>
    <input type="hidden" id="nonce" name="payment_method_nonce" />
    <button type="submit" id="submit-button">Pay</button>
  </form>
  <script src="https://js.braintreegateway.com/web/dropin/1.33.7/js/dropin.min.js"></script>
  <script>
    var form = document.getElementById('payment-form');
    braintree.dropin.create(
      { authorization: '{client_token}', container: '#dropin-container' },
      function (createErr, instance) {
        if (createErr) { console.error(createErr); return; }
        form.addEventListener('submit', function (event) {
          event.preventDefault();
          instance.requestPaymentMethod(function (requestErr, payload) {
            if (requestErr) { console.error(requestErr); return; }
            document.getElementById('nonce').value = payload.nonce;
            form.submit();
          });
        });
      }
    );
  </script>
</body>
</html>
"#;

/// Renders the payment form with the client token embedded and any flash
/// messages listed one per line above it.
pub fn render_checkout_form(client_token: &str, flash: &[String]) -> String {
    let flash_html: String = flash
        .iter()
        .map(|message| format!("  <div class=\"flash-error\">{}</div>\n", html_escape(message)))
        .collect();

    CHECKOUT_FORM_HTML
        .replace("{flash}", &flash_html)
        .replace("{client_token}", &html_escape(client_token))
}

const TRANSACTION_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Transaction</title>
  <style>
    body { font-family: sans-serif; margin: 2em auto; max-width: 40em; }
    .result.success h1 { color: #2e7d32; }
    .result.fail h1 { color: #c62828; }
    table { border-collapse: collapse; }
    td { padding: 0.25em 1em 0.25em 0; }
  </style>
</head>
<body>
  <div class="result {icon}">
    <h1>{header}</h1>
    <p>{message}</p>
  </div>
  <table>
{rows}  </table>
  <p><a href="/checkouts/new">Make another transaction</a></p>
</body>
</html>
"#;

/// Renders the transaction status page: the classified result block plus the
/// transaction's fields and its payment-method snapshot.
pub fn render_transaction_page(transaction: &Value, result: &StatusResult) -> String {
    let mut rows = String::new();
    rows.push_str(&row("id", field(transaction, "/id")));
    rows.push_str(&row("status", field(transaction, "/status")));
    rows.push_str(&row("amount", field(transaction, "/amount/value")));
    rows.push_str(&row("currency", field(transaction, "/amount/currencyIsoCode")));
    rows.push_str(&row("created at", field(transaction, "/createdAt")));
    if let Some(snapshot) = transaction.get("paymentMethodSnapshot") {
        rows.push_str(&snapshot_rows(snapshot));
    }

    TRANSACTION_PAGE_HTML
        .replace("{icon}", result.icon)
        .replace("{header}", result.header)
        .replace("{message}", &html_escape(&result.message))
        .replace("{rows}", &rows)
}

// The snapshot shape depends on how the buyer paid; the discriminator is the
// GraphQL __typename.
fn snapshot_rows(snapshot: &Value) -> String {
    let mut rows_html = String::new();
    match snapshot.get("__typename").and_then(Value::as_str) {
        Some("CreditCardDetails") => {
            rows_html.push_str(&row("card bin", field(snapshot, "/bin")));
            rows_html.push_str(&row("brand", field(snapshot, "/brandCode")));
            rows_html.push_str(&row("cardholder", field(snapshot, "/cardholderName")));
            rows_html.push_str(&row("expiration month", field(snapshot, "/expirationMonth")));
            rows_html.push_str(&row("expiration year", field(snapshot, "/expirationYear")));
            rows_html.push_str(&row("last four", field(snapshot, "/last4")));
            rows_html.push_str(&row(
                "issuing country",
                field(snapshot, "/binData/countryOfIssuance"),
            ));
            rows_html.push_str(&row("origin", field(snapshot, "/origin/type")));
        }
        Some("PayPalTransactionDetails") => {
            rows_html.push_str(&row("payer email", field(snapshot, "/payer/email")));
            rows_html.push_str(&row("payer id", field(snapshot, "/payer/payerId")));
            rows_html.push_str(&row("payer first name", field(snapshot, "/payer/firstName")));
            rows_html.push_str(&row("payer last name", field(snapshot, "/payer/lastName")));
            rows_html.push_str(&row("payer status", field(snapshot, "/payerStatus")));
        }
        _ => {}
    }
    rows_html
}

fn row(label: &str, value: &str) -> String {
    format!(
        "    <tr><td>{}</td><td>{}</td></tr>\n",
        html_escape(label),
        html_escape(value)
    )
}

fn field<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or("")
}

pub fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
