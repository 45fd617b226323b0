use std::sync::Arc;

use http::HeaderValue;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use quasi_http::connection::Client;
use quasi_http::protocol::Request;
use quasi_http_tcp::TcpClientTransport;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let client = Client::new(Arc::new(TcpClientTransport));

    let mut request = Request::new("GET", "/");
    request.headers.append("accept", HeaderValue::from_static("text/plain"));

    let mut response = client.send("127.0.0.1:5100", request, None).await.expect("exchange failed");
    info!(status = response.status_code, "received response");

    let body = response.body.take().expect("response body").collect().await.expect("read body");
    print!("{}", String::from_utf8_lossy(&body));
    response.release();
}
