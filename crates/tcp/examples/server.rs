use std::error::Error;
use std::sync::Arc;

use http::HeaderValue;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use quasi_http::connection::Server;
use quasi_http::handler::make_handler;
use quasi_http::protocol::{Body, Request, Response};
use quasi_http_tcp::{TcpServer, TcpServerTransport};

async fn hello_world(request: Request) -> Result<Response, Box<dyn Error + Send + Sync>> {
    info!(method = %request.method, target = %request.target, "handling request");

    let body = "Hello World!\n";
    let mut response = Response::new(200);
    response.headers.append("content-type", HeaderValue::from_static("text/plain"));
    response.content_length = body.len() as i64;
    response.body = Some(Body::from_bytes(body));
    Ok(response)
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let server = Arc::new(Server::new(Arc::new(make_handler(hello_world)), Arc::new(TcpServerTransport)));
    let tcp_server = TcpServer::bind("127.0.0.1:5100", server).await.expect("bind server");
    tcp_server.serve().await.expect("serve");
}
