//! Minimal tether demo: context tokens, basic auth, and panic recovery.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example tokens
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl -u user:pass http://localhost:3000/
//!   curl -u user:pass http://localhost:3000/panic

use http::StatusCode;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tether::{Chain, Context, Endpoint, Next, Request, Response, adapt, middleware};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    tether::set_root_context(|req: &Request| {
        Context::background().with_value("path", req.path().to_owned())
    })?;

    let app = Chain::new()
        .with(middleware::Trace)
        .with(middleware::recover())
        .with(adapt(basic_auth))
        .with(token)
        .then_func(hello);

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    info!(addr = %listener.local_addr()?, "tether demo listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let app = app.clone();
        tokio::spawn(async move {
            if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), app)
                .await
            {
                error!(peer = %peer, "connection error: {e}");
            }
        });
    }
}

// Context-unaware: it only wraps one endpoint in another.
fn basic_auth(inner: Endpoint) -> Endpoint {
    Endpoint::new(move |req: Request| async move {
        match req.basic_auth() {
            Some((user, pass)) if user == "user" && pass == "pass" => inner.call(req).await,
            _ => Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .header("www-authenticate", r#"Basic realm="tether""#)
                .text("Unauthorized\n"),
        }
    })
}

fn token(ctx: Context, next: Next) -> Endpoint {
    Endpoint::new(move |req: Request| next.run(ctx.with_value("token", "123"), req))
}

async fn hello(ctx: Context, req: Request) -> String {
    if req.path() == "/panic" {
        panic!("asked to panic");
    }
    let path = ctx.value::<String>("path").map(String::as_str).unwrap_or("?");
    let token = ctx.value::<&str>("token").copied().unwrap_or("none");
    format!("path={path} token={token}\n")
}
