#![allow(dead_code)]

use bytes::Bytes;
use http::StatusCode;
use tether::{Context, Endpoint, Next, Request, Response};

pub fn request() -> Request {
    Request::from(http::Request::builder().uri("/").body(Bytes::new()).unwrap())
}

/// "user:pass"
pub const USER_PASS: &str = "Basic dXNlcjpwYXNz";

pub fn request_with_auth(value: &str) -> Request {
    Request::from(
        http::Request::builder()
            .uri("/")
            .header("authorization", value)
            .body(Bytes::new())
            .unwrap(),
    )
}

pub fn token_a(ctx: Context, next: Next) -> Endpoint {
    Endpoint::new(move |req: Request| next.run(ctx.with_value("tokenA", "123"), req))
}

pub fn token_b(ctx: Context, next: Next) -> Endpoint {
    Endpoint::new(move |req: Request| next.run(ctx.with_value("tokenB", "456"), req))
}

pub fn token_handler(ctx: Context) -> Endpoint {
    Endpoint::new(move |_req: Request| async move {
        let a = ctx.value::<&str>("tokenA").copied().unwrap_or("<nil>");
        let b = ctx.value::<&str>("tokenB").copied().unwrap_or("<nil>");
        format!("Tokens are: {a}, {b}")
    })
}

pub fn auth_handler(_ctx: Context) -> Endpoint {
    Endpoint::new(|req: Request| async move {
        let (user, pass) = req.basic_auth().unwrap_or_default();
        format!("Hello: {user}, {pass}")
    })
}

/// A context-unaware basic-auth guard, the way third-party auth wrappers
/// are usually written: it only knows how to wrap one endpoint in another.
pub fn simple_basic_auth(user: &'static str, pass: &'static str) -> impl Fn(Endpoint) -> Endpoint + Send + Sync + 'static {
    move |inner: Endpoint| {
        Endpoint::new(move |req: Request| async move {
            match req.basic_auth() {
                Some((u, p)) if u == user && p == pass => inner.call(req).await,
                _ => Response::builder()
                    .status(StatusCode::UNAUTHORIZED)
                    .header("www-authenticate", r#"Basic realm="Restricted""#)
                    .text("Unauthorized\n"),
            }
        })
    }
}
