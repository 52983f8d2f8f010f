//! The process-wide root-context factory is write-once, so it gets a test
//! binary of its own.

mod common;

use tether::{Chain, Context, Error, Request};

use common::*;

#[tokio::test]
async fn global_factory_seeds_every_chain_unless_overridden() {
    tether::set_root_context(|_req: &Request| Context::background().with_value("tokenA", "789"))
        .unwrap();

    let res = Chain::new().with(token_b).then(token_handler).handle(request()).await;
    assert_eq!(res.body_str(), Some("Tokens are: 789, 456"));

    let overridden = Chain::new()
        .root_context(|_req: &Request| Context::background().with_value("tokenA", "000"))
        .with(token_b)
        .then(token_handler);
    let res = overridden.handle(request()).await;
    assert_eq!(res.body_str(), Some("Tokens are: 000, 456"));

    let again = tether::set_root_context(|_req: &Request| Context::background());
    assert!(matches!(again, Err(Error::RootContextAlreadySet)));
}
