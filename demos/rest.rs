//! REST service - example of publishing handlers over HTTP.
//!
//! This example demonstrates:
//! - Registering GET handlers reading an integer or hex path parameter
//! - Registering a POST handler taking a JSON body
//! - Serving the REST router with axum
//!
//! ```text
//! RUST_LOG=debug cargo run --example rest
//!
//! curl http://127.0.0.1:7003/v3/chain/block/42
//! curl http://127.0.0.1:7003/v3/chain/GetBlockByHash/000000000000002a
//! curl -H 'Content-Type: application/json' -d '{"data":"hi"}' http://127.0.0.1:7003/v3/chain/Submit
//! ```

use axum::http::Method;
use serde::{Deserialize, Serialize};
use service_dispatch::codec::base64_bytes;
use service_dispatch::{RestRoute, ServiceProcessor};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Deserialize, Debug)]
struct GetBlock {
    index: u64,
}

#[derive(Deserialize, Debug)]
struct GetBlockByHash {
    #[serde(with = "base64_bytes")]
    hash: Vec<u8>,
}

#[derive(Deserialize, Debug)]
struct Submit {
    data: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct Block {
    index: u64,
    #[serde(with = "base64_bytes")]
    hash: Vec<u8>,
    data: String,
}

#[derive(Debug)]
struct NotFound;

impl std::fmt::Display for NotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("block not found")
    }
}

impl std::error::Error for NotFound {}

fn block(index: u64, data: impl Into<String>) -> Block {
    Block {
        index,
        hash: index.to_be_bytes().to_vec(),
        data: data.into(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut processor = ServiceProcessor::new().max_rest_body(64 * 1024);

    processor.register_rest_handler(
        |req: GetBlock| Ok::<_, NotFound>(block(req.index, "genesis")),
        RestRoute::new(3, "chain", Method::GET).resource("block"),
    )?;
    processor.register_rest_handler(
        |req: GetBlockByHash| match <[u8; 8]>::try_from(req.hash.as_slice()) {
            Ok(bytes) => Ok(block(u64::from_be_bytes(bytes), "by hash")),
            Err(_) => Err(NotFound),
        },
        RestRoute::new(3, "chain", Method::GET),
    )?;
    processor.register_rest_handler(
        |req: Submit| Ok::<_, NotFound>(block(0, req.data)),
        RestRoute::new(3, "chain", Method::POST),
    )?;

    for path in processor.rest().paths() {
        println!("serving {path}");
    }

    let listener = TcpListener::bind("127.0.0.1:7003").await?;
    axum::serve(listener, processor.rest_router()).await?;

    Ok(())
}
