//! Echo service - simple request/response example.
//!
//! This example demonstrates:
//! - Registering a unary handler with typed input/output
//! - Dispatching MessagePack payloads by route key
//! - What the caller sees for handler errors and unknown routes
//!
//! ```text
//! RUST_LOG=debug cargo run --example echo
//! ```

use serde::{Deserialize, Serialize};
use service_dispatch::codec::MsgPackCodec;
use service_dispatch::ServiceProcessor;
use tracing_subscriber::EnvFilter;

/// Input structure for the echo route.
#[derive(Serialize, Deserialize, Debug)]
struct Echo {
    message: String,
}

/// Reply structure for the echo route.
#[derive(Serialize, Deserialize, Debug)]
struct EchoReply {
    echo: String,
}

#[derive(Debug)]
struct EmptyMessage;

impl std::fmt::Display for EmptyMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("message must not be empty")
    }
}

impl std::error::Error for EmptyMessage {}

fn echo(req: Echo) -> Result<EchoReply, EmptyMessage> {
    if req.message.is_empty() {
        return Err(EmptyMessage);
    }
    Ok(EchoReply { echo: req.message })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut processor = ServiceProcessor::new();
    processor.register_handler(echo)?;

    for message in ["hello", ""] {
        let payload = MsgPackCodec::encode(&Echo {
            message: message.to_string(),
        })?;
        match processor.dispatch("Echo", &payload) {
            Ok(response) => {
                if let Some(buf) = response.into_reply() {
                    let reply: EchoReply = MsgPackCodec::decode(&buf)?;
                    println!("reply: {reply:?}");
                }
            }
            Err(e) => println!("error: {e}"),
        }
    }

    // unknown route keys fail before any handler runs
    if let Err(e) = processor.dispatch("Shout", &[]) {
        println!("error: {e}");
    }

    Ok(())
}
