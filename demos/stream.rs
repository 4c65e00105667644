//! Stream service - example of streaming replies through a tunnel.
//!
//! This example demonstrates:
//! - Creating a streaming handler with `HandlerStream::channel`
//! - Reading encoded items from the `StreamingTunnel`
//! - Cancelling a stream early and watching the handler stop
//!
//! ```text
//! RUST_LOG=debug cargo run --example stream
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use service_dispatch::codec::MsgPackCodec;
use service_dispatch::{HandlerStream, ServiceProcessor};
use tracing_subscriber::EnvFilter;

/// Input structure for the generate route.
#[derive(Serialize, Deserialize, Debug)]
struct Generate {
    count: u32,
}

/// Item sent on the stream.
#[derive(Serialize, Deserialize, Debug)]
struct Chunk {
    index: u32,
    data: String,
}

#[derive(Debug)]
struct TooMany(u32);

impl std::fmt::Display for TooMany {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "refusing to generate {} chunks", self.0)
    }
}

impl std::error::Error for TooMany {}

fn generate(req: Generate) -> Result<HandlerStream<Chunk>, TooMany> {
    if req.count > 1000 {
        return Err(TooMany(req.count));
    }

    let (mut sender, stream) = HandlerStream::channel(8);
    tokio::spawn(async move {
        for index in 0..req.count {
            if sender.is_cancelled() {
                println!("handler: cancelled after {index} chunks");
                break;
            }
            let chunk = Chunk {
                index,
                data: format!("Chunk {index}"),
            };
            if sender.send(chunk).await.is_err() {
                break;
            }

            // Simulate some work
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        // dropping the sender ends the stream
    });
    Ok(stream)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut processor = ServiceProcessor::new().stream_capacity(16);
    processor.register_streaming_handler(generate)?;

    // Read a stream to the end
    let payload = MsgPackCodec::encode(&Generate { count: 5 })?;
    if let Some(mut tunnel) = processor.dispatch("Generate", &payload)?.into_stream() {
        while let Some(buf) = tunnel.recv().await {
            let chunk: Chunk = MsgPackCodec::decode(&buf)?;
            println!("chunk: {chunk:?}");
        }
        println!("stream ended: {:?}", tunnel.finish().await?);
    }

    // Walk away after three chunks
    let payload = MsgPackCodec::encode(&Generate { count: 100 })?;
    if let Some(mut tunnel) = processor.dispatch("Generate", &payload)?.into_stream() {
        for _ in 0..3 {
            tunnel.recv().await;
        }
        tunnel.cancel();
        println!("stream ended: {:?}", tunnel.finish().await?);
    }

    Ok(())
}
