//! Feeds the three schema topics from an in-memory backend and lets the
//! supervisor run until every stream is exhausted.
//!
//! ```bash
//! cargo run --example memory_feed
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use datasync::{
    LogOptions, MemoryBackend, Schema, Supervisor, SupervisorConfig, TopicSpec, TracingEmitter,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    LogOptions::default().build()?;

    let bus = MemoryBackend::new();
    let emitter = Arc::new(TracingEmitter::new());
    let topics: Vec<TopicSpec> = Schema::ALL
        .into_iter()
        .map(|s| TopicSpec::for_schema(s, emitter.clone()))
        .collect();

    let feeder = {
        let bus = bus.clone();
        tokio::spawn(async move {
            for height in 1..=3u64 {
                let ts = 1_700_000_000 + height;
                let txn = json!({
                    "hash": format!("0x{height:02x}"),
                    "ts": ts,
                    "function": "transfer",
                    "height": height,
                });
                let mempool = json!({
                    "txns": [{
                        "hash": format!("0xm{height}"),
                        "ts": ts,
                        "function": "swap",
                        "packing": height,
                    }],
                });
                bus.publish("txn_confirm_on_head", txn.to_string());
                bus.publish("mempool_insert", mempool.to_string());
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            bus.publish("mempool_confirm", "not json");
            bus.close_all();
        })
    };

    let reason = Supervisor::builder(SupervisorConfig::default(), Arc::new(bus))
        .build()
        .run(topics)
        .await?;
    feeder.await?;
    println!("stopped: {}", reason.as_label());
    Ok(())
}
