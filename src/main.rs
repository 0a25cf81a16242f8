use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{Instrument, debug, info};

use datasync::{
    BackendConfig, LogOptions, Schema, Supervisor, SupervisorConfig, TopicSpec, TracingEmitter,
    WsBackend,
};

#[derive(Parser, Debug)]
#[command(name = "datasync")]
#[command(about = "Subscribe to chain data topics and log every record")]
struct Args {
    /// Messaging endpoint; `{topic}` is replaced by the topic name, otherwise `/<topic>` is appended
    #[arg(long, env = "DATASYNC_ENDPOINT", default_value = "ws://127.0.0.1:8080")]
    endpoint: String,

    /// Topic to subscribe to (repeatable); defaults to every known topic
    #[arg(long = "topic")]
    topics: Vec<String>,

    /// Connect timeout per topic in milliseconds (0 = no timeout)
    #[arg(long, default_value = "5000")]
    connect_timeout_ms: u64,

    /// Maximum wait for receive loops after shutdown begins, in milliseconds
    #[arg(long, default_value = "10000")]
    grace_ms: u64,

    #[command(flatten)]
    log: LogOptions,
}

fn topic_specs(names: &[String]) -> Result<Vec<TopicSpec>> {
    let emitter = Arc::new(TracingEmitter::new());
    if names.is_empty() {
        return Ok(Schema::ALL
            .iter()
            .map(|s| TopicSpec::for_schema(*s, emitter.clone()))
            .collect());
    }
    names
        .iter()
        .map(|name| match Schema::from_topic(name) {
            Some(schema) => Ok(TopicSpec::for_schema(schema, emitter.clone())),
            None => bail!("unknown topic {name:?}"),
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = Args::parse();

    let errs = args.log.validate();
    if !errs.is_empty() {
        let text: Vec<String> = errs.iter().map(ToString::to_string).collect();
        bail!("invalid log options: {}", text.join("; "));
    }
    args.log.complete();
    args.log.build().context("failed to set up logging")?;

    let topics = topic_specs(&args.topics)?;
    let backend = WsBackend::new(BackendConfig {
        endpoint: args.endpoint.clone(),
        connect_timeout: Duration::from_millis(args.connect_timeout_ms),
    });
    let cfg = SupervisorConfig {
        grace: Duration::from_millis(args.grace_ms),
    };

    info!(endpoint = %args.endpoint, topics = topics.len(), log = %args.log, "starting datasync");
    let reason = Supervisor::builder(cfg, Arc::new(backend))
        .build()
        .run(topics)
        .instrument(args.log.root_span())
        .await?;
    debug!(reason = reason.as_label(), "datasync exited");
    Ok(())
}
