//! # nanorpc CLI Entry Point
//!
//! Main binary of the nanorpc demo system. Runs demo services and calls
//! them.
//!
//! ## Usage
//!
//! ```bash
//! # All services in one process, svc2 exposed on port 8000
//! nanorpc serve -l svc1 -l svc2 -l svc3 -l svc4 -e svc2
//!
//! # svc1 in a separate process
//! nanorpc serve -b 127.0.0.1:8001 -l svc1
//! nanorpc serve -l svc2 -l svc3 -l svc4 -r svc1=127.0.0.1:8001 -e svc2
//!
//! # Call svc2
//! nanorpc call --addr 127.0.0.1:8000 --req getreq
//! ```

use anyhow::Result;
use argh::FromArgs;
use nanorpc_cli::node::{self, DemoRequest, NodeConfig};
use nanorpc_common::transport::Protocol;
use nanorpc_server::{run_server, Listener};

/// Main CLI structure parsed from command-line arguments.
#[derive(FromArgs)]
/// nanorpc - demo services over a tiny service runtime
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Call(CallArgs),
}

/// Arguments for running a node.
///
/// # Example
///
/// ```bash
/// nanorpc serve -b 0.0.0.0:8000 -l svc2 -l svc3 -l svc4 -r svc1=svc1:8000
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// run demo services
struct ServeArgs {
    /// address to bind the HTTP listener to
    #[argh(option, short = 'b', default = "\"0.0.0.0:8000\".into()")]
    bind: String,

    /// wire protocol: json or postcard
    #[argh(option, short = 'p', default = "Protocol::Json")]
    protocol: Protocol,

    /// serve endpoints at the root instead of under /<service name>
    #[argh(switch)]
    no_prefix: bool,

    /// service to run in this process
    ///
    /// Can be specified multiple times.
    #[argh(option, short = 'l', long = "local")]
    local: Vec<String>,

    /// service running elsewhere, as name=host:port
    ///
    /// Can be specified multiple times.
    #[argh(option, short = 'r', long = "remote")]
    remote: Vec<String>,

    /// local service to expose over HTTP
    ///
    /// Can be specified multiple times. Defaults to every local service.
    #[argh(option, short = 'e', long = "expose")]
    expose: Vec<String>,
}

/// Arguments for calling `svc2`.
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// send one request to svc2
struct CallArgs {
    /// host:port of the node exposing svc2
    #[argh(option, short = 'a', default = "\"127.0.0.1:8000\".into()")]
    addr: String,

    /// the request to send: req or getreq
    #[argh(option, default = "DemoRequest::Req")]
    req: DemoRequest,

    /// wire protocol: json or postcard
    #[argh(option, short = 'p', default = "Protocol::Json")]
    protocol: Protocol,

    /// call endpoints at the root instead of under /svc2
    #[argh(switch)]
    no_prefix: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Set default log level to INFO, but allow RUST_LOG env var to override
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Call(args) => run_call(args).await,
    }
}

fn node_config(args: ServeArgs) -> Result<NodeConfig> {
    let remote = args
        .remote
        .iter()
        .map(|arg| node::parse_remote(arg))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NodeConfig {
        bind_addr: args.bind,
        protocol: args.protocol,
        prefix_url_path: !args.no_prefix,
        local: args.local,
        remote,
        expose: args.expose,
    })
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let cfg = node_config(args)?;
    if cfg.local.is_empty() {
        anyhow::bail!("No local services specified! Use --local <name> to add services.");
    }

    tracing::info!("Starting nanorpc node");
    tracing::info!("Local services: {:?}", cfg.local);
    tracing::info!("Remote services: {:?}", cfg.remote);
    tracing::info!("Protocol: {}", cfg.protocol);

    let registry = cfg.registry().await?;
    let listeners: Vec<Box<dyn Listener>> = vec![Box::new(cfg.listener())];

    tokio::select! {
        result = run_server(&registry, listeners) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }
    Ok(())
}

async fn run_call(args: CallArgs) -> Result<()> {
    tracing::info!("req={:?}", args.req);

    let value = node::call_svc2(&args.addr, args.protocol, !args.no_prefix, args.req)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("{}", value);
    Ok(())
}
