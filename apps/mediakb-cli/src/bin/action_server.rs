use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info};

use mediakb_actions::{router, ActionExecutor, ActionQueryKnowledgeBase};
use mediakb_cli::{init_tracing, open_knowledge_base};
use mediakb_core::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info,tower_http=debug");
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let mut settings = config.settings()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                match args.get(i + 1).and_then(|p| p.parse::<u16>().ok()) {
                    Some(port) => { settings.server.port = port; i += 1; }
                    None => { eprintln!("Error: --port requires a number"); std::process::exit(1); }
                }
            }
            "--host" => {
                match args.get(i + 1) {
                    Some(host) => { settings.server.host = host.clone(); i += 1; }
                    None => { eprintln!("Error: --host requires a value"); std::process::exit(1); }
                }
            }
            other => { eprintln!("Unknown argument: {}", other); std::process::exit(1); }
        }
        i += 1;
    }

    let kb = open_knowledge_base(&settings)?;
    let mut executor = ActionExecutor::new();
    executor.register(Arc::new(ActionQueryKnowledgeBase::new(kb, settings.action.clone())));
    let app = router(Arc::new(executor));

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "action server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("action server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
    }
    info!("shutdown requested");
}
