//! main - runs a standalone SGW

use anyhow::Result;
use async_channel::Receiver;
use async_std::channel::Sender;
use async_std::prelude::*;
use clap::Parser;
use epc::{Interface, NodeService, Sgw, SgwConfig};
use signal_hook::consts::signal::*;
use signal_hook_async_std::Signals;
use slog::{Drain, Logger, info, o, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SGW configuration file.  This gives the local S11, S1-U and S5 addresses, the PGW
    /// address and the S1-U address of the gNB serving each cell.  The SGW binds UDP port
    /// 2123 (for GTP-C) on its S11 and S5 addresses and UDP port 2152 (for GTP-U) on its
    /// S1-U and S5 addresses.
    #[arg(long, default_value = "sgw.toml")]
    config: String,

    /// Log filter used when RUST_LOG is not set, for example "debug" to see every GTP-C
    /// message.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[async_std::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    exit_on_panic();
    let logger = init_logging(&args.log_level);

    let config: SgwConfig = epc::load_config_file(&args.config, &logger)?;
    config.validate()?;
    info!(
        &logger,
        "SGW with {} gNBs, PGW at {}",
        config.gnbs.len(),
        config.pgw_addr
    );

    let interfaces = [
        (Interface::S11, config.s11_addr),
        (Interface::S1u, config.s1u_addr),
        (Interface::S5c, config.s5_addr),
        (Interface::S5u, config.s5_addr),
    ];
    let sgw_logger = logger.new(o!("node" => "sgw"));
    let service = NodeService::start(
        &interfaces,
        move |transport| Sgw::new(config, transport, sgw_logger),
        logger.clone(),
    )?;

    match wait_for_signal(service.stopped(), &logger).await? {
        0 => warn!(&logger, "SGW stopped by itself"),
        signal => info!(&logger, "Caught signal {signal}"),
    }
    service.graceful_shutdown().await
}

fn init_logging(default_filter: &str) -> Logger {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", default_filter) }
    }
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog_envlogger::new(drain);
    slog::Logger::root(drain, o!())
}

fn exit_on_panic() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_hook(info);
        std::process::exit(1);
    }));
}

/// Returns the terminating signal, or 0 if the node stopped first.
async fn wait_for_signal(node_stopped: Receiver<()>, logger: &Logger) -> Result<i32> {
    let signals = Signals::new([SIGHUP, SIGTERM, SIGINT, SIGQUIT])?;
    let handle = signals.handle();
    let (sender, receiver) = async_std::channel::bounded(2);
    let signals_task = async_std::task::spawn(forward_signals(signals, sender.clone(), logger.clone()));
    let watch_task = async_std::task::spawn(async move {
        // Closes rather than receives.
        let _ = node_stopped.recv().await;
        let _ = sender.send(0).await;
    });

    let signal = receiver.recv().await?;
    handle.close();
    signals_task.await;
    watch_task.cancel().await;
    Ok(signal)
}

async fn forward_signals(signals: Signals, sender: Sender<i32>, logger: Logger) {
    let mut signals = signals.fuse();
    while let Some(signal) = signals.next().await {
        if signal == SIGHUP {
            info!(&logger, "Ignoring SIGHUP - configuration is only read at startup");
            continue;
        }
        let _ = sender.send(signal).await;
    }
}
