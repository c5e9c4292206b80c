// Copyright 2019 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::sync::Arc;
use std::time::Duration;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use libc::pid_t;
use serde::Serialize;
use tokio::runtime;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sombrero::procs::{DetachedLauncher, NixSignaller, PsTable};
use sombrero::{Config, Controller, Error, StopOutcome, Supervisor};

const NAME: &str = "NAME";
const INTERVAL: &str = "interval";
const TICKS: &str = "ticks";
const JSON: &str = "json";

trait SetupClapApp {
    fn setup_clap_app(self) -> Self;
    fn daemon_name_arg(self) -> Self;
    fn json_opt(self) -> Self;
}

impl SetupClapApp for Command {
    fn setup_clap_app(self) -> Self {
        self.version(env!("CARGO_PKG_VERSION"))
            .author(env!("CARGO_PKG_AUTHORS"))
    }

    fn daemon_name_arg(self) -> Self {
        self.arg(
            Arg::new(NAME)
                .required(true)
                .help("name of a registered daemon"),
        )
    }

    fn json_opt(self) -> Self {
        self.arg(
            Arg::new(JSON)
                .long(JSON)
                .action(ArgAction::SetTrue)
                .help("print as json"),
        )
    }
}

fn app() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .setup_clap_app()
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("supervise")
                .about("check every daemon, restart those not running, sleep and repeat")
                .arg(
                    Arg::new(INTERVAL)
                        .long(INTERVAL)
                        .value_name("SECS")
                        .value_parser(value_parser!(u64).range(1..))
                        .help("seconds between sweeps, defaults to the compiled-in interval"),
                )
                .arg(
                    Arg::new(TICKS)
                        .long(TICKS)
                        .value_name("N")
                        .value_parser(value_parser!(u64).range(1..))
                        .help("stop after this many sweeps"),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("show whether daemons are running")
                .arg(Arg::new(NAME).help("name of a registered daemon, all if omitted"))
                .json_opt(),
        )
        .subcommand(
            Command::new("start")
                .about("start a daemon that is not running")
                .daemon_name_arg(),
        )
        .subcommand(
            Command::new("stop")
                .about("terminate a running daemon")
                .daemon_name_arg(),
        )
        .subcommand(
            Command::new("restart")
                .about("stop then start a daemon")
                .daemon_name_arg(),
        )
        .subcommand(
            Command::new("list")
                .about("list the registered daemons")
                .json_opt(),
        )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = app().get_matches();
    init_tracing();

    let runtime = runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to initialize Tokio Runtime");

    if let Err(err) = runtime.block_on(run(args)) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

async fn run(args: ArgMatches) -> Result<(), Error> {
    let config = Config::builtin()?;
    let controller = Controller::from_config(
        &config,
        Arc::new(PsTable::new()),
        Arc::new(DetachedLauncher),
        Arc::new(NixSignaller::new()),
    );

    match args.subcommand() {
        Some(("supervise", args)) => supervise(controller, &config, args).await,
        Some(("status", args)) => status(&controller, args).await,
        Some(("start", args)) => controller.start(daemon_name(args)).await,
        Some(("stop", args)) => stop(&controller, daemon_name(args)).await,
        Some(("restart", args)) => controller.restart(daemon_name(args)).await,
        Some(("list", args)) => list(&config, args),
        _ => unreachable!("subcommand is required"),
    }
}

fn daemon_name(args: &ArgMatches) -> &str {
    args.get_one::<String>(NAME)
        .map(String::as_str)
        .expect("NAME is required")
}

async fn supervise(controller: Controller, config: &Config, args: &ArgMatches) -> Result<(), Error> {
    let interval = args
        .get_one::<u64>(INTERVAL)
        .map(|secs| Duration::from_secs(*secs))
        .unwrap_or(config.interval);
    let max_ticks = args.get_one::<u64>(TICKS).copied();

    let shutdown = CancellationToken::new();
    watch_signals(shutdown.clone())?;

    let supervisor = Supervisor::new(controller).with_interval(interval);
    supervisor.run(shutdown, max_ticks).await;

    Ok(())
}

/// Cancels the token on SIGINT or SIGTERM
fn watch_signals(shutdown: CancellationToken) -> Result<(), Error> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
        shutdown.cancel();
    });

    Ok(())
}

#[derive(Serialize)]
struct DaemonReport<'a> {
    name: &'a str,
    command: &'a str,
    status: &'static str,
    pid: Option<pid_t>,
}

async fn status(controller: &Controller, args: &ArgMatches) -> Result<(), Error> {
    let statuses = match args.get_one::<String>(NAME) {
        Some(name) => vec![(name.clone(), controller.status(name).await?)],
        None => controller.status_all().await?,
    };

    if args.get_flag(JSON) {
        let mut reports = Vec::with_capacity(statuses.len());
        for (name, status) in &statuses {
            let spec = controller.registry().lookup(name)?;
            reports.push(DaemonReport {
                name,
                command: &spec.command,
                status: status.as_str(),
                pid: status.pid(),
            });
        }

        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for (name, status) in &statuses {
        println!("{}: {}", name, status);
    }

    Ok(())
}

async fn stop(controller: &Controller, name: &str) -> Result<(), Error> {
    match controller.stop(name).await? {
        StopOutcome::AlreadyStopped => println!("{} is already stopped", name),
        StopOutcome::Terminated(pid) => println!("{} terminated (pid {})", name, pid),
    }

    Ok(())
}

fn list(config: &Config, args: &ArgMatches) -> Result<(), Error> {
    if args.get_flag(JSON) {
        println!("{}", serde_json::to_string_pretty(config.registry.specs())?);
        return Ok(());
    }

    for spec in config.registry.specs() {
        println!("{}: {}", spec.name, spec.command);
    }

    Ok(())
}
