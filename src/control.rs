// Copyright 2019 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! start, stop, restart and status for a single named daemon
//!
//! State is never stored, it is derived from the process table on every call.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use libc::pid_t;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::config::{Config, DEFAULT_STOP_TIMEOUT};
use crate::liveness::Resolver;
use crate::procs::{Launcher, ProcessTable, Signaller};
use crate::registry::Registry;
use crate::{Error, ErrorKind};

const STOP_POLL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Running(pid_t),
    Stopped,
}

impl Status {
    pub fn pid(&self) -> Option<pid_t> {
        match *self {
            Status::Running(pid) => Some(pid),
            Status::Stopped => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.pid().is_some()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Running(_) => "running",
            Status::Stopped => "stopped",
        }
    }
}

impl From<Option<pid_t>> for Status {
    fn from(pid: Option<pid_t>) -> Self {
        pid.map_or(Status::Stopped, Status::Running)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Running(pid) => write!(f, "running (pid {})", pid),
            Status::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was signalled
    AlreadyStopped,
    /// The termination signal was delivered to this pid
    Terminated(pid_t),
}

pub struct Controller {
    resolver: Resolver,
    launcher: Arc<dyn Launcher>,
    signaller: Arc<dyn Signaller>,
    stop_timeout: Duration,
}

impl Controller {
    pub fn new(
        registry: Arc<Registry>,
        table: Arc<dyn ProcessTable>,
        launcher: Arc<dyn Launcher>,
        signaller: Arc<dyn Signaller>,
    ) -> Self {
        Self {
            resolver: Resolver::new(registry, table),
            launcher,
            signaller,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    pub fn from_config(
        config: &Config,
        table: Arc<dyn ProcessTable>,
        launcher: Arc<dyn Launcher>,
        signaller: Arc<dyn Signaller>,
    ) -> Self {
        Self::new(
            Arc::new(config.registry.clone()),
            table,
            launcher,
            signaller,
        )
        .with_stop_timeout(config.stop_timeout)
    }

    /// Upper bound on how long restart waits for a terminated daemon to exit
    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    pub fn registry(&self) -> &Registry {
        self.resolver.registry()
    }

    pub async fn status(&self, name: &str) -> Result<Status, Error> {
        let status = Status::from(self.resolver.resolve(name).await?);
        info!(daemon = name, %status, "checked status");

        Ok(status)
    }

    /// Status of every registered daemon, in registry order, from one snapshot
    pub async fn status_all(&self) -> Result<Vec<(String, Status)>, Error> {
        let liveness = self.resolver.resolve_all().await?;

        Ok(liveness
            .iter()
            .map(|(name, pid)| (name.to_string(), Status::from(pid)))
            .collect())
    }

    /// Launches the daemon if no process for it is running
    ///
    /// This does not wait to see the new process, the next status check will.
    pub async fn start(&self, name: &str) -> Result<(), Error> {
        let spec = self.registry().lookup(name)?;
        info!(daemon = name, "starting daemon");

        if let Status::Running(pid) = self.status(name).await? {
            return Err(ErrorKind::AlreadyRunning {
                name: name.to_string(),
                pid,
            }
            .into());
        }

        self.launcher.launch(spec)
    }

    /// Terminates the daemon, stopping a stopped daemon is not an error
    pub async fn stop(&self, name: &str) -> Result<StopOutcome, Error> {
        self.registry().validate(name)?;
        info!(daemon = name, "stopping daemon");

        let pid = match self.status(name).await? {
            Status::Stopped => {
                info!(daemon = name, "unable to stop daemon, already stopped");
                return Ok(StopOutcome::AlreadyStopped);
            }
            Status::Running(pid) => pid,
        };

        info!(daemon = name, pid, "killing daemon");
        self.signaller.terminate(pid).map_err(|source| ErrorKind::Termination {
            name: name.to_string(),
            pid,
            source,
        })?;

        Ok(StopOutcome::Terminated(pid))
    }

    /// stop then start, whatever stop found
    ///
    /// A failed termination is reported and start still runs, it will refuse if the old process
    /// is still there.
    pub async fn restart(&self, name: &str) -> Result<(), Error> {
        self.registry().validate(name)?;
        info!(daemon = name, "restarting daemon");

        match self.stop(name).await {
            Ok(StopOutcome::Terminated(pid)) => self.wait_for_exit(name, pid).await?,
            Ok(StopOutcome::AlreadyStopped) => (),
            Err(err) if err.is_system_query() => return Err(err),
            Err(err) => error!(daemon = name, %err, "stop failed, attempting start anyway"),
        }

        self.start(name).await
    }

    async fn wait_for_exit(&self, name: &str, pid: pid_t) -> Result<(), Error> {
        let deadline = Instant::now() + self.stop_timeout;

        loop {
            if self.resolver.resolve(name).await? != Some(pid) {
                return Ok(());
            }

            if Instant::now() >= deadline {
                warn!(daemon = name, pid, timeout = ?self.stop_timeout, "daemon still running after stop");
                return Ok(());
            }

            sleep(STOP_POLL).await;
        }
    }
}
