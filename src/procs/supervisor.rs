// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::DEFAULT_INTERVAL;
use crate::control::{Controller, Status};
use crate::Error;

/// What a single sweep over the registry did
#[derive(Debug, Default)]
pub struct TickReport {
    /// Daemons found stopped and restarted
    pub restarted: Vec<String>,
    /// Daemons whose check or restart failed
    pub failed: Vec<(String, Error)>,
    /// The process table could not be read, the remaining daemons were not checked
    pub aborted: bool,
}

/// Monitor and restart processes
///
/// Rules:
///   - one tick at a time, each daemon is checked (and restarted) before the next
///   - a failure for one daemon never stops the sweep for the others
///   - if the process table can't be read nothing is restarted that tick
pub struct Supervisor {
    controller: Controller,
    interval: Duration,
}

impl Supervisor {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        for name in self.controller.registry().all_names() {
            let status = match self.controller.status(name).await {
                Ok(status) => status,
                Err(err) if err.is_system_query() => {
                    error!(%err, "unable to read process table, skipping this sweep");
                    report.failed.push((name.to_string(), err));
                    report.aborted = true;
                    break;
                }
                Err(err) => {
                    error!(daemon = name, %err, "status check failed");
                    report.failed.push((name.to_string(), err));
                    continue;
                }
            };

            if status != Status::Stopped {
                continue;
            }

            warn!(daemon = name, "daemon is not running, restarting");
            match self.controller.restart(name).await {
                Ok(()) => report.restarted.push(name.to_string()),
                Err(err) => {
                    error!(daemon = name, %err, "restart failed");
                    let aborted = err.is_system_query();
                    report.failed.push((name.to_string(), err));
                    if aborted {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        report
    }

    /// Sweep, sleep, repeat
    ///
    /// Runs until `shutdown` is cancelled or `max_ticks` sweeps have completed. Cancellation is
    /// only seen between ticks, a sweep in progress always finishes. Returns the number of ticks.
    pub async fn run(&self, shutdown: CancellationToken, max_ticks: Option<u64>) -> u64 {
        info!(
            daemons = self.controller.registry().len(),
            interval = ?self.interval,
            "supervisor started"
        );

        let mut ticks = 0;
        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let report = self.tick().await;
            ticks += 1;
            info!(
                tick = ticks,
                restarted = report.restarted.len(),
                failed = report.failed.len(),
                aborted = report.aborted,
                "sweep complete"
            );

            if max_ticks.map_or(false, |max| ticks >= max) {
                break;
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(self.interval) => (),
            }
        }

        info!(ticks, "supervisor stopped");
        ticks
    }
}
