// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Which of our daemons are running right now, and under which pid
//!
//! A process belongs to a daemon when its command line contains the daemon's launch command.
//! Nothing is remembered between calls, every resolution takes a new snapshot of the process table.

use std::sync::Arc;

use libc::pid_t;
use tracing::{debug, warn};

use crate::procs::{ProcessRecord, ProcessTable};
use crate::registry::Registry;
use crate::Error;

/// name -> pid for every registered daemon, `None` is not running
///
/// Entries are in registry order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Liveness {
    entries: Vec<(String, Option<pid_t>)>,
}

impl Liveness {
    pub fn pid(&self, name: &str) -> Option<pid_t> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, pid)| *pid)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.pid(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<pid_t>)> {
        self.entries.iter().map(|(name, pid)| (name.as_str(), *pid))
    }
}

/// Attribute each record to at most one daemon
///
/// A record goes to the first daemon, in registry order, whose command it contains. When more than
/// one process matches a daemon the last one in table order is kept; that is an artifact of table
/// order, not a claim about which process is newest.
pub fn match_records(registry: &Registry, records: &[ProcessRecord]) -> Liveness {
    let specs = registry.specs();
    let mut pids: Vec<Option<pid_t>> = vec![None; specs.len()];

    for record in records {
        let matched = specs
            .iter()
            .position(|spec| record.command_line.contains(spec.command.as_str()));

        if let Some(idx) = matched {
            if let Some(previous) = pids[idx] {
                warn!(
                    daemon = %specs[idx].name,
                    previous,
                    pid = record.pid,
                    "more than one process matches daemon, keeping the last"
                );
            }
            pids[idx] = Some(record.pid);
        }
    }

    Liveness {
        entries: specs
            .iter()
            .map(|spec| spec.name.clone())
            .zip(pids)
            .collect(),
    }
}

/// Cross references the registry against the live process table
#[derive(Clone)]
pub struct Resolver {
    registry: Arc<Registry>,
    table: Arc<dyn ProcessTable>,
}

impl Resolver {
    pub fn new(registry: Arc<Registry>, table: Arc<dyn ProcessTable>) -> Self {
        Self { registry, table }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub async fn resolve_all(&self) -> Result<Liveness, Error> {
        let records = self.table.list_processes().await?;
        let liveness = match_records(&self.registry, &records);
        debug!(?liveness, "resolved daemons");

        Ok(liveness)
    }

    /// Always takes its own snapshot
    pub async fn resolve(&self, name: &str) -> Result<Option<pid_t>, Error> {
        self.registry.validate(name)?;
        Ok(self.resolve_all().await?.pid(name))
    }
}
