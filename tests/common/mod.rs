// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! In-memory stand-ins for the OS process table, launcher and signaller

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use libc::pid_t;

use sombrero::procs::{Launcher, ProcessTable, Signaller};
use sombrero::{Controller, DaemonSpec, Error, ErrorKind, ProcessRecord, Registry, Supervisor};

/// Initialize tracing for tests (idempotent)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

#[derive(Default)]
pub struct FakeTable {
    records: Mutex<Vec<ProcessRecord>>,
    failing: AtomicBool,
    fail_after: Mutex<Option<usize>>,
    queries: AtomicUsize,
}

impl FakeTable {
    pub fn with_records(records: Vec<ProcessRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    pub fn push(&self, record: ProcessRecord) {
        self.records.lock().unwrap().push(record);
    }

    pub fn remove(&self, pid: pid_t) -> bool {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.pid != pid);
        records.len() != before
    }

    pub fn records(&self) -> Vec<ProcessRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Reads succeed `reads` times, then fail
    pub fn fail_after(&self, reads: usize) {
        *self.fail_after.lock().unwrap() = Some(reads);
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessTable for FakeTable {
    async fn list_processes(&self) -> Result<Vec<ProcessRecord>, Error> {
        let previous = self.queries.fetch_add(1, Ordering::SeqCst);
        let exhausted = self
            .fail_after
            .lock()
            .unwrap()
            .map_or(false, |reads| previous >= reads);

        if exhausted || self.failing.load(Ordering::SeqCst) {
            return Err(ErrorKind::SystemQuery {
                reason: "ps is unavailable".to_string(),
            }
            .into());
        }

        Ok(self.records())
    }
}

/// Records launches, and by default makes the launched command appear in the table
pub struct FakeLauncher {
    table: Arc<FakeTable>,
    launched: Mutex<Vec<String>>,
    next_pid: AtomicI32,
    appear: AtomicBool,
    failing: AtomicBool,
}

impl FakeLauncher {
    pub fn new(table: Arc<FakeTable>) -> Self {
        Self {
            table,
            launched: Mutex::new(Vec::new()),
            next_pid: AtomicI32::new(1000),
            appear: AtomicBool::new(true),
            failing: AtomicBool::new(false),
        }
    }

    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }

    /// A launched process that never shows up, e.g. it crashes immediately
    pub fn set_appear(&self, appear: bool) {
        self.appear.store(appear, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Launcher for FakeLauncher {
    fn launch(&self, spec: &DaemonSpec) -> Result<(), Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ErrorKind::Launch {
                name: spec.name.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such program"),
            }
            .into());
        }

        self.launched.lock().unwrap().push(spec.name.clone());
        if self.appear.load(Ordering::SeqCst) {
            let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
            self.table.push(ProcessRecord::new(pid, spec.command.clone()));
        }

        Ok(())
    }
}

/// Records signalled pids, and by default removes them from the table
pub struct FakeSignaller {
    table: Arc<FakeTable>,
    signalled: Mutex<Vec<pid_t>>,
    error: Mutex<Option<nix::Error>>,
    exits: AtomicBool,
}

impl FakeSignaller {
    pub fn new(table: Arc<FakeTable>) -> Self {
        Self {
            table,
            signalled: Mutex::new(Vec::new()),
            error: Mutex::new(None),
            exits: AtomicBool::new(true),
        }
    }

    pub fn signalled(&self) -> Vec<pid_t> {
        self.signalled.lock().unwrap().clone()
    }

    pub fn set_error(&self, error: Option<nix::Error>) {
        *self.error.lock().unwrap() = error;
    }

    /// The signalled process ignores the signal and keeps running
    pub fn set_exits(&self, exits: bool) {
        self.exits.store(exits, Ordering::SeqCst);
    }
}

impl Signaller for FakeSignaller {
    fn terminate(&self, pid: pid_t) -> nix::Result<()> {
        if let Some(err) = *self.error.lock().unwrap() {
            return Err(err);
        }

        self.signalled.lock().unwrap().push(pid);
        if self.exits.load(Ordering::SeqCst) {
            self.table.remove(pid);
        }

        Ok(())
    }
}

pub struct World {
    pub table: Arc<FakeTable>,
    pub launcher: Arc<FakeLauncher>,
    pub signaller: Arc<FakeSignaller>,
    pub registry: Arc<Registry>,
}

impl World {
    pub fn new(specs: &[(&str, &str)], records: Vec<ProcessRecord>) -> Self {
        let registry = Registry::new(
            specs
                .iter()
                .map(|(name, command)| DaemonSpec::new(*name, *command)),
        )
        .expect("valid registry");
        let table = Arc::new(FakeTable::with_records(records));

        Self {
            launcher: Arc::new(FakeLauncher::new(table.clone())),
            signaller: Arc::new(FakeSignaller::new(table.clone())),
            table,
            registry: Arc::new(registry),
        }
    }

    /// `{a: "run-a", b: "run-b"}`
    pub fn ab(records: Vec<ProcessRecord>) -> Self {
        Self::new(&[("a", "run-a"), ("b", "run-b")], records)
    }

    pub fn controller(&self) -> Controller {
        Controller::new(
            self.registry.clone(),
            self.table.clone(),
            self.launcher.clone(),
            self.signaller.clone(),
        )
        .with_stop_timeout(Duration::from_millis(300))
    }

    pub fn supervisor(&self) -> Supervisor {
        Supervisor::new(self.controller()).with_interval(Duration::from_millis(10))
    }
}
