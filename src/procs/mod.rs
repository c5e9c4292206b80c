// Copyright 2019 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The seams between the supervisor and the OS: listing, launching and signalling processes

mod launcher;
mod signal;
mod supervisor;
mod table;

pub use launcher::DetachedLauncher;
pub use signal::NixSignaller;
pub use supervisor::{Supervisor, TickReport};
pub use table::{parse_ps_line, parse_ps_output, PsTable};

use async_trait::async_trait;
use libc::pid_t;

use crate::registry::DaemonSpec;
use crate::Error;

/// One line of the OS process table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: pid_t,
    /// Full invocation, including all arguments
    pub command_line: String,
}

impl ProcessRecord {
    pub fn new<S: Into<String>>(pid: pid_t, command_line: S) -> Self {
        Self {
            pid,
            command_line: command_line.into(),
        }
    }
}

/// A fresh, unfiltered view of every process visible to this session
///
/// Implementations must not cache, each call reflects the process table at the time of the call.
#[async_trait]
pub trait ProcessTable: Send + Sync {
    async fn list_processes(&self) -> Result<Vec<ProcessRecord>, Error>;
}

/// Starts a daemon outside of the supervisor's own lifetime, without waiting on it
pub trait Launcher: Send + Sync {
    fn launch(&self, spec: &DaemonSpec) -> Result<(), Error>;
}

/// Delivers a termination request to a pid
pub trait Signaller: Send + Sync {
    fn terminate(&self, pid: pid_t) -> nix::Result<()>;
}
