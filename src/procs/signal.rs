// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use libc::pid_t;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::procs::Signaller;

/// Sends a signal with `kill(2)`, SIGTERM unless configured otherwise
#[derive(Clone, Copy, Debug)]
pub struct NixSignaller {
    signal: Signal,
}

impl NixSignaller {
    pub fn new() -> Self {
        Self {
            signal: Signal::SIGTERM,
        }
    }

    pub fn with_signal(signal: Signal) -> Self {
        Self { signal }
    }
}

impl Default for NixSignaller {
    fn default() -> Self {
        Self::new()
    }
}

impl Signaller for NixSignaller {
    fn terminate(&self, pid: pid_t) -> nix::Result<()> {
        // 0 and negative pids address process groups
        if pid <= 0 {
            return Err(nix::Error::EINVAL);
        }

        kill(Pid::from_raw(pid), self.signal)
    }
}
