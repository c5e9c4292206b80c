// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The compiled-in configuration, there is no file or environment based configuration

use std::time::Duration;

use crate::registry::{DaemonSpec, Registry};
use crate::Error;

/// Time between supervisor sweeps
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// How long a restart waits for a terminated daemon to leave the process table
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// name -> launch command for every supervised daemon
///
/// Commands are exec'd directly and must be what appears in the process table, so no `nohup`
/// style wrappers. Detachment comes from the launcher.
pub const DAEMONS: &[(&str, &str)] = &[
    ("example_daemon_1", "python ./example/example_daemon_1.py"),
    ("example_daemon_2", "python ./example/example_daemon_2.py"),
];

#[derive(Clone, Debug)]
pub struct Config {
    pub registry: Registry,
    pub interval: Duration,
    pub stop_timeout: Duration,
}

impl Config {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            interval: DEFAULT_INTERVAL,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// The daemon table and defaults compiled into this binary
    pub fn builtin() -> Result<Self, Error> {
        let registry = Registry::new(
            DAEMONS
                .iter()
                .map(|(name, command)| DaemonSpec::new(*name, *command)),
        )?;

        Ok(Self::new(registry))
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }
}
