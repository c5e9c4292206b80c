// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::Error;

/// Programs that exec their arguments, the process table then shows the target rather than the
/// configured command, so the daemon would never be seen running
pub const EXEC_WRAPPERS: &[&str] = &[
    "nohup", "exec", "env", "nice", "ionice", "setsid", "stdbuf", "chrt", "taskset", "timeout",
];

/// A daemon under supervision, the command is also what identifies it in the process table
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DaemonSpec {
    pub name: String,
    pub command: String,
}

impl DaemonSpec {
    pub fn new<N: Into<String>, C: Into<String>>(name: N, command: C) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

/// The fixed set of daemons which are "ours"
///
/// Order is the order the specs were given in, and is what the supervisor iterates.
#[derive(Clone, Debug)]
pub struct Registry {
    specs: Vec<DaemonSpec>,
}

impl Registry {
    /// Validates and builds the registry
    ///
    /// Fails if there are no specs, a name is repeated, a command is blank or starts with one of
    /// the [`EXEC_WRAPPERS`].
    pub fn new<I>(specs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = DaemonSpec>,
    {
        let specs: Vec<DaemonSpec> = specs.into_iter().collect();
        if specs.is_empty() {
            return Err(Error::invalid_registry("no daemons registered"));
        }

        let mut names = HashSet::new();
        for spec in &specs {
            if spec.name.trim().is_empty() {
                return Err(Error::invalid_registry("daemon name is blank"));
            }
            if spec.command.trim().is_empty() {
                return Err(Error::invalid_registry(format!(
                    "command for {} is blank",
                    spec.name
                )));
            }
            let program = spec.command.split_whitespace().next().unwrap_or_default();
            let basename = program.rsplit('/').next().unwrap_or(program);
            if EXEC_WRAPPERS.contains(&basename) {
                return Err(Error::invalid_registry(format!(
                    "command for {} starts with {}, which replaces itself with its arguments",
                    spec.name, basename
                )));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(Error::invalid_registry(format!(
                    "duplicate daemon name: {}",
                    spec.name
                )));
            }
        }

        // substring matching can't tell these apart on its own
        for spec in &specs {
            for other in &specs {
                if spec.name != other.name && other.command.contains(&spec.command) {
                    warn!(
                        daemon = %spec.name,
                        other = %other.name,
                        "command is contained in another daemon's command, the first registered daemon wins on match"
                    );
                }
            }
        }

        Ok(Self { specs })
    }

    pub fn lookup(&self, name: &str) -> Result<&DaemonSpec, Error> {
        self.specs
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| Error::unknown_daemon(name))
    }

    /// Precondition for every controller operation
    pub fn validate(&self, name: &str) -> Result<(), Error> {
        self.lookup(name).map(|_| ())
    }

    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|spec| spec.name.as_str())
    }

    pub fn specs(&self) -> &[DaemonSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
