// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use tracing::info;

use crate::fork::{spawn_detached, StdIoConf};
use crate::procs::Launcher;
use crate::registry::DaemonSpec;
use crate::{Error, ErrorKind};

/// Launch programs
///
/// Rules:
/// - never waits on the launched process
/// - output is discarded
/// - the launched process is in its own session, it survives the supervisor exiting
///
/// Requires a tokio runtime, dropped children are reaped by it.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetachedLauncher;

impl Launcher for DetachedLauncher {
    fn launch(&self, spec: &DaemonSpec) -> Result<(), Error> {
        info!(daemon = %spec.name, command = %spec.command, "spawning daemon");

        let child = spawn_detached(&spec.command, StdIoConf::discard()).map_err(|source| {
            ErrorKind::Launch {
                name: spec.name.clone(),
                source,
            }
        })?;

        info!(daemon = %spec.name, pid = ?child.id(), "spawned daemon");
        Ok(())
    }
}
