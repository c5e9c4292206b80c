// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::io;
use std::process::Stdio;

use nix::unistd::setsid;
use tokio::process::{Child, Command};

pub struct StdIoConf {
    pub stdin: Stdio,
    pub stderr: Stdio,
    pub stdout: Stdio,
}

impl StdIoConf {
    /// Nothing is read from or written back to the supervisor's streams
    pub fn discard() -> Self {
        Self {
            stdin: Stdio::null(),
            stderr: Stdio::null(),
            stdout: Stdio::null(),
        }
    }
}

/// Splits a launch command into the program and its arguments
///
/// There is no shell involved, so quoting and redirection are not interpreted.
pub fn split_command(command: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = command.split_whitespace();
    let program = parts.next()?;

    Some((program, parts.collect()))
}

/// Spawns the command in its own session so that it outlives the supervisor
///
/// The returned child is not waited on, dropping it leaves the process running.
pub fn spawn_detached(command: &str, stdio: StdIoConf) -> io::Result<Child> {
    let (program, args) = split_command(command)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "command is empty"))?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .kill_on_drop(false)
        .stdin(stdio.stdin)
        .stdout(stdio.stdout)
        .stderr(stdio.stderr);

    // This is safe, setsid is async-signal-safe and nothing is allocated between fork and exec
    unsafe {
        cmd.pre_exec(|| {
            setsid().map(|_| ()).map_err(io::Error::from)
        });
    }

    cmd.spawn()
}
