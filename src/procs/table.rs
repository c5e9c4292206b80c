// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::process::Stdio;

use async_trait::async_trait;
use libc::pid_t;
use tokio::process::Command;
use tracing::debug;

use crate::procs::{ProcessRecord, ProcessTable};
use crate::Error;

/// Reads the process table through `ps`
///
/// `pid=` and `args=` suppress the header and give the full command line rather than the
/// executable name.
#[derive(Clone, Debug)]
pub struct PsTable {
    program: String,
}

impl PsTable {
    pub fn new() -> Self {
        Self {
            program: "ps".to_string(),
        }
    }

    /// Use a different `ps` binary, it must accept `-eo pid=,args=`
    pub fn with_program<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PsTable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessTable for PsTable {
    async fn list_processes(&self) -> Result<Vec<ProcessRecord>, Error> {
        let output = Command::new(&self.program)
            .arg("-eo")
            .arg("pid=,args=")
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .stdout(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::system_query(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(Error::system_query(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let records = parse_ps_output(&stdout);
        debug!(count = records.len(), "read process table");

        Ok(records)
    }
}

/// Parses every line of `ps` output, lines without a pid are skipped
pub fn parse_ps_output(output: &str) -> Vec<ProcessRecord> {
    output.lines().filter_map(parse_ps_line).collect()
}

/// The pid is the leading run of decimal digits, everything after is the command line
pub fn parse_ps_line(line: &str) -> Option<ProcessRecord> {
    let line = line.trim_start();
    let digits = line
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(line.len());

    if digits == 0 {
        return None;
    }

    let pid = line[..digits].parse::<pid_t>().ok()?;
    let command_line = line[digits..].trim();

    Some(ProcessRecord::new(pid, command_line))
}
