// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::io;

use libc::pid_t;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("unknown daemon: {name}")]
    UnknownDaemon { name: String },
    #[error("unable to start daemon, {name} is already running with pid {pid}")]
    AlreadyRunning { name: String, pid: pid_t },
    #[error("failed to terminate {name} with pid {pid}: {source}")]
    Termination {
        name: String,
        pid: pid_t,
        source: nix::Error,
    },
    #[error("unable to enumerate processes: {reason}")]
    SystemQuery { reason: String },
    #[error("failed to launch {name}: {source}")]
    Launch { name: String, source: io::Error },
    #[error("invalid daemon registry: {reason}")]
    InvalidRegistry { reason: String },
    #[error("io error")]
    IoError(#[from] io::Error),
    #[error("json error")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    fn from_kind(kind: ErrorKind) -> Self {
        Self(kind)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Liveness could not be determined, nothing should be decided from this check
    pub fn is_system_query(&self) -> bool {
        matches!(self.0, ErrorKind::SystemQuery { .. })
    }

    pub(crate) fn unknown_daemon(name: &str) -> Self {
        Self::from_kind(ErrorKind::UnknownDaemon {
            name: name.to_string(),
        })
    }

    pub(crate) fn system_query<S: Into<String>>(reason: S) -> Self {
        Self::from_kind(ErrorKind::SystemQuery {
            reason: reason.into(),
        })
    }

    pub(crate) fn invalid_registry<S: Into<String>>(reason: S) -> Self {
        Self::from_kind(ErrorKind::InvalidRegistry {
            reason: reason.into(),
        })
    }
}

impl<E> From<E> for Error
where
    E: Into<ErrorKind>,
{
    fn from(err: E) -> Self {
        Self::from_kind(err.into())
    }
}
