// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error types for the library seams

use thiserror::Error;

/// Failures talking to the repository host
#[derive(Debug, Error)]
pub enum HostError {
    /// The request never produced a response
    #[error("request failed: {0}")]
    Transport(String),
    /// Credential rejected or lacking permission
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Resource does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// Optimistic-concurrency precondition failed
    #[error("conflicting update: {0}")]
    Conflict(String),
    /// Any other non-success status
    #[error("unexpected status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },
    /// Response body did not have the expected shape
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Failures gathering the automatically derived fields
#[derive(Debug, Error)]
pub enum CollectError {
    /// Hosting API call failed
    #[error("hosting metadata unavailable: {0}")]
    Host(#[from] HostError),
    /// Line counter could not be started
    #[error("could not run line counter '{program}': {message}")]
    Spawn {
        /// Program name
        program: String,
        /// OS error
        message: String,
    },
    /// Line counter exited unsuccessfully
    #[error("line counter exited with {status}: {stderr}")]
    Exit {
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },
    /// Line counter output could not be parsed
    #[error("unparseable line counter report: {0}")]
    Report(String),
}

/// Failures publishing the reconciled manifest
#[derive(Debug, Error)]
pub enum PublishError {
    /// Opening the change proposal failed
    #[error("could not open change proposal: {0}")]
    Proposal(#[source] HostError),
    /// Writing the manifest directly to the target branch failed
    #[error("could not commit manifest: {0}")]
    Commit(#[source] HostError),
    /// Direct commit failed and the proposal fallback failed too
    #[error("direct commit failed ({commit}); fallback proposal failed: {proposal}")]
    Fallback {
        /// Direct-commit failure
        commit: HostError,
        /// Proposal failure
        proposal: HostError,
    },
}
