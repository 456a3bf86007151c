// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Sort operator error types

use std::{
    error::Error,
    fmt::{Display, Formatter},
    io, result,
};

/// Result type alias for sort operations.
pub type Result<T> = result::Result<T, SortError>;

/// Errors raised while running the distributed sort.
#[derive(Debug)]
pub enum SortError {
    /// General error with a descriptive message.
    General(String),
    /// Internal error indicating a bug or unexpected state.
    Internal(String),
    /// Configuration error with invalid settings.
    Configuration(String),
    /// A channel endpoint was used after close, or its peer has gone away.
    ChannelClosed(String),
    /// A collective operation could not complete.
    Collective(String),
    /// Tokio task join error.
    TokioError(tokio::task::JoinError),
    /// I/O operation error.
    IoError(io::Error),
}

impl From<String> for SortError {
    fn from(e: String) -> Self {
        SortError::General(e)
    }
}

impl From<io::Error> for SortError {
    fn from(e: io::Error) -> Self {
        SortError::IoError(e)
    }
}

impl From<tokio::task::JoinError> for SortError {
    fn from(e: tokio::task::JoinError) -> Self {
        SortError::TokioError(e)
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            SortError::General(desc) => write!(f, "General error: {desc}"),
            SortError::Internal(desc) => {
                write!(f, "Internal sort error: {desc}")
            }
            SortError::Configuration(desc) => {
                write!(f, "Configuration error: {desc}")
            }
            SortError::ChannelClosed(desc) => write!(f, "Channel closed: {desc}"),
            SortError::Collective(desc) => {
                write!(f, "Collective operation failed: {desc}")
            }
            SortError::TokioError(desc) => write!(f, "Tokio join error: {desc}"),
            SortError::IoError(desc) => write!(f, "IO error: {desc}"),
        }
    }
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SortError::TokioError(e) => Some(e),
            SortError::IoError(e) => Some(e),
            _ => None,
        }
    }
}
