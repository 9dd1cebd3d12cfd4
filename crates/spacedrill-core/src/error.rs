// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Every failure the engine can report to its callers.
#[derive(Debug, Error)]
pub enum Error {
    /// A scheduling record, unit, or stage does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The caller passed a value outside the accepted domain.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A concurrent writer changed the row (or held the lock) first.
    #[error("store conflict: {0}")]
    StoreConflict(String),
    #[error("storage error: {0}")]
    Storage(rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("catalog error: {0}")]
    Catalog(String),
}

pub type Fallible<T> = Result<T, Error>;

pub fn fail<T>(msg: impl Into<String>) -> Fallible<T> {
    Err(Error::InvalidInput(msg.into()))
}

impl Error {
    /// Only conflicts are transient. Everything else will fail the same way
    /// on a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StoreConflict(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                Error::StoreConflict(err.to_string())
            }
            _ => Error::Storage(err),
        }
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::Catalog(err.to_string())
    }
}
