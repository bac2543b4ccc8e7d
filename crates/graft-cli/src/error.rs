// SPDX-License-Identifier: (MIT OR Apache-2.0)

use std::path::PathBuf;

use graft_model::ModelError;
use graft_plan::PlanError;

/// Any error that aborts a `graftgen` run.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

