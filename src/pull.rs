//! Pull orchestration — contract shape only.
//!
//! Pulling mapped files back out of the remote repository is planned but
//! unimplemented; the subcommand parses fully so the interface is stable,
//! and execution fails with a clear error.

use anyhow::{bail, Result};

use crate::api::Credentials;
use crate::config::Config;
use crate::filemap::FileMap;

pub fn run_pull(
    _config: &Config,
    _filemap: &FileMap,
    _credentials: &Credentials,
    _targets: &[String],
) -> Result<()> {
    bail!("pull is not implemented yet");
}
