//! # git-doc-mapper
//!
//! A two-way interface between a local git working tree and a remote
//! document-management repository. All operations are driven by the file
//! map, a JSON document at the working-tree root that maps remote document
//! identifiers to local files per named target.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────────┐
//! │ git tree │──▶│ File map  │──▶│ Remote adaptor │──▶ document repository
//! │ + config │   │ (.docmap) │   │ (one / target) │
//! └──────────┘   └───────────┘   └───────┬───────┘
//!                                        │
//!                     push: tag history ◀┘▶ show: version report
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration (targets, map filename) |
//! | [`query`] | Find-list query construction |
//! | [`api`] | Authenticated HTTP adaptor + response normalization |
//! | [`git`] | Wrappers over the `git` binary |
//! | [`filemap`] | The persisted, validated file map |
//! | [`push`] | Push orchestration (send, remap, tag) |
//! | [`show`] | Current-version report |
//! | [`pull`] | Reserved; not implemented |
//! | [`prompt`] | Confirmation prompts and credential resolution |

pub mod api;
pub mod config;
pub mod filemap;
pub mod git;
pub mod prompt;
pub mod pull;
pub mod push;
pub mod query;
pub mod show;
