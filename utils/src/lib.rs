//! Shared utilities for the recipebook workspace.
//!
//! Holds the pieces that do not depend on storage or HTTP: build metadata
//! for the service version header and the URL slug rules shared by tags and
//! recipe filters.

pub mod slug;
pub mod version_info;
