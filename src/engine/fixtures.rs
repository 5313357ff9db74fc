//! Shared helpers for engine unit tests.

use crate::core::layout::Layout;
use crate::core::types::BranchName;

pub(crate) fn name(s: &str) -> BranchName {
    BranchName::new(s).unwrap()
}

pub(crate) fn layout(text: &str) -> Layout {
    Layout::parse(text).unwrap()
}
