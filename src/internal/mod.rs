//! Internal implementation details.

pub(crate) mod release_guard;

pub(crate) use release_guard::guarded_release;
