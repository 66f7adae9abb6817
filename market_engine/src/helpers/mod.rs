mod key_locks;

pub use key_locks::{KeyGuard, KeyLocks};
