mod index;
mod keys;

pub use self::index::CoordinateIndex;
pub use self::keys::{AtomKey, AtomRecord, SequenceKey};

#[cfg(test)]
pub(crate) use self::index::test_utilities;
