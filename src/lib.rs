mod change;
mod collections;
mod error;
mod listener;
mod subscription;
mod utils;

#[cfg(test)]
mod test_utils;

pub use change::*;
pub use collections::{
    array::*, concat, copy, fill, filtered::*, replace_all, sorted::*, transform::*,
    unmodifiable, unmodifiable::UnmodifiableVec, vec::*, ObservableList,
};
pub use error::*;
pub use listener::{ListChangeListener, ListenerKey, ListenerSet};
pub use subscription::*;
