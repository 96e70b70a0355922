//! Canonical typeid encoding (component B) and the open-addressed
//! hashtable core that backs every interner in the workspace
//! (component C), per sections 4.B and 4.C.

mod bitmap;
mod byteset;
mod hashtable;
mod typeid;

pub use bitmap::{SlotStatus, StatusBitmap};
pub use byteset::ByteSet;
pub use hashtable::HashTable;
pub use typeid::{GLOBAL, Interner};
