mod source;
mod walker;

pub use source::{HolderSource, MemoryHolderSource};
pub use walker::PageWalker;
