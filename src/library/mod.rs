//! Track lifecycle: keeping blobs and records consistent, and the list views built on top

pub mod busy;
pub mod error;
pub mod list;
pub mod mutations;

#[cfg(test)]
pub(crate) mod testing;
