//! Core type definitions for quartzdb.

mod ids;

pub use ids::{Lsn, PageId};
