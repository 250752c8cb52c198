//! Shared primitive types used across the entire detector.

/// A person in the payment network. Ids in the source data are 32-bit signed.
pub type PersonId = i32;

/// Shortest-path length in edges. One hop = one direct payment relationship.
pub type Hops = u32;
