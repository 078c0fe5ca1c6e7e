//! # Succinct bit vectors in Rust
//!
//! Ribbit provides [succinct data structures](https://en.wikipedia.org/wiki/Succinct_data_structure)
//! for immutable bit sequences: a sublinear-space index answers the three
//! primitive queries $`\textrm{Access}(i)`$, $`\textrm{Rank}(i)`$, and
//! $`\textrm{Select}(k)`$ in near-constant time. These are the foundation of
//! compressed suffix arrays, wavelet trees, FM-indexes, and succinct trees.
//!
//! ## Design policy
//!
//! - **Build once, query forever:**
//!   Every structure is loaded in a single build phase and is immutable
//!   afterwards; queries are pure and allocation-free, so built values can
//!   be shared freely across threads.
//!
//! - **Maintain interface consistency:**
//!   The vectors adhere to the unified [`bit_vectors`] trait surface
//!   ([`Access`](bit_vectors::Access), [`Rank`](bit_vectors::Rank),
//!   [`Select`](bit_vectors::Select)), facilitating integration and
//!   replacement.
//!
//! - **Ensure safety:**
//!   No unsafe instructions; the bit kernels are plain broadword arithmetic.
//!
//! ## Data structures
//!
//! | Structure | Space (bits) | Purpose |
//! | --- | --- | --- |
//! | [`BitBuffer`] | $`n`$ | raw MSB-first bit ingestion and bit-packed streams |
//! | [`RsBitVector`] | $`n + o(n)`$ | plain vector with constant-time rank |
//! | [`RrrBitVector`] | $`n H_0 + o(n)`$ | compressed vector, same queries |
//! | [`EliasFano`] | $`n \lceil \lg (U/n) \rceil + 2n + o(n)`$ | monotone integer sequences |
//!
//! ## Serialization
//!
//! Every structure round-trips through a fixed little-endian byte format via
//! [`Serializable`]; see the [`serialization`] module for the contract.
//!
//! ## Limitation
//!
//! This library is designed to run on 64-bit machines.
#![deny(missing_docs)]

#[cfg(not(target_pointer_width = "64"))]
compile_error!("`target_pointer_width` must be 64");

pub mod bit_buffer;
pub mod bit_vectors;
pub mod broadword;
pub mod error;
pub mod mii_sequences;
pub mod serialization;

pub use bit_buffer::BitBuffer;
pub use bit_vectors::{RrrBitVector, RsBitVector};
pub use error::{Error, Result};
pub use mii_sequences::EliasFano;
pub use serialization::Serializable;
