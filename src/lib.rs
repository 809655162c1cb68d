//! **cram-codecs** implements the block-compression core of the CRAM format:
//! the block object and its on-disk framing, the entropy and transform codecs
//! fixed by the CRAM 3.x specification (rANS 4x8, rANS Nx16, adaptive
//! arithmetic coding, fqzcomp quality compression, the read-name tokenizer),
//! wrappers over general-purpose codecs (gzip, bzip2, xz, zstd), and the
//! per-column metrics that choose a method for each block.
//!
//! Record encoding, reference handling, indexing, and file-level drivers are
//! out of scope; this crate is the layer they call into.

pub mod codecs;
pub mod compressor;
pub mod container;
pub mod file_definition;
pub mod io;
pub mod metrics;
pub mod stats;

pub use self::{
    compressor::{compress_block, uncompress_block},
    container::block::Block,
    file_definition::FileDefinition,
    metrics::{MethodSet, Metrics},
};
