//! Block-layer writers.

mod block;
mod file_definition;
pub mod num;
mod options;

pub use self::{
    block::{block_size_of, write_block},
    file_definition::write_file_definition,
    options::{Binning, Options},
};
