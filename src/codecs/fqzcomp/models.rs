use std::num::NonZero;

use crate::codecs::aac::Model;

// The context function folds into 16 bits, so up to this many quality
// models may be addressed.
const CONTEXT_COUNT: usize = 1 << 16;

pub struct Models {
    pub qual: Vec<Model>,
    pub len: [Model; 4],
    pub rev: Model,
    pub dup: Model,
    pub sel: Option<Model>,
}

impl Models {
    pub fn new(symbol_count: NonZero<usize>, selector_count: Option<NonZero<usize>>) -> Self {
        let qual = vec![Model::new(symbol_count.get()); CONTEXT_COUNT];

        let len = [
            Model::new(256),
            Model::new(256),
            Model::new(256),
            Model::new(256),
        ];

        Self {
            qual,
            len,
            rev: Model::new(2),
            dup: Model::new(2),
            sel: selector_count.map(|n| Model::new(n.get())),
        }
    }
}
