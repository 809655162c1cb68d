//! External codec overlay registry.
//!
//! The built-in method table is closed; codecs for method bytes outside it
//! are registered here at start-up. Lookup by the block decoder prefers this
//! overlay, and duplicate registration keeps the most recent entry.

use std::{
    env, fs, io,
    path::PathBuf,
    sync::{Arc, OnceLock, RwLock},
};

use indexmap::IndexMap;

use crate::container::block::CompressionMethod;

/// An externally provided block codec.
pub trait ExternalCodec: Send + Sync {
    /// A short human-readable name, for diagnostics.
    fn name(&self) -> &str;

    /// Relative cost weight; 1.0 is gzip-equivalent.
    fn cost(&self) -> f64 {
        1.0
    }

    /// Compresses `src` at the given level.
    fn compress(&self, compression_level: u8, src: &[u8]) -> io::Result<Vec<u8>>;

    /// Decompresses `src`, whose original size is `uncompressed_size`.
    fn decompress(&self, src: &[u8], uncompressed_size: usize) -> io::Result<Vec<u8>>;
}

static REGISTRY: OnceLock<RwLock<IndexMap<u8, Arc<dyn ExternalCodec>>>> = OnceLock::new();

fn registry() -> &'static RwLock<IndexMap<u8, Arc<dyn ExternalCodec>>> {
    REGISTRY.get_or_init(|| RwLock::new(IndexMap::new()))
}

/// Registers a codec for a method byte outside the built-in range.
///
/// Registering an already-registered byte replaces the earlier codec.
pub fn register(method: u8, codec: Arc<dyn ExternalCodec>) -> io::Result<()> {
    let method = CompressionMethod::validate_external(method)?;

    let mut table = match registry().write() {
        Ok(table) => table,
        Err(e) => e.into_inner(),
    };

    table.insert(method, codec);

    Ok(())
}

/// Returns the codec registered for a method byte, if any.
pub fn get(method: u8) -> Option<Arc<dyn ExternalCodec>> {
    let table = match registry().read() {
        Ok(table) => table,
        Err(e) => e.into_inner(),
    };

    table.get(&method).cloned()
}

/// Enumerates plug-in shared-library candidates from `CRAM_CODEC_DIR`.
///
/// The variable holds a colon-separated directory list; files whose names
/// end in `.so` are candidates. Loading is left to the embedding
/// application, which calls [`register`] with the results; unreadable
/// directories are skipped. A missing or empty variable disables the scan.
pub fn plugin_candidates() -> Vec<PathBuf> {
    let Some(dirs) = env::var_os("CRAM_CODEC_DIR") else {
        return Vec::new();
    };

    if dirs.is_empty() {
        return Vec::new();
    }

    let mut candidates = Vec::new();

    for dir in env::split_paths(&dirs) {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };

        for entry in entries.flatten() {
            let path = entry.path();

            let is_shared_library = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(".so"));

            if is_shared_library {
                candidates.push(path);
            }
        }
    }

    candidates.sort();

    candidates
}
