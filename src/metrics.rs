//! Per-column compression metrics and method auto-tuning.
//!
//! One [`Metrics`] instance tracks a logical column (a data series or aux
//! tag). Every `TRIAL_SPAN` blocks the driver probes all allowed methods for
//! `NTRIALS` blocks, scores the accumulated sizes against a per-method cost
//! table, locks in the winner, and drops methods that keep losing badly.

use crate::{container::block::CompressionMethod, stats::Stats};

pub(crate) const NTRIALS: i32 = 3;
pub(crate) const TRIAL_SPAN: i32 = 50;

const MAX_FAILS: u32 = 4;
const MAX_DELTA: f64 = 0.20;

/// An internal compression method candidate.
///
/// Several candidates normalize to the same wire method byte; the
/// parameterization (levels, rANS transform bits) lives here and is erased
/// on write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    /// Store uncompressed.
    Raw,
    /// Gzip at the stream's compression level.
    Gzip,
    /// Bzip2.
    Bzip2,
    /// LZMA (xz container).
    Lzma,
    /// rANS 4x8, order 0.
    Rans4x8O0,
    /// rANS Nx16, order 0.
    RansNx16O0,
    /// Arithmetic coding, order 0.
    ArithO0,
    /// fqzcomp quality codec.
    Fqzcomp,
    /// Read name tokenizer.
    NameTokenizer,
    /// libbsc (reserved; unsupported).
    Bsc,
    /// Zstandard at the stream's compression level.
    Zstd,
    /// rANS 4x8, order 1.
    Rans4x8O1,
    /// Gzip at level 1.
    Gzip1,
    /// rANS Nx16, order 1.
    RansNx16O1,
    /// rANS Nx16, RLE + order 0.
    RansNx16Rle0,
    /// rANS Nx16, RLE + order 1.
    RansNx16Rle1,
    /// rANS Nx16, bit pack + order 0.
    RansNx16Pack0,
    /// rANS Nx16, bit pack + order 1.
    RansNx16Pack1,
    /// rANS Nx16, bit pack + RLE + order 0.
    RansNx16PackRle0,
    /// rANS Nx16, bit pack + RLE + order 1.
    RansNx16PackRle1,
    /// Arithmetic coding, order 1.
    ArithO1,
    /// Arithmetic coding, RLE + order 0.
    ArithRle0,
    /// Arithmetic coding, RLE + order 1.
    ArithRle1,
    /// Arithmetic coding, bit pack + order 0.
    ArithPack0,
    /// Arithmetic coding, bit pack + order 1.
    ArithPack1,
    /// Arithmetic coding, bit pack + RLE + order 0.
    ArithPackRle0,
    /// Arithmetic coding, bit pack + RLE + order 1.
    ArithPackRle1,
    /// Zstandard at level 1.
    Zstd1,
}

impl Method {
    pub(crate) const COUNT: usize = 28;

    /// All methods, in scoring order. Ties in trial scoring go to the
    /// earlier entry.
    pub const ALL: [Method; Self::COUNT] = [
        Self::Raw,
        Self::Gzip,
        Self::Bzip2,
        Self::Lzma,
        Self::Rans4x8O0,
        Self::RansNx16O0,
        Self::ArithO0,
        Self::Fqzcomp,
        Self::NameTokenizer,
        Self::Bsc,
        Self::Zstd,
        Self::Rans4x8O1,
        Self::Gzip1,
        Self::RansNx16O1,
        Self::RansNx16Rle0,
        Self::RansNx16Rle1,
        Self::RansNx16Pack0,
        Self::RansNx16Pack1,
        Self::RansNx16PackRle0,
        Self::RansNx16PackRle1,
        Self::ArithO1,
        Self::ArithRle0,
        Self::ArithRle1,
        Self::ArithPack0,
        Self::ArithPack1,
        Self::ArithPackRle0,
        Self::ArithPackRle1,
        Self::Zstd1,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    const fn bit(self) -> u64 {
        1 << (self as u64)
    }

    /// Returns the wire compression method this candidate normalizes to.
    pub fn compression_method(self) -> CompressionMethod {
        match self {
            Self::Raw => CompressionMethod::None,
            Self::Gzip | Self::Gzip1 => CompressionMethod::Gzip,
            Self::Bzip2 => CompressionMethod::Bzip2,
            Self::Lzma => CompressionMethod::Lzma,
            Self::Rans4x8O0 | Self::Rans4x8O1 => CompressionMethod::Rans4x8,
            Self::RansNx16O0
            | Self::RansNx16O1
            | Self::RansNx16Rle0
            | Self::RansNx16Rle1
            | Self::RansNx16Pack0
            | Self::RansNx16Pack1
            | Self::RansNx16PackRle0
            | Self::RansNx16PackRle1 => CompressionMethod::RansNx16,
            Self::ArithO0
            | Self::ArithO1
            | Self::ArithRle0
            | Self::ArithRle1
            | Self::ArithPack0
            | Self::ArithPack1
            | Self::ArithPackRle0
            | Self::ArithPackRle1 => CompressionMethod::AdaptiveArithmeticCoding,
            Self::Fqzcomp => CompressionMethod::Fqzcomp,
            Self::NameTokenizer => CompressionMethod::NameTokenizer,
            Self::Bsc => CompressionMethod::Bsc,
            Self::Zstd | Self::Zstd1 => CompressionMethod::Zstd,
        }
    }

    // Relative cost weights; 1.0 is gzip-equivalent speed. At low
    // compression levels these push the choice toward faster methods.
    pub(crate) fn cost(self) -> f64 {
        match self {
            Self::Raw => 1.00,
            Self::Gzip => 1.04,
            Self::Bzip2 => 1.08,
            Self::Lzma => 1.04,
            Self::Rans4x8O0 => 1.00,
            Self::RansNx16O0 => 1.00,
            Self::ArithO0 => 1.03,
            Self::Fqzcomp => 1.05,
            Self::NameTokenizer => 1.05,
            Self::Bsc => 1.05,
            Self::Zstd => 1.03,
            Self::Rans4x8O1 => 1.01,
            Self::Gzip1 => 1.02,
            Self::RansNx16O1 => 1.01,
            Self::RansNx16Rle0 => 1.00,
            Self::RansNx16Rle1 => 1.03,
            Self::RansNx16Pack0 => 1.00,
            Self::RansNx16Pack1 => 1.01,
            Self::RansNx16PackRle0 => 1.00,
            Self::RansNx16PackRle1 => 1.01,
            Self::ArithO1 => 1.04,
            Self::ArithRle0 => 1.04,
            Self::ArithRle1 => 1.04,
            Self::ArithPack0 => 1.03,
            Self::ArithPack1 => 1.04,
            Self::ArithPackRle0 => 1.04,
            Self::ArithPackRle1 => 1.04,
            Self::Zstd1 => 1.01,
        }
    }

    fn is_fqzcomp(self) -> bool {
        matches!(self, Self::Fqzcomp)
    }
}

/// A set of candidate methods.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MethodSet(u64);

impl MethodSet {
    /// Creates an empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Adds a method to the set.
    pub fn insert(&mut self, method: Method) {
        self.0 |= method.bit();
    }

    /// Removes a method from the set.
    pub fn remove(&mut self, method: Method) {
        self.0 &= !method.bit();
    }

    /// Returns whether the set contains a method.
    pub fn contains(&self, method: Method) -> bool {
        self.0 & method.bit() != 0
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns whether the set allows nothing beyond storing raw.
    pub fn is_raw_only(&self) -> bool {
        self.0 & !Method::Raw.bit() == 0
    }

    /// Iterates the contained methods in scoring order.
    pub fn iter(&self) -> impl Iterator<Item = Method> + '_ {
        Method::ALL.into_iter().filter(|m| self.contains(*m))
    }
}

impl FromIterator<Method> for MethodSet {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        let mut set = Self::empty();

        for method in iter {
            set.insert(method);
        }

        set
    }
}

// Bit packing loses when the alphabet is wider than 16 symbols, so the
// candidates are swapped for their unpacked counterparts before a probe.
fn strip_pack_methods(mut set: MethodSet) -> MethodSet {
    const REMAP: [(Method, &[Method]); 8] = [
        (Method::RansNx16Pack0, &[Method::RansNx16O0]),
        (Method::RansNx16Pack1, &[Method::RansNx16O1]),
        (Method::RansNx16PackRle0, &[Method::RansNx16Rle0]),
        (
            Method::RansNx16PackRle1,
            &[Method::RansNx16Rle0, Method::RansNx16O1],
        ),
        (Method::ArithPack0, &[Method::ArithO0]),
        (Method::ArithPack1, &[Method::ArithO1]),
        (Method::ArithPackRle0, &[Method::ArithRle0]),
        (Method::ArithPackRle1, &[Method::ArithRle0, Method::ArithO1]),
    ];

    for (packed, replacements) in REMAP {
        if set.contains(packed) {
            set.remove(packed);

            for &replacement in replacements {
                set.insert(replacement);
            }
        }
    }

    set
}

/// What the driver should do with the next block of a column.
pub(crate) enum Plan {
    /// Probe every method in the set and report the sizes back.
    Trial(MethodSet),
    /// Compress with the locked-in method only.
    Locked(Method),
}

/// Per-column auto-tuning state.
///
/// Created with the column's writer and shared behind a mutex; the driver
/// holds the lock only around the bookkeeping, never around codec calls.
pub struct Metrics {
    trial: i32,
    next_trial: i32,
    consistency: u32,
    method: Method,
    sz: [f64; Method::COUNT],
    cnt: [u32; Method::COUNT],
    extra: [f64; Method::COUNT],
    revised: Option<MethodSet>,
    stats: Option<Stats>,
}

impl Metrics {
    /// Creates metrics for one column.
    ///
    /// The first probe happens after half a span, to learn quickly at the
    /// start of a stream.
    pub fn new() -> Self {
        Self {
            trial: NTRIALS,
            next_trial: TRIAL_SPAN / 2,
            consistency: 0,
            method: Method::Raw,
            sz: [0.0; Method::COUNT],
            cnt: [0; Method::COUNT],
            extra: [0.0; Method::COUNT],
            revised: None,
            stats: None,
        }
    }

    /// Attaches the column's symbol statistics.
    pub fn set_stats(&mut self, stats: Stats) {
        self.stats = Some(stats);
    }

    /// Returns the column's symbol statistics, if attached.
    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    /// Returns the currently locked-in method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Forces a re-probe, keeping accumulated sizes.
    ///
    /// The driver calls this across all columns when the stream switches
    /// between mapped and unmapped reads, as the distributions change
    /// sharply at that boundary.
    pub fn reset(&mut self) {
        self.trial = NTRIALS;
        self.next_trial = TRIAL_SPAN;
        self.revised = None;
    }

    pub(crate) fn plan_block(&mut self, requested: MethodSet) -> Plan {
        let in_trial = if self.trial > 0 {
            true
        } else {
            self.next_trial -= 1;
            self.next_trial <= 0
        };

        if !in_trial {
            return Plan::Locked(self.method);
        }

        let mut methods = match self.revised {
            Some(revised) => revised,
            None => {
                self.revised = Some(requested);
                requested
            }
        };

        if self.next_trial <= 0 {
            self.next_trial = TRIAL_SPAN;
            self.trial = NTRIALS;

            for s in &mut self.sz {
                *s /= 2.0;
            }
        }

        if let Some(stats) = &self.stats
            && stats.distinct_values() > 16
        {
            methods = strip_pack_methods(methods);
        }

        Plan::Trial(methods)
    }

    pub(crate) fn record_trial(
        &mut self,
        sizes: &[f64; Method::COUNT],
        mut methods: MethodSet,
        compression_level: u8,
    ) {
        // a small constant keeps tiny blocks from being over-confident
        for (acc, size) in self.sz.iter_mut().zip(sizes.iter()) {
            *acc += size + 50.0;
        }

        self.trial -= 1;

        if self.trial != 0 {
            return;
        }

        match compression_level {
            0..=1 => self.scale_costs(4.0),
            2..=3 => self.scale_costs(1.0),
            4..=6 => self.scale_costs(0.5),
            7 => self.scale_costs(1.0 / 3.0),
            _ => {}
        }

        let mut best = Method::Raw;
        let mut best_sz = f64::INFINITY;

        for method in Method::ALL {
            let i = method.index();

            if self.sz[i] == 0.0 || !methods.contains(method) {
                continue;
            }

            if best_sz > self.sz[i] {
                best_sz = self.sz[i];
                best = method;
            }
        }

        if best != self.method {
            // a new winner gets re-confirmed with a short extra trial
            self.trial = (NTRIALS + 1) / 2;
            self.consistency = 0;
        } else {
            let factor = 2.0f64.min(1.0 + f64::from(self.consistency) / 4.0);
            self.next_trial = (f64::from(self.next_trial) * factor) as i32;
            self.consistency += 1;
        }

        self.method = best;

        // Drop methods that lose MAX_FAILS windows in a row with enough
        // aggregate excess. fqzcomp rarely changes its mind, so a single
        // loss removes it.
        let mul = if compression_level >= 7 { 2 } else { 1 };

        for method in Method::ALL {
            let i = method.index();

            if method == best {
                self.cnt[i] = 0;
                self.extra[i] = 0.0;
            } else if best_sz < self.sz[i] {
                let r = self.sz[i] / best_sz - 1.0;

                self.cnt[i] += 1;

                if self.cnt[i] >= MAX_FAILS * mul {
                    self.extra[i] += r;

                    if self.extra[i] >= MAX_DELTA * f64::from(mul) {
                        methods.remove(method);
                    }
                }

                if method.is_fqzcomp() && self.sz[i] > best_sz {
                    methods.remove(method);
                }
            }
        }

        self.revised = Some(methods);
    }

    fn scale_costs(&mut self, weight: f64) {
        for method in Method::ALL {
            self.sz[method.index()] *= 1.0 + (method.cost() - 1.0) * weight;
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fail_sizes() -> [f64; Method::COUNT] {
        [1000.0; Method::COUNT]
    }

    #[test]
    fn test_method_bits_are_unique() {
        let mut seen = 0u64;

        for method in Method::ALL {
            assert_eq!(seen & method.bit(), 0);
            seen |= method.bit();
        }
    }

    #[test]
    fn test_method_set() {
        let mut set = MethodSet::empty();
        assert!(set.is_empty());

        set.insert(Method::Gzip);
        set.insert(Method::RansNx16O1);

        assert!(set.contains(Method::Gzip));
        assert!(!set.contains(Method::Bzip2));
        assert_eq!(set.iter().count(), 2);

        set.remove(Method::Gzip);
        assert!(!set.contains(Method::Gzip));

        let mut raw_only = MethodSet::empty();
        raw_only.insert(Method::Raw);
        assert!(raw_only.is_raw_only());
        assert!(!set.is_raw_only());
    }

    #[test]
    fn test_strip_pack_methods() {
        let set: MethodSet = [Method::Gzip, Method::RansNx16Pack0, Method::ArithPackRle1]
            .into_iter()
            .collect();

        let stripped = strip_pack_methods(set);

        assert!(!stripped.contains(Method::RansNx16Pack0));
        assert!(!stripped.contains(Method::ArithPackRle1));
        assert!(stripped.contains(Method::RansNx16O0));
        assert!(stripped.contains(Method::ArithRle0));
        assert!(stripped.contains(Method::ArithO1));
        assert!(stripped.contains(Method::Gzip));
    }

    #[test]
    fn test_first_probe_happens_at_block_one() {
        let mut metrics = Metrics::new();
        let requested: MethodSet = [Method::Gzip, Method::Bzip2].into_iter().collect();

        assert!(matches!(
            metrics.plan_block(requested),
            Plan::Trial(set) if set == requested
        ));
    }

    #[test]
    fn test_lock_in_after_trials() {
        let mut metrics = Metrics::new();
        let requested: MethodSet = [Method::Gzip, Method::Bzip2].into_iter().collect();

        for _ in 0..NTRIALS {
            let Plan::Trial(set) = metrics.plan_block(requested) else {
                panic!("expected a trial block");
            };

            let mut sizes = fail_sizes();
            sizes[Method::Gzip.index()] = 100.0;
            sizes[Method::Bzip2.index()] = 200.0;

            metrics.record_trial(&sizes, set, 5);
        }

        assert_eq!(metrics.method(), Method::Gzip);

        // follow-up confirmation trials run, then blocks lock in
        loop {
            match metrics.plan_block(requested) {
                Plan::Trial(set) => {
                    let mut sizes = fail_sizes();
                    sizes[Method::Gzip.index()] = 100.0;
                    sizes[Method::Bzip2.index()] = 200.0;
                    metrics.record_trial(&sizes, set, 5);
                }
                Plan::Locked(method) => {
                    assert_eq!(method, Method::Gzip);
                    break;
                }
            }
        }
    }

    #[test]
    fn test_chronic_loser_is_dropped() {
        let mut metrics = Metrics::new();
        let requested: MethodSet = [Method::Gzip, Method::Bzip2].into_iter().collect();

        // bzip2 loses badly in every window
        let mut windows = 0;

        while windows < 16 {
            match metrics.plan_block(requested) {
                Plan::Trial(set) => {
                    let mut sizes = fail_sizes();
                    sizes[Method::Gzip.index()] = 100.0;
                    sizes[Method::Bzip2.index()] = 500.0;
                    metrics.record_trial(&sizes, set, 5);
                    windows += 1;
                }
                Plan::Locked(_) => {}
            }
        }

        let revised = metrics.revised.expect("revised method set not set");
        assert!(!revised.contains(Method::Bzip2));
        assert!(revised.contains(Method::Gzip));
    }

    #[test]
    fn test_fqzcomp_is_dropped_after_a_single_losing_window() {
        let mut metrics = Metrics::new();
        let requested: MethodSet = [Method::Gzip, Method::Fqzcomp].into_iter().collect();

        for _ in 0..NTRIALS {
            let Plan::Trial(set) = metrics.plan_block(requested) else {
                panic!("expected a trial block");
            };

            let mut sizes = fail_sizes();
            sizes[Method::Gzip.index()] = 100.0;
            sizes[Method::Fqzcomp.index()] = 101.0;
            metrics.record_trial(&sizes, set, 5);
        }

        let revised = metrics.revised.expect("revised method set not set");
        assert!(!revised.contains(Method::Fqzcomp));
    }

    #[test]
    fn test_reset_forces_reprobe() {
        let mut metrics = Metrics::new();
        let requested: MethodSet = [Method::Gzip].into_iter().collect();

        // drain trials until locked
        loop {
            match metrics.plan_block(requested) {
                Plan::Trial(set) => {
                    let mut sizes = fail_sizes();
                    sizes[Method::Gzip.index()] = 100.0;
                    metrics.record_trial(&sizes, set, 5);
                }
                Plan::Locked(_) => break,
            }
        }

        metrics.reset();

        assert!(matches!(metrics.plan_block(requested), Plan::Trial(_)));
    }

    #[test]
    fn test_trial_cadence_bounded() {
        // over a long stream, a probe must recur at least every
        // TRIAL_SPAN * 2 blocks once confirmations max out
        let mut metrics = Metrics::new();
        let requested: MethodSet = [Method::Gzip].into_iter().collect();

        let mut since_last_trial = 0;

        for _ in 0..500 {
            match metrics.plan_block(requested) {
                Plan::Trial(set) => {
                    since_last_trial = 0;
                    let mut sizes = fail_sizes();
                    sizes[Method::Gzip.index()] = 100.0;
                    metrics.record_trial(&sizes, set, 5);
                }
                Plan::Locked(_) => {
                    since_last_trial += 1;
                    assert!(since_last_trial <= 2 * TRIAL_SPAN);
                }
            }
        }
    }
}
