//! Row sampling over chunked sources.
//!
//! Row-count sampling over a chunked source keeps a reservoir of at most
//! `sample_rows` rows, so memory stays bounded no matter how long the source
//! is. Fractional sampling draws from each chunk independently.

use crate::{ChunkSource, DataRow, DataSet, Result, ValidationError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Default number of rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Sampling options.
///
/// At most one of `sample_rows` and `sample_frac` may be set. With neither,
/// sampling returns the whole source.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOptions {
    /// Target number of rows
    pub sample_rows: Option<usize>,
    /// Fraction of rows to keep, in (0, 1]
    pub sample_frac: Option<f64>,
    /// Seed for reproducible samples
    pub seed: Option<u64>,
    /// Rows per chunk when reading a chunked source
    pub chunk_size: usize,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            sample_rows: None,
            sample_frac: None,
            seed: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SampleOptions {
    /// Samples a fixed number of rows.
    pub fn rows(count: usize) -> Self {
        Self {
            sample_rows: Some(count),
            ..Self::default()
        }
    }

    /// Samples a fraction of the rows.
    pub fn fraction(frac: f64) -> Self {
        Self {
            sample_frac: Some(frac),
            ..Self::default()
        }
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Rejects option combinations that cannot be sampled.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rows.is_some() && self.sample_frac.is_some() {
            return Err(ValidationError::configuration(
                "Specify only one of sample_rows or sample_frac",
            ));
        }
        if let Some(frac) = self.sample_frac {
            if !(frac > 0.0 && frac <= 1.0) {
                return Err(ValidationError::configuration(format!(
                    "sample_frac must be in (0, 1], got {}",
                    frac
                )));
            }
        }
        if self.chunk_size == 0 {
            return Err(ValidationError::configuration("chunk_size must be > 0"));
        }
        Ok(())
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Draws row samples from chunk sources.
pub struct Sampler;

impl Sampler {
    /// Samples `source` according to `options`.
    ///
    /// The same seed over the same source always yields the same rows. A
    /// reservoir sample holds `min(sample_rows, rows in source)` rows.
    pub fn sample<S: ChunkSource + ?Sized>(source: &S, options: &SampleOptions) -> Result<DataSet> {
        options.validate()?;

        if options.sample_rows.is_none() && options.sample_frac.is_none() {
            return source.load();
        }

        let mut rng = options.rng();

        if !source.supports_chunking() {
            let dataset = source.load()?;
            return Ok(match (options.sample_rows, options.sample_frac) {
                (Some(count), _) => sample_indices(dataset, count, &mut rng),
                (None, Some(frac)) => sample_fraction(dataset, frac, &mut rng),
                (None, None) => dataset,
            });
        }

        if let Some(count) = options.sample_rows {
            let mut reservoir = Reservoir::new(count);
            for chunk in source.iter_chunks(options.chunk_size)? {
                for row in chunk?.into_rows() {
                    reservoir.offer(row, &mut rng);
                }
            }
            debug!(
                "Reservoir kept {} of {} rows",
                reservoir.rows.len(),
                reservoir.seen
            );
            return Ok(DataSet::from_rows(reservoir.rows));
        }

        let frac = options.sample_frac.unwrap_or(1.0);
        let mut rows = Vec::new();
        for chunk in source.iter_chunks(options.chunk_size)? {
            rows.extend(sample_fraction(chunk?, frac, &mut rng).into_rows());
        }
        Ok(DataSet::from_rows(rows))
    }

    /// Samples up to `count` rows of an in-memory dataset, preserving row
    /// order.
    pub fn sample_rows(dataset: &DataSet, count: usize, seed: Option<u64>) -> DataSet {
        let mut rng = SampleOptions {
            seed,
            ..SampleOptions::default()
        }
        .rng();
        sample_indices(dataset.clone(), count, &mut rng)
    }
}

/// Algorithm R over a stream of rows.
struct Reservoir {
    capacity: usize,
    seen: usize,
    rows: Vec<DataRow>,
}

impl Reservoir {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: 0,
            rows: Vec::with_capacity(capacity.min(DEFAULT_CHUNK_SIZE)),
        }
    }

    fn offer(&mut self, row: DataRow, rng: &mut StdRng) {
        self.seen += 1;
        if self.rows.len() < self.capacity {
            self.rows.push(row);
            return;
        }
        let target = rng.gen_range(1..=self.seen);
        if target <= self.capacity {
            self.rows[target - 1] = row;
        }
    }
}

fn sample_indices(dataset: DataSet, count: usize, rng: &mut StdRng) -> DataSet {
    let len = dataset.len();
    if count >= len {
        return dataset;
    }
    let mut keep = vec![false; len];
    for index in rand::seq::index::sample(rng, len, count) {
        keep[index] = true;
    }
    dataset
        .into_rows()
        .into_iter()
        .zip(keep)
        .filter_map(|(row, kept)| kept.then_some(row))
        .collect()
}

fn sample_fraction(dataset: DataSet, frac: f64, rng: &mut StdRng) -> DataSet {
    let count = (frac * dataset.len() as f64).round() as usize;
    sample_indices(dataset, count, rng)
}
