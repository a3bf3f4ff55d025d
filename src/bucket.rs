use crate::error::BucketError;

/// kmalloc size classes, ascending.
pub const KMALLOC_BUCKETS: [u64; 13] = [8, 16, 32, 64, 96, 128, 192, 256, 512, 1024, 2048, 4096, 8192];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub index: usize,
    /// Exclusive lower bound: the previous class's ceiling.
    pub floor: u64,
    /// Inclusive upper bound.
    pub ceiling: u64,
}

impl Bucket {
    pub fn contains(&self, size: u64) -> bool {
        self.floor < size && size <= self.ceiling
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketTable {
    values: Vec<u64>,
}

impl Default for BucketTable {
    fn default() -> Self {
        Self {
            values: KMALLOC_BUCKETS.to_vec(),
        }
    }
}

impl BucketTable {
    pub fn new(values: Vec<u64>) -> Result<Self, BucketError> {
        if values.is_empty() {
            return Err(BucketError::InvalidTable("empty sequence".to_string()));
        }
        if values[0] == 0 {
            return Err(BucketError::InvalidTable("bucket sizes must be positive".to_string()));
        }
        if let Some(w) = values.windows(2).find(|w| w[0] >= w[1]) {
            return Err(BucketError::InvalidTable(format!(
                "sequence not strictly increasing at {} -> {}",
                w[0], w[1]
            )));
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn largest(&self) -> u64 {
        self.values.last().copied().unwrap_or(0)
    }

    /// Index of the smallest class that can hold `size`.
    pub fn find_bucket(&self, size: u64) -> Option<usize> {
        self.values.iter().position(|&v| v >= size)
    }

    pub fn floor(&self, index: usize) -> u64 {
        match index {
            0 => 0,
            i => self.values[i - 1],
        }
    }

    pub fn ceiling(&self, index: usize) -> u64 {
        self.values[index]
    }

    pub fn bucket(&self, index: usize) -> Bucket {
        Bucket {
            index,
            floor: self.floor(index),
            ceiling: self.ceiling(index),
        }
    }

    pub fn resolve(&self, size: u64) -> Result<Bucket, BucketError> {
        self.find_bucket(size)
            .map(|index| self.bucket(index))
            .ok_or(BucketError::TooLarge {
                size,
                largest: self.largest(),
            })
    }
}
