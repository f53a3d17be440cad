use serde::{Deserialize, Serialize};

/// Word-packed validity bitmap. A set bit marks a null element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NullBitmap {
    data: Vec<u64>,
    len: usize,
}

impl NullBitmap {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            len: 0,
        }
    }

    pub fn new_valid(len: usize) -> Self {
        let num_words = len.div_ceil(64);
        Self {
            data: vec![0; num_words],
            len,
        }
    }

    pub fn new_null(len: usize) -> Self {
        let num_words = len.div_ceil(64);
        Self {
            data: vec![u64::MAX; num_words],
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        if index >= self.len {
            return true;
        }
        let word = index / 64;
        let bit = index % 64;
        (self.data[word] >> bit) & 1 == 1
    }

    #[inline]
    pub fn is_valid(&self, index: usize) -> bool {
        !self.is_null(index)
    }

    #[inline]
    pub fn set(&mut self, index: usize, is_null: bool) {
        if index >= self.len {
            return;
        }
        let word = index / 64;
        let bit = index % 64;
        if is_null {
            self.data[word] |= 1 << bit;
        } else {
            self.data[word] &= !(1 << bit);
        }
    }

    #[inline]
    pub fn set_valid(&mut self, index: usize) {
        self.set(index, false);
    }

    #[inline]
    pub fn set_null(&mut self, index: usize) {
        self.set(index, true);
    }

    pub fn push(&mut self, is_null: bool) {
        let word = self.len / 64;
        let bit = self.len % 64;
        if word >= self.data.len() {
            self.data.push(0);
        }
        if is_null {
            self.data[word] |= 1 << bit;
        }
        self.len += 1;
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.len = 0;
    }

    pub fn count_null(&self) -> usize {
        self.count_null_range(0, self.len)
    }

    pub fn count_valid(&self) -> usize {
        self.len - self.count_null()
    }

    /// Population count of the null bits in `[offset, offset + len)`.
    ///
    /// The range is clamped to the bitmap length; sliced column views count
    /// their window through this.
    pub fn count_null_range(&self, offset: usize, len: usize) -> usize {
        let start = offset.min(self.len);
        let end = (offset + len).min(self.len);
        let mut count = 0usize;
        let mut i = start;
        while i < end {
            let word = i / 64;
            let bit = i % 64;
            if bit == 0 && i + 64 <= end {
                count += self.data[word].count_ones() as usize;
                i += 64;
            } else {
                count += ((self.data[word] >> bit) & 1) as usize;
                i += 1;
            }
        }
        count
    }

    pub fn is_all_null(&self) -> bool {
        self.len > 0 && self.count_null() == self.len
    }

    pub fn words(&self) -> &[u64] {
        &self.data
    }

    pub fn from_words(data: Vec<u64>, len: usize) -> Self {
        Self { data, len }
    }
}

impl Default for NullBitmap {
    fn default() -> Self {
        Self::new()
    }
}
