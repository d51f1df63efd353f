//! Text normalization: canonical token sequences, display cleaning, person
//! name extraction and specialty canonicalization.
//!
//! The same raw strings recur across millions of comparisons in a large
//! batch, so the tokenizer result is memoized in a capped LRU cache owned by
//! the [`Normalizer`] rather than hidden module state; tests can reset it.

pub mod extract;
pub mod specialty;
mod tokens;
pub mod vocab;

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::config::TOKEN_CACHE_CAPACITY;

pub use extract::extract_person_name_smart;
pub use tokens::title_case;

pub struct Normalizer {
    cache: Mutex<LruCache<(String, bool), Vec<String>>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::with_capacity(TOKEN_CACHE_CAPACITY)
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Normalizer {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Canonical lowercase token sequence for `raw`. Pure function of
    /// `(raw, is_person)`; memoized.
    pub fn tokens(&self, raw: &str, is_person: bool) -> Vec<String> {
        let key = (raw.to_string(), is_person);
        let mut cache = self.cache.lock().expect("token cache poisoned");
        if let Some(hit) = cache.get(&key) {
            return hit.clone();
        }
        let computed = tokens::tokenize(raw, is_person);
        cache.put(key, computed.clone());
        computed
    }

    /// Tokens joined and title-cased for display; also the `Alias_Clean` key
    /// when `is_person` is true.
    pub fn clean_name(&self, raw: &str, is_person: bool) -> String {
        title_case(&self.tokens(raw, is_person).join(" "))
    }

    /// Number of memoized entries, for observability and tests.
    pub fn cache_len(&self) -> usize {
        self.cache.lock().expect("token cache poisoned").len()
    }

    /// Drop all memoized entries. Intended for test isolation.
    pub fn reset_cache(&self) {
        self.cache.lock().expect("token cache poisoned").clear();
    }
}
