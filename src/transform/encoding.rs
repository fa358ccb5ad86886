//! Categorical encoding with an explicit fallback code.
//!
//! Categories are learned once at fit time as a stable sorted list; every
//! encoder reserves one extra code — the fallback — for values never seen
//! during fitting. Resolution is explicit: [`CategoryCode::Known`] carries
//! the fitted code, [`CategoryCode::Fallback`] marks an unseen value. An
//! unseen category never errors; callers decide what the fallback means
//! (the predictor surfaces it as a low-confidence flag).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result of resolving a category value against fitted categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryCode {
    /// The value was seen during fit; carries its stable code.
    Known(usize),
    /// The value was never seen during fit; maps to the reserved slot.
    Fallback,
}

/// A fitted category-to-code mapping for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    /// Sorted unique categories seen during fit. Codes are indices into
    /// this list; the fallback code is `categories.len()`.
    categories: Vec<String>,
}

impl CategoryEncoder {
    /// Learn the category set from training values.
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unique: BTreeSet<&str> = values.into_iter().collect();
        Self {
            categories: unique.into_iter().map(str::to_string).collect(),
        }
    }

    /// Resolve a value to its tagged code.
    pub fn resolve(&self, value: &str) -> CategoryCode {
        match self.categories.binary_search_by(|c| c.as_str().cmp(value)) {
            Ok(idx) => CategoryCode::Known(idx),
            Err(_) => CategoryCode::Fallback,
        }
    }

    /// The numeric code for a value; the fallback code for unseen values.
    pub fn code(&self, value: &str) -> usize {
        match self.resolve(value) {
            CategoryCode::Known(idx) => idx,
            CategoryCode::Fallback => self.categories.len(),
        }
    }

    /// Recover the category for a code. The fallback code has no category.
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.categories.get(code).map(String::as_str)
    }

    /// Output width of the one-hot encoding: fitted categories plus the
    /// reserved fallback slot.
    pub fn n_codes(&self) -> usize {
        self.categories.len() + 1
    }

    /// Append the one-hot encoding of `value` to `out`. Returns `true` when
    /// the fallback slot was used.
    pub fn one_hot_into(&self, value: &str, out: &mut Vec<f64>) -> bool {
        let code = self.code(value);
        let start = out.len();
        out.resize(start + self.n_codes(), 0.0);
        out[start + code] = 1.0;
        code == self.categories.len()
    }

    /// The fitted categories, sorted.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}
