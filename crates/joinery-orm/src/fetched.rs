//! Fetched result sets.

use std::sync::Arc;

use joinery_core::row::ResultRow;
use joinery_core::{Result, SelectList};

/// The rows of one fetch, decoded as they are consumed.
///
/// Every row is already materialised; decoding into the select list's row
/// type happens in [`Iterator::next`]. A `Fetched` can be iterated once.
pub struct Fetched<L: SelectList> {
    list: Arc<L>,
    rows: std::vec::IntoIter<ResultRow>,
}

impl<L: SelectList> Fetched<L> {
    pub(crate) fn new(list: Arc<L>, rows: Vec<ResultRow>) -> Self {
        Self {
            list,
            rows: rows.into_iter(),
        }
    }

    /// Rows not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Decodes every remaining row.
    ///
    /// # Errors
    ///
    /// Returns the first mapping error.
    pub fn collect_rows(self) -> Result<Vec<L::Row>> {
        self.collect()
    }

    /// The remaining rows, undecoded.
    #[must_use]
    pub fn into_result_rows(self) -> Vec<ResultRow> {
        self.rows.collect()
    }
}

impl<L: SelectList> Iterator for Fetched<L> {
    type Item = Result<L::Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(self.list.decode_row(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<L: SelectList> ExactSizeIterator for Fetched<L> {}

impl<L: SelectList> std::fmt::Debug for Fetched<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetched")
            .field("remaining", &self.rows.len())
            .finish_non_exhaustive()
    }
}
