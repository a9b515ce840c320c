use crate::{error::BitterError, report::ResultTable, store::Store};
use itertools::Itertools;

/// Capability boundary for user interaction. Core lookups never touch a
/// terminal or dialog directly.
pub trait Presenter {
    /// Offers `options` for single selection. `None` means the user declined.
    fn choose(&mut self, title: &str, prompt: &str, options: &[i64]) -> Option<i64>;
    fn render_table(&mut self, table: &ResultTable);
    fn report(&mut self, message: &str);
    fn confirm(&mut self, question: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(ResultTable),
    /// The user declined the identifier selection. Rendered as an empty
    /// table, not as "not found".
    Cancelled,
    NotFound,
}

/// Resolves a search term against compounds first, then receptors.
///
/// Matching compound names trigger an identifier selection; the chosen
/// identifier is resolved to its receptors. A declined selection cancels
/// the search. A chosen identifier without receptor links, or a term that
/// is no compound name at all, falls back to the receptor-name lookup.
pub fn run_search(
    store: &Store,
    presenter: &mut dyn Presenter,
    term: &str,
) -> Result<SearchOutcome, BitterError> {
    let candidates = store.compounds_by_name(term)?;
    if !candidates.is_empty() {
        let ids: Vec<i64> = candidates.iter().map(|hit| hit.id).unique().collect();
        match presenter.choose("Select compound", "Select Bitter ID", &ids) {
            None => return Ok(SearchOutcome::Cancelled),
            Some(id) => {
                let receptors = store.receptors_by_compound(term, id)?;
                if !receptors.is_empty() {
                    return Ok(SearchOutcome::Found(ResultTable::receptor_results(
                        term, id, &receptors,
                    )));
                }
            }
        }
    }

    let hits = store.compounds_by_receptor(term)?;
    if hits.is_empty() {
        return Ok(SearchOutcome::NotFound);
    }
    Ok(SearchOutcome::Found(ResultTable::compound_results(
        term, &hits,
    )))
}
