//! Page and column specializations of the breaking search.
//!
//! The core search only sees a capacity oracle; this module supplies the
//! page-shaped oracles, turns raw break points into page records with
//! materialization-ready ratios, and runs the column-balancing variant.

use serde::{Deserialize, Serialize};

use crate::break_engine::{
    Alignment, BreakError, BreakPoint, BreakerConfig, BreakingAlgorithm, BreakingResult,
    CapacityProvider,
};
use crate::element::ElementList;
use crate::observer::ObserverRegistry;

/// Column geometry of one page: per-column capacity and column count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    pub capacity: i32,
    pub columns: u32,
}

impl PageSpec {
    pub fn single_column(capacity: i32) -> Self {
        Self {
            capacity,
            columns: 1,
        }
    }
}

/// Capacity oracle for a page sequence where the first page may differ from
/// the rest (title regions, running headers).
///
/// Fragment indices are column indices in reading order; the oracle is
/// re-queried for every index the search considers, so a model with varying
/// page geometry stays cheap to swap in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageModel {
    first: PageSpec,
    rest: PageSpec,
}

impl PageModel {
    pub fn new(first: PageSpec, rest: PageSpec) -> Self {
        Self { first, rest }
    }

    pub fn uniform(spec: PageSpec) -> Self {
        Self {
            first: spec,
            rest: spec,
        }
    }

    fn spec_at(&self, fragment_index: usize) -> PageSpec {
        if fragment_index < self.first.columns as usize {
            self.first
        } else {
            self.rest
        }
    }
}

impl CapacityProvider for PageModel {
    fn capacity(&self, fragment_index: usize) -> i32 {
        let capacity = self.spec_at(fragment_index).capacity;
        log::trace!("capacity query: fragment {} -> {}", fragment_index, capacity);
        capacity
    }

    fn starts_new_page(&self, fragment_index: usize) -> bool {
        let first_columns = self.first.columns as usize;
        if fragment_index < first_columns {
            fragment_index == 0
        } else {
            (fragment_index - first_columns) % (self.rest.columns.max(1) as usize) == 0
        }
    }
}

/// One chosen break with its page classification and the adjustment ratio
/// to use when materializing the fragment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageBreakRecord {
    pub break_point: BreakPoint,
    /// Ratio after output clamping; may differ from the search-time ratio.
    pub adjust_ratio: f64,
    /// Gap left after adjustment (unfilled space at the fragment end).
    pub remaining_difference: i32,
    /// The fragment this break terminates is the last on its page.
    pub ends_page: bool,
    /// The fragment this break terminates opened a new page.
    pub starts_page: bool,
}

/// Runs the core search against a page model and classifies the results.
pub struct PageBreaker<'a> {
    cfg: BreakerConfig,
    model: &'a dyn CapacityProvider,
}

impl<'a> PageBreaker<'a> {
    pub fn new(cfg: BreakerConfig, model: &'a dyn CapacityProvider) -> Self {
        Self { cfg, model }
    }

    pub fn break_pages(&self, list: &ElementList) -> Result<Vec<PageBreakRecord>, BreakError> {
        let algorithm = BreakingAlgorithm::new(self.cfg, self.model);
        let result = algorithm.find_break_points(list)?;
        Ok(self.materialize(&result))
    }

    /// [`break_pages`](Self::break_pages) with the finalized sequence first
    /// handed to the supplied observers.
    pub fn break_pages_observed(
        &self,
        list: &ElementList,
        observers: &mut ObserverRegistry,
        category: &str,
        id: Option<&str>,
    ) -> Result<Vec<PageBreakRecord>, BreakError> {
        let algorithm = BreakingAlgorithm::new(self.cfg, self.model);
        let result = algorithm.find_break_points_observed(list, observers, category, id)?;
        Ok(self.materialize(&result))
    }

    fn materialize(&self, result: &BreakingResult) -> Vec<PageBreakRecord> {
        let count = result.breaks.len();
        let justify_last = self.cfg.alignment_last == Alignment::Justify;
        result
            .breaks
            .iter()
            .enumerate()
            .map(|(i, bp)| {
                if bp.overflow > 0 {
                    log::warn!(
                        "fragment {} overflows its capacity by {}",
                        bp.fragment,
                        bp.overflow
                    );
                }
                let is_last = i + 1 == count;
                let (adjust_ratio, remaining_difference) =
                    clamp_for_output(bp, is_last, justify_last);
                // fragment numbers are 1-based, oracle indices 0-based
                let starts_page = self.model.starts_new_page(bp.fragment - 1);
                let ends_page = is_last || self.model.starts_new_page(bp.fragment);
                PageBreakRecord {
                    break_point: *bp,
                    adjust_ratio,
                    remaining_difference,
                    ends_page,
                    starts_page,
                }
            })
            .collect()
    }
}

/// Output clamping of the search-time ratio.
///
/// Shrunk fragments keep their ratio with no residual gap; stretched
/// fragments within bounds fill completely; over-stretched fragments stop at
/// full stretch and report the leftover gap. The final fragment is stretched
/// only under justified last-fragment alignment; otherwise it stays ragged
/// with the whole slack reported.
fn clamp_for_output(bp: &BreakPoint, is_last: bool, justify_last: bool) -> (f64, i32) {
    if bp.adjust_ratio < 0.0 {
        (bp.adjust_ratio, 0)
    } else if is_last && !justify_last {
        (0.0, bp.difference)
    } else if bp.adjust_ratio <= 1.0 {
        (bp.adjust_ratio, 0)
    } else {
        (1.0, bp.difference - bp.available_stretch)
    }
}

/// Balances content across a fixed number of columns.
///
/// Demerits switch from the badness formula to squared deviation from the
/// per-column mean, so the search prefers equal column lengths over loose
/// fits, and a partition can never use more columns than the budget.
pub struct ColumnBalancer<'a> {
    cfg: BreakerConfig,
    model: &'a dyn CapacityProvider,
    budget: usize,
}

impl<'a> ColumnBalancer<'a> {
    pub fn new(cfg: BreakerConfig, model: &'a dyn CapacityProvider, budget: usize) -> Self {
        Self { cfg, model, budget }
    }

    pub fn balance(&self, list: &ElementList) -> Result<BreakingResult, BreakError> {
        let algorithm = BreakingAlgorithm::balanced(self.cfg, self.model, self.budget);
        algorithm.find_break_points(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{BreakClass, Element, ElementList};
    use crate::element_utils::content_length;

    /// Block content of `count` segments, one box each, separated by forced
    /// column breaks, with a stretchy tail so the last fragment stays ragged.
    fn forced_columns(count: usize, box_width: i32) -> ElementList {
        let mut list = ElementList::block();
        for i in 0..count {
            list.append(Element::new_box(box_width));
            list.append(Element::glue(0, 100_000, 0));
            if i + 1 < count {
                list.append(Element::forced_break(BreakClass::Column));
            }
        }
        list.append(Element::forced_break(BreakClass::Page));
        list.close();
        list
    }

    #[test]
    fn page_model_varies_first_page() {
        let model = PageModel::new(
            PageSpec {
                capacity: 70,
                columns: 1,
            },
            PageSpec {
                capacity: 100,
                columns: 2,
            },
        );
        assert_eq!(model.capacity(0), 70);
        assert_eq!(model.capacity(1), 100);
        assert_eq!(model.capacity(5), 100);
    }

    #[test]
    fn page_model_classifies_page_starts() {
        // One column on page 1, two per page after that.
        let model = PageModel::new(
            PageSpec {
                capacity: 100,
                columns: 1,
            },
            PageSpec {
                capacity: 100,
                columns: 2,
            },
        );
        assert!(model.starts_new_page(0));
        assert!(model.starts_new_page(1));
        assert!(!model.starts_new_page(2));
        assert!(model.starts_new_page(3));
        assert!(!model.starts_new_page(4));
    }

    #[test]
    fn break_records_carry_page_classification() {
        let model = PageModel::uniform(PageSpec {
            capacity: 100,
            columns: 2,
        });
        let list = forced_columns(4, 40);
        let breaker = PageBreaker::new(BreakerConfig::default(), &model);
        let records = breaker.break_pages(&list).unwrap();
        assert_eq!(records.len(), 4);
        // Two columns per page: fragments 1 and 3 open pages, breaks after
        // fragments 2 and 4 close them.
        assert_eq!(
            records.iter().map(|r| r.starts_page).collect::<Vec<_>>(),
            vec![true, false, true, false]
        );
        assert_eq!(
            records.iter().map(|r| r.ends_page).collect::<Vec<_>>(),
            vec![false, true, false, true]
        );
    }

    #[test]
    fn interior_over_stretch_clamps_to_full_stretch() {
        // First fragment is 90 against capacity 100 with only 5 of stretch:
        // search-time ratio 2.0, output clamps to 1.0 with a gap of 5 left.
        let mut list = ElementList::block();
        list.append(Element::new_box(40));
        list.append(Element::glue(10, 5, 5));
        list.append(Element::new_box(40));
        list.append(Element::forced_break(BreakClass::Column));
        list.append(Element::new_box(40));
        list.append(Element::glue(0, 100_000, 0));
        list.append(Element::forced_break(BreakClass::Page));
        list.close();
        let model = PageModel::uniform(PageSpec::single_column(100));
        let breaker = PageBreaker::new(BreakerConfig::default(), &model);
        let records = breaker.break_pages(&list).unwrap();
        assert_eq!(records.len(), 2);
        let first = records[0];
        assert!((first.break_point.adjust_ratio - 2.0).abs() < 1e-9);
        assert!((first.adjust_ratio - 1.0).abs() < 1e-9);
        assert_eq!(first.remaining_difference, 5);
    }

    #[test]
    fn final_fragment_is_never_stretched() {
        let mut list = ElementList::block();
        list.append(Element::new_box(40));
        list.append(Element::glue(0, 100_000, 0));
        list.append(Element::forced_break(BreakClass::Page));
        list.close();
        let model = PageModel::uniform(PageSpec::single_column(100));
        let breaker = PageBreaker::new(BreakerConfig::default(), &model);
        let records = breaker.break_pages(&list).unwrap();
        assert_eq!(records.len(), 1);
        let only = records[0];
        assert!(only.break_point.adjust_ratio > 0.0);
        assert_eq!(only.adjust_ratio, 0.0);
        assert_eq!(only.remaining_difference, only.break_point.difference);
        assert!(only.ends_page && only.starts_page);
    }

    #[test]
    fn justified_last_fragment_keeps_its_stretch() {
        let mut list = ElementList::block();
        list.append(Element::new_box(40));
        list.append(Element::glue(0, 100, 0));
        list.append(Element::forced_break(BreakClass::Page));
        list.close();
        let model = PageModel::uniform(PageSpec::single_column(100));
        let cfg = BreakerConfig {
            alignment_last: Alignment::Justify,
            ..BreakerConfig::default()
        };
        let breaker = PageBreaker::new(cfg, &model);
        let records = breaker.break_pages(&list).unwrap();
        assert_eq!(records.len(), 1);
        let only = records[0];
        assert!((only.adjust_ratio - 0.6).abs() < 1e-9);
        assert_eq!(only.remaining_difference, 0);
    }

    #[test]
    fn balancer_spreads_content_evenly() {
        // 900 units of content over a budget of 3 columns of 320: the
        // balanced search lands on three fragments of 300.
        let mut list = ElementList::block();
        for i in 0..9 {
            list.append(Element::new_box(100));
            if i < 8 {
                list.append(Element::glue(0, 30, 30));
            }
        }
        list.append(Element::glue(0, 100_000, 0));
        list.append(Element::forced_break(BreakClass::Page));
        list.close();
        let model = PageModel::uniform(PageSpec::single_column(320));
        let balancer = ColumnBalancer::new(BreakerConfig::default(), &model, 3);
        let result = balancer.balance(&list).unwrap();
        assert_eq!(result.breaks.len(), 3);
        let mut start = 0;
        for b in &result.breaks {
            let length = content_length(&list, start, b.index.saturating_sub(1));
            assert!(
                (length - 300).abs() <= 30,
                "fragment {} length {} strays from the mean",
                b.fragment,
                length
            );
            start = b.index + 1;
        }
    }

    #[test]
    fn balancer_never_exceeds_budget() {
        let mut list = ElementList::block();
        for i in 0..6 {
            list.append(Element::new_box(100));
            if i < 5 {
                list.append(Element::glue(0, 50, 50));
            }
        }
        list.append(Element::glue(0, 100_000, 0));
        list.append(Element::forced_break(BreakClass::Page));
        list.close();
        let model = PageModel::uniform(PageSpec::single_column(250));
        let balancer = ColumnBalancer::new(BreakerConfig::default(), &model, 3);
        let result = balancer.balance(&list).unwrap();
        assert!(result.breaks.len() <= 3);
    }
}
