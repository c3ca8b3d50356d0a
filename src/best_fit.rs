//! Discrete alternative selection: pick one variant of a block from a small
//! set of pre-measured candidates, without running the full search.
//!
//! Producers measure each variant up front and record whether it fits and
//! how much capacity would remain after inserting it; strategies are pure
//! selection over those records.

use crate::element::ElementList;

/// One pre-measured candidate rendering of a block.
#[derive(Clone, Debug, PartialEq)]
pub struct FitVariant {
    pub list: ElementList,
    /// Content length of the variant.
    pub length: i32,
    /// Capacity left after inserting the variant; negative when it overruns.
    pub remaining: i32,
    /// Whether the variant fits its context at all.
    pub enabled: bool,
}

/// Selection rule over a slice of variants.
///
/// The strategy names are a long-standing behavioral contract and do not
/// describe the remaining space: `SmallestFit` picks the enabled variant
/// with the *largest* remaining capacity (the smallest content), and
/// `BiggestFit` the enabled variant with the smallest non-negative
/// remaining capacity (the biggest content that still fits).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FittingStrategy {
    #[default]
    FirstFit,
    SmallestFit,
    BiggestFit,
}

impl FittingStrategy {
    /// Index of the chosen variant, `None` when nothing is enabled.
    pub fn select(self, variants: &[FitVariant]) -> Option<usize> {
        match self {
            Self::FirstFit => variants.iter().position(|v| v.enabled),
            Self::SmallestFit => variants
                .iter()
                .enumerate()
                .filter(|(_, v)| v.enabled)
                .max_by_key(|(_, v)| v.remaining)
                .map(|(i, _)| i),
            Self::BiggestFit => variants
                .iter()
                .enumerate()
                .filter(|(_, v)| v.enabled && v.remaining >= 0)
                .min_by_key(|(_, v)| v.remaining)
                .map(|(i, _)| i),
        }
    }
}

/// A block with several candidate renderings, resolved to exactly one.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct AlternativeBlock {
    variants: Vec<FitVariant>,
}

impl AlternativeBlock {
    pub fn new(variants: Vec<FitVariant>) -> Self {
        Self { variants }
    }

    pub fn push(&mut self, variant: FitVariant) {
        self.variants.push(variant);
    }

    pub fn variants(&self) -> &[FitVariant] {
        &self.variants
    }

    /// Consume the block, returning the chosen variant's element list.
    ///
    /// Losing variants are discarded entirely; `None` when no variant is
    /// enabled (the caller decides whether that means "omit the block" or
    /// an upstream sizing bug).
    pub fn resolve(self, strategy: FittingStrategy) -> Option<ElementList> {
        let chosen = strategy.select(&self.variants)?;
        self.variants
            .into_iter()
            .nth(chosen)
            .map(|variant| variant.list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    fn variant(length: i32, remaining: i32, enabled: bool) -> FitVariant {
        let mut list = ElementList::block();
        list.append(Element::new_box(length));
        FitVariant {
            list,
            length,
            remaining,
            enabled,
        }
    }

    /// A(100, rem 50, enabled), B(80, rem 70, enabled), C(120, rem -10,
    /// disabled).
    fn standard_variants() -> Vec<FitVariant> {
        vec![
            variant(100, 50, true),
            variant(80, 70, true),
            variant(120, -10, false),
        ]
    }

    #[test]
    fn first_fit_takes_first_enabled() {
        assert_eq!(FittingStrategy::FirstFit.select(&standard_variants()), Some(0));
    }

    #[test]
    fn smallest_fit_takes_largest_remaining() {
        assert_eq!(
            FittingStrategy::SmallestFit.select(&standard_variants()),
            Some(1)
        );
    }

    #[test]
    fn biggest_fit_takes_smallest_nonnegative_remaining() {
        assert_eq!(
            FittingStrategy::BiggestFit.select(&standard_variants()),
            Some(0)
        );
    }

    #[test]
    fn disabled_variants_are_never_chosen() {
        let variants = vec![variant(120, 200, false), variant(60, 10, true)];
        for strategy in [
            FittingStrategy::FirstFit,
            FittingStrategy::SmallestFit,
            FittingStrategy::BiggestFit,
        ] {
            assert_eq!(strategy.select(&variants), Some(1), "{:?}", strategy);
        }
    }

    #[test]
    fn no_enabled_variant_yields_none() {
        let variants = vec![variant(100, 50, false), variant(80, 70, false)];
        assert_eq!(FittingStrategy::FirstFit.select(&variants), None);
        assert_eq!(FittingStrategy::SmallestFit.select(&variants), None);
        assert_eq!(FittingStrategy::BiggestFit.select(&variants), None);

        let block = AlternativeBlock::new(variants);
        assert!(block.resolve(FittingStrategy::FirstFit).is_none());
    }

    #[test]
    fn biggest_fit_skips_negative_remaining() {
        // Enabled but overrunning: biggest-fit refuses it, first-fit does not
        // second-guess the producer's enabled flag.
        let variants = vec![variant(120, -10, true), variant(60, 40, true)];
        assert_eq!(FittingStrategy::BiggestFit.select(&variants), Some(1));
        assert_eq!(FittingStrategy::FirstFit.select(&variants), Some(0));
    }

    #[test]
    fn resolve_returns_the_chosen_list() {
        let block = AlternativeBlock::new(standard_variants());
        let list = block.resolve(FittingStrategy::SmallestFit).unwrap();
        assert_eq!(list.get(0).unwrap().width(), 80);
    }

    #[test]
    fn smallest_fit_tie_picks_a_maximal_variant() {
        let variants = vec![variant(90, 60, true), variant(80, 60, true)];
        // max_by_key returns the last maximal element; the contract only
        // promises *an* enabled variant with maximal remaining.
        let chosen = FittingStrategy::SmallestFit.select(&variants);
        assert!(chosen == Some(0) || chosen == Some(1));
    }
}
