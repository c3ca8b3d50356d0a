//! Constrained line and page breaking over box/glue/penalty element lists.
//!
//! Producers flatten their content into [`ElementList`] sequences, close
//! them, and hand them to a [`BreakingAlgorithm`] together with a
//! [`CapacityProvider`]. The search returns globally near-optimal break
//! positions with per-fragment adjustment ratios; the page module layers
//! page/column classification and balancing on top, and the best-fit module
//! handles discrete pick-one-variant decisions that need no search at all.

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod best_fit;
mod break_engine;
mod element;
mod element_utils;
mod observer;
mod page_breaking;

pub use best_fit::{AlternativeBlock, FitVariant, FittingStrategy};
pub use break_engine::{
    Alignment, Attempt, BreakError, BreakPoint, BreakerConfig, BreakingAlgorithm, BreakingResult,
    CapacityProvider, Fitness, FixedCapacity, INFINITE_RATIO,
};
pub use element::{
    BreakClass, Element, ElementList, Position, SequenceKind, FORCED_BREAK_PENALTY,
    INFINITE_PENALTY,
};
pub use element_utils::{
    content_length, determine_previous_break, ends_with_forced_break, full_content_length,
    remove_legal_breaks, remove_legal_breaks_from_end, starts_with_forced_break,
};
pub use observer::{ElementListObserver, LoggingObserver, ObserverRegistry};
pub use page_breaking::{ColumnBalancer, PageBreakRecord, PageBreaker, PageModel, PageSpec};
