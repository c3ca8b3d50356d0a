//! Active-node dynamic-programming search over a closed element sequence.
//!
//! The search walks the sequence once per attempt, keeping a set of active
//! nodes (feasible partial solutions) bucketed by fragment number. Each legal
//! break is evaluated against every active node; admissible candidates become
//! new nodes, dominated nodes are pruned eagerly, and forced breaks retire
//! the whole active set into the break. Back-pointers live in a per-run arena
//! so pruning never invalidates a winning path.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::element::{Element, ElementList, FORCED_BREAK_PENALTY, INFINITE_PENALTY};
use crate::observer::ObserverRegistry;

/// Adjustment-ratio sentinel for "no stretch/shrink available".
pub const INFINITE_RATIO: f64 = 1000.0;

const FITNESS_CLASSES: usize = 4;

/// Fragment content alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    Start,
    Center,
    End,
    #[default]
    Justify,
}

/// Tuning knobs for a breaking run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BreakerConfig {
    /// Alignment for every fragment but the last.
    pub alignment: Alignment,
    /// Alignment for the last fragment. `Justify` lets page materialization
    /// stretch the final fragment; anything else leaves it ragged.
    pub alignment_last: Alignment,
    /// Maximum admissible adjustment ratio on the first (strict) attempt.
    pub tolerance: f64,
    /// Ratio ceiling once the strict attempt found nothing.
    pub relaxed_tolerance: f64,
    /// Maximum run of consecutive flagged-penalty breaks (0 = unlimited).
    pub max_flagged_penalties: u8,
    /// Whether flagged penalties are legal breaks at all.
    pub allow_flagged_breaks: bool,
    /// Surcharge for two consecutive breaks at flagged penalties.
    pub repeated_flagged_demerit: f64,
    /// Surcharge when consecutive fragments land in fitness classes more
    /// than one step apart.
    pub incompatible_fitness_demerit: f64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            alignment: Alignment::Justify,
            alignment_last: Alignment::Start,
            tolerance: 1.0,
            relaxed_tolerance: 5.0,
            max_flagged_penalties: 0,
            allow_flagged_breaks: true,
            repeated_flagged_demerit: 50.0,
            incompatible_fitness_demerit: 50.0,
        }
    }
}

/// Discrete looseness category of a fragment's adjustment ratio.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fitness {
    Tight,
    Normal,
    Loose,
    VeryLoose,
}

impl Fitness {
    /// Fixed thresholds at -0.5 / 0.5 / 1.0.
    pub fn classify(ratio: f64) -> Self {
        if ratio < -0.5 {
            Self::Tight
        } else if ratio <= 0.5 {
            Self::Normal
        } else if ratio <= 1.0 {
            Self::Loose
        } else {
            Self::VeryLoose
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Tight => 0,
            Self::Normal => 1,
            Self::Loose => 2,
            Self::VeryLoose => 3,
        }
    }

    fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Tight,
            1 => Self::Normal,
            2 => Self::Loose,
            _ => Self::VeryLoose,
        }
    }

    fn distance(self, other: Self) -> usize {
        self.index().abs_diff(other.index())
    }
}

/// Escalation state of the retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attempt {
    /// Configured tolerance, shrink bounded at ratio -1.
    Strict,
    /// Widened tolerance, overfull fragments admissible.
    Relaxed,
    /// Relaxed plus mid-scan recovery; always converges to some path.
    Forced,
}

impl Attempt {
    fn next(self) -> Option<Self> {
        match self {
            Self::Strict => Some(Self::Relaxed),
            Self::Relaxed => Some(Self::Forced),
            Self::Forced => None,
        }
    }
}

/// One chosen break in forward order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakPoint {
    /// Index of the break element in the input sequence.
    pub index: usize,
    /// Index of the first content element of the fragment this break ends.
    pub start: usize,
    /// 1-based number of the fragment this break terminates.
    pub fragment: usize,
    /// Glue adjustment ratio for materializing the fragment.
    pub adjust_ratio: f64,
    /// Capacity minus content; negative when the fragment is overfull.
    pub difference: i32,
    /// Total glue stretch available inside the fragment.
    pub available_stretch: i32,
    /// Content beyond capacity that even full shrink cannot absorb.
    pub overflow: i32,
}

/// Result of a completed breaking run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakingResult {
    pub breaks: Vec<BreakPoint>,
    /// Which attempt of the escalation ladder produced the path.
    pub attempt: Attempt,
    pub total_demerits: f64,
}

impl BreakingResult {
    fn empty() -> Self {
        Self {
            breaks: Vec::new(),
            attempt: Attempt::Strict,
            total_demerits: 0.0,
        }
    }
}

/// Structural misuse of the engine (upstream contract violations).
///
/// "Content does not fit nicely" is never an error; the escalation ladder
/// handles it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BreakError {
    /// The sequence was never closed.
    NotClosed,
    /// An unresolved element survived the resolution pass.
    Unresolved { index: usize },
    /// The sequence does not end with a forced break.
    MissingForcedBreak,
    /// Non-empty unbreakable content against a fragment with no capacity.
    ZeroCapacity { fragment: usize },
}

impl core::fmt::Display for BreakError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotClosed => write!(f, "element sequence was not closed before breaking"),
            Self::Unresolved { index } => {
                write!(f, "unresolved element at index {} reached the breaker", index)
            }
            Self::MissingForcedBreak => {
                write!(f, "element sequence does not end with a forced break")
            }
            Self::ZeroCapacity { fragment } => write!(
                f,
                "fragment {} has no capacity for non-empty unbreakable content",
                fragment
            ),
        }
    }
}

impl std::error::Error for BreakError {}

/// Per-fragment capacity oracle.
///
/// Page capacities vary (regions, headers, column counts), so the search
/// re-queries for every fragment index it considers instead of caching.
pub trait CapacityProvider {
    fn capacity(&self, fragment_index: usize) -> i32;

    /// Whether the fragment at this index opens a new page. Page models
    /// override this; plain line breaking never starts pages.
    fn starts_new_page(&self, fragment_index: usize) -> bool {
        let _ = fragment_index;
        false
    }
}

/// Constant capacity for plain line breaking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedCapacity(pub i32);

impl CapacityProvider for FixedCapacity {
    fn capacity(&self, _fragment_index: usize) -> i32 {
        self.0
    }
}

/// Minimum-demerit breaking over a closed element sequence.
pub struct BreakingAlgorithm<'a> {
    cfg: BreakerConfig,
    capacity: &'a dyn CapacityProvider,
    balance_budget: Option<usize>,
}

impl<'a> BreakingAlgorithm<'a> {
    pub fn new(cfg: BreakerConfig, capacity: &'a dyn CapacityProvider) -> Self {
        Self {
            cfg,
            capacity,
            balance_budget: None,
        }
    }

    /// Balancing variant: demerits favor equal fragment lengths and the
    /// fragment count may never exceed `budget`.
    pub(crate) fn balanced(
        cfg: BreakerConfig,
        capacity: &'a dyn CapacityProvider,
        budget: usize,
    ) -> Self {
        Self {
            cfg,
            capacity,
            balance_budget: Some(budget),
        }
    }

    /// Find the minimum-demerit partition of `list`.
    pub fn find_break_points(&self, list: &ElementList) -> Result<BreakingResult, BreakError> {
        let mut observers = ObserverRegistry::default();
        self.find_break_points_observed(list, &mut observers, "break-sequence", None)
    }

    /// Like [`find_break_points`](Self::find_break_points), first handing the
    /// finalized sequence to the supplied observers.
    pub fn find_break_points_observed(
        &self,
        list: &ElementList,
        observers: &mut ObserverRegistry,
        category: &str,
        id: Option<&str>,
    ) -> Result<BreakingResult, BreakError> {
        self.validate(list)?;
        observers.observe(list, category, id);

        if list.first_box_index(0).is_none() {
            return Ok(BreakingResult::empty());
        }

        let mut attempt = Attempt::Strict;
        loop {
            if let Some(result) = self.run_attempt(list, attempt) {
                if attempt != Attempt::Strict {
                    log::debug!(
                        "breaking converged on {:?} attempt with {} fragment(s)",
                        attempt,
                        result.breaks.len()
                    );
                }
                return Ok(result);
            }
            match attempt.next() {
                Some(next) => {
                    log::debug!("breaking found no admissible path, escalating to {:?}", next);
                    attempt = next;
                }
                None => {
                    // Forced always converges; reaching this means the
                    // sequence had no legal break at all, which validation
                    // rules out via the terminal forced break.
                    return Err(BreakError::MissingForcedBreak);
                }
            }
        }
    }

    fn validate(&self, list: &ElementList) -> Result<(), BreakError> {
        if !list.is_closed() {
            return Err(BreakError::NotClosed);
        }
        if let Some(index) = list.iter().position(Element::is_unresolved) {
            return Err(BreakError::Unresolved { index });
        }
        if !list.is_empty() && !list.last().is_some_and(Element::is_forced_break) {
            return Err(BreakError::MissingForcedBreak);
        }
        let has_content = list.iter().any(|e| e.is_box() && e.width() > 0);
        if has_content && self.capacity.capacity(0) <= 0 {
            return Err(BreakError::ZeroCapacity { fragment: 0 });
        }
        Ok(())
    }

    fn run_attempt(&self, list: &ElementList, attempt: Attempt) -> Option<BreakingResult> {
        let elements = list.as_slice();
        let first_box = list.first_box_index(0)?;
        let start_index = if self.cfg.alignment == Alignment::Center {
            0
        } else {
            first_box
        };

        let mut run = Run::new(self.cfg, self.capacity, elements, attempt, self.balance_budget);
        run.start(start_index);

        let mut previous_is_word_box = false;
        let mut i = start_index;
        while i < elements.len() {
            match &elements[i] {
                e if e.is_box() => {
                    run.total_width += e.width();
                    previous_is_word_box = !e.is_auxiliary();
                }
                Element::Glue {
                    width,
                    stretch,
                    shrink,
                    ..
                } => {
                    if previous_is_word_box {
                        run.consider_legal_break(BreakCandidate {
                            index: i,
                            width: 0,
                            penalty: None,
                            flagged: false,
                        });
                    }
                    run.total_width += width;
                    run.total_stretch += stretch;
                    run.total_shrink += shrink;
                    previous_is_word_box = false;
                }
                Element::Penalty {
                    width,
                    value,
                    flagged,
                    ..
                } => {
                    if *value < INFINITE_PENALTY && (self.cfg.allow_flagged_breaks || !flagged) {
                        run.consider_legal_break(BreakCandidate {
                            index: i,
                            width: *width,
                            penalty: Some(*value),
                            flagged: *flagged,
                        });
                    }
                    previous_is_word_box = false;
                }
                _ => {
                    previous_is_word_box = false;
                }
            }

            if run.active_count == 0 {
                if attempt != Attempt::Forced {
                    return None;
                }
                let restart = run.recovery_node()?;
                log::debug!(
                    "breaking stalled at element {}, forced restart from {}",
                    i,
                    restart.position
                );
                i = run.restart_from(restart);
                previous_is_word_box = false;
            }
            i += 1;
        }

        let best = run.select_best()?;
        Some(run.build_result(best, attempt, start_index))
    }
}

/// Scalar facts about the break element under consideration.
#[derive(Clone, Copy)]
struct BreakCandidate {
    index: usize,
    /// Width the element adds when the break is taken (penalty width).
    width: i32,
    penalty: Option<i32>,
    flagged: bool,
}

impl BreakCandidate {
    fn is_forced(self) -> bool {
        self.penalty.is_some_and(|p| p <= FORCED_BREAK_PENALTY)
    }
}

/// A feasible partial solution ending at a break index.
#[derive(Clone, Copy, Debug)]
struct Node {
    position: usize,
    line: usize,
    fitness: Fitness,
    total_width: i32,
    total_stretch: i32,
    total_shrink: i32,
    adjust_ratio: f64,
    available_stretch: i32,
    available_shrink: i32,
    difference: i32,
    total_demerits: f64,
    /// Consecutive flagged breaks ending at this node.
    flagged_run: u8,
    previous: Option<usize>,
}

#[derive(Clone, Copy)]
struct BalanceState {
    budget: usize,
    mean: Option<i32>,
}

/// Best admissible candidate per fitness class from one source bucket.
struct BestRecords {
    demerits: [f64; FITNESS_CLASSES],
    node: [Option<usize>; FITNESS_CLASSES],
    ratio: [f64; FITNESS_CLASSES],
    difference: [i32; FITNESS_CLASSES],
    available_shrink: [i32; FITNESS_CLASSES],
    available_stretch: [i32; FITNESS_CLASSES],
    best_class: Option<usize>,
}

impl BestRecords {
    fn new() -> Self {
        Self {
            demerits: [f64::INFINITY; FITNESS_CLASSES],
            node: [None; FITNESS_CLASSES],
            ratio: [0.0; FITNESS_CLASSES],
            difference: [0; FITNESS_CLASSES],
            available_shrink: [0; FITNESS_CLASSES],
            available_stretch: [0; FITNESS_CLASSES],
            best_class: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add(
        &mut self,
        class: usize,
        demerits: f64,
        node: usize,
        ratio: f64,
        difference: i32,
        available_shrink: i32,
        available_stretch: i32,
    ) {
        self.demerits[class] = demerits;
        self.node[class] = Some(node);
        self.ratio[class] = ratio;
        self.difference[class] = difference;
        self.available_shrink[class] = available_shrink;
        self.available_stretch[class] = available_stretch;
        if self
            .best_class
            .map_or(true, |best| demerits < self.demerits[best])
        {
            self.best_class = Some(class);
        }
    }

    fn has_records(&self) -> bool {
        self.best_class.is_some()
    }

    fn min_demerits(&self) -> f64 {
        self.best_class
            .map_or(f64::INFINITY, |best| self.demerits[best])
    }
}

struct Run<'r> {
    cfg: BreakerConfig,
    capacity: &'r dyn CapacityProvider,
    elements: &'r [Element],
    min_ratio: f64,
    threshold: f64,
    arena: Vec<Node>,
    buckets: Vec<[Option<usize>; FITNESS_CLASSES]>,
    start_line: usize,
    end_line: usize,
    active_count: usize,
    total_width: i32,
    total_stretch: i32,
    total_shrink: i32,
    last_too_short: Option<Node>,
    last_too_long: Option<Node>,
    last_deactivated: Option<Node>,
    last_forced_position: usize,
    balance: Option<BalanceState>,
}

impl<'r> Run<'r> {
    fn new(
        cfg: BreakerConfig,
        capacity: &'r dyn CapacityProvider,
        elements: &'r [Element],
        attempt: Attempt,
        balance_budget: Option<usize>,
    ) -> Self {
        let (min_ratio, threshold) = match attempt {
            Attempt::Strict => (-1.0, cfg.tolerance),
            Attempt::Relaxed | Attempt::Forced => {
                (f64::NEG_INFINITY, cfg.tolerance.max(cfg.relaxed_tolerance))
            }
        };
        Self {
            cfg,
            capacity,
            elements,
            min_ratio,
            threshold,
            arena: Vec::with_capacity(32),
            buckets: Vec::with_capacity(8),
            start_line: 0,
            end_line: 0,
            active_count: 0,
            total_width: 0,
            total_stretch: 0,
            total_shrink: 0,
            last_too_short: None,
            last_too_long: None,
            last_deactivated: None,
            last_forced_position: 0,
            balance: balance_budget.map(|budget| BalanceState { budget, mean: None }),
        }
    }

    fn start(&mut self, start_index: usize) {
        let root = Node {
            position: start_index,
            line: 0,
            fitness: Fitness::Normal,
            total_width: 0,
            total_stretch: 0,
            total_shrink: 0,
            adjust_ratio: 0.0,
            available_stretch: 0,
            available_shrink: 0,
            difference: 0,
            total_demerits: 0.0,
            flagged_run: 0,
            previous: None,
        };
        self.last_forced_position = start_index;
        self.add_node(root);
    }

    fn consider_legal_break(&mut self, cand: BreakCandidate) {
        // Too-long and deactivation recovery candidates are scoped to the
        // break under consideration; only last_too_short survives across
        // breaks (until an admissible candidate clears it).
        self.last_too_long = None;
        self.last_deactivated = None;
        let is_forced = cand.is_forced();
        let totals_after = self.totals_after_break(cand.index);
        let mut admitted: SmallVec<[Node; 8]> = SmallVec::new();

        let upper = self.end_line.min(self.buckets.len().saturating_sub(1));
        for line in self.start_line..=upper {
            let mut best = BestRecords::new();
            for class in 0..FITNESS_CLASSES {
                let Some(id) = self.buckets[line][class] else {
                    continue;
                };
                let node = self.arena[id];

                let actual = self.total_width - node.total_width + cand.width;
                let capacity = self.capacity.capacity(node.line);
                let difference = capacity - actual;
                let available_stretch = self.total_stretch - node.total_stretch;
                let available_shrink = self.total_shrink - node.total_shrink;
                let ratio = compute_adjustment_ratio(difference, available_stretch, available_shrink);
                let fitness = Fitness::classify(ratio);
                let demerits = self.compute_demerits(node, cand, fitness, ratio);

                let flagged_ok = !(cand.flagged
                    && self.cfg.max_flagged_penalties > 0
                    && node.flagged_run >= self.cfg.max_flagged_penalties);

                if flagged_ok && ratio >= self.min_ratio && ratio <= self.threshold {
                    self.last_too_short = None;
                    if demerits < best.demerits[fitness.index()] {
                        best.add(
                            fitness.index(),
                            demerits,
                            id,
                            ratio,
                            difference,
                            available_shrink,
                            available_stretch,
                        );
                    }
                } else {
                    // Keep the least-bad rejected candidates around for the
                    // forced-recovery restart.
                    let rejected = Node {
                        position: cand.index,
                        line: node.line + 1,
                        fitness,
                        total_width: self.total_width,
                        total_stretch: self.total_stretch,
                        total_shrink: self.total_shrink,
                        adjust_ratio: ratio,
                        available_stretch,
                        available_shrink,
                        difference,
                        total_demerits: demerits,
                        flagged_run: next_flagged_run(cand, node),
                        previous: Some(id),
                    };
                    if ratio <= -1.0 {
                        if self
                            .last_too_long
                            .map_or(true, |n| demerits < n.total_demerits)
                        {
                            self.last_too_long = Some(rejected);
                        }
                    } else if self
                        .last_too_short
                        .map_or(true, |n| demerits <= n.total_demerits)
                    {
                        self.last_too_short = Some(rejected);
                    }
                }

                // Overfull nodes cannot recover (content only grows) and a
                // forced break retires every active node.
                if ratio < -1.0 || is_forced {
                    self.deactivate(line, class);
                }
            }

            if best.has_records() {
                let cutoff = best.min_demerits() + self.cfg.incompatible_fitness_demerit;
                for class in 0..FITNESS_CLASSES {
                    let Some(prev_id) = best.node[class] else {
                        continue;
                    };
                    if best.demerits[class] > cutoff {
                        continue;
                    }
                    let prev = self.arena[prev_id];
                    admitted.push(Node {
                        position: cand.index,
                        line: line + 1,
                        fitness: Fitness::from_index(class),
                        total_width: totals_after.0,
                        total_stretch: totals_after.1,
                        total_shrink: totals_after.2,
                        adjust_ratio: best.ratio[class],
                        available_stretch: best.available_stretch[class],
                        available_shrink: best.available_shrink[class],
                        difference: best.difference[class],
                        total_demerits: best.demerits[class],
                        flagged_run: next_flagged_run(cand, prev),
                        previous: Some(prev_id),
                    });
                }
            }
        }

        for node in admitted {
            self.add_node(node);
        }
    }

    /// Accumulated totals once the break consumes the glue/penalties that
    /// follow it, up to the next box or a later forced break.
    fn totals_after_break(&self, index: usize) -> (i32, i32, i32) {
        let mut width = self.total_width;
        let mut stretch = self.total_stretch;
        let mut shrink = self.total_shrink;
        for (offset, e) in self.elements[index..].iter().enumerate() {
            if e.is_box() {
                break;
            }
            if e.is_glue() {
                width += e.width();
                stretch += e.stretch();
                shrink += e.shrink();
            } else if e.is_forced_break() && offset != 0 {
                break;
            }
        }
        (width, stretch, shrink)
    }

    fn compute_demerits(&mut self, node: Node, cand: BreakCandidate, fitness: Fitness, ratio: f64) -> f64 {
        if self.balance.is_some() {
            return self.balanced_demerits(node, cand);
        }
        let f = 1.0 + 100.0 * ratio.abs().powi(3);
        let mut demerits = match cand.penalty {
            Some(p) if p >= 0 => {
                let with_penalty = f + f64::from(p);
                with_penalty * with_penalty
            }
            Some(p) if p > FORCED_BREAK_PENALTY => f * f - f64::from(p) * f64::from(p),
            _ => f * f,
        };
        if cand.flagged && self.elements[node.position].is_flagged() {
            demerits += self.cfg.repeated_flagged_demerit;
        }
        if fitness.distance(node.fitness) > 1 {
            demerits += self.cfg.incompatible_fitness_demerit;
        }
        demerits + node.total_demerits
    }

    /// Balancing cost: squared deviation of the partial fragment length from
    /// the mean, doubled for short fragments, infeasible past the budget.
    fn balanced_demerits(&mut self, node: Node, cand: BreakCandidate) -> f64 {
        let Some(mut state) = self.balance else {
            return 0.0;
        };
        let mean = match state.mean {
            Some(mean) => mean,
            None => {
                let total: i32 = self
                    .elements
                    .iter()
                    .filter(|e| e.is_box() || e.is_glue())
                    .map(Element::width)
                    .sum();
                let mean = total / state.budget.max(1) as i32;
                state.mean = Some(mean);
                self.balance = Some(state);
                mean
            }
        };
        if node.line + 1 > state.budget {
            return f64::INFINITY;
        }
        let partial = self.total_width - node.total_width + cand.width;
        let deviation = f64::from(mean - partial);
        let mut demerits = deviation * deviation;
        if partial < mean {
            demerits *= 2.0;
        }
        demerits + node.total_demerits
    }

    fn add_node(&mut self, node: Node) {
        let line = node.line;
        if self.buckets.len() <= line {
            self.buckets.resize(line + 1, [None; FITNESS_CLASSES]);
        }
        let class = node.fitness.index();
        if let Some(existing) = self.buckets[line][class] {
            // Dominance: the slot holds the cheapest node of this fitness.
            if self.arena[existing].total_demerits <= node.total_demerits {
                return;
            }
            let id = self.arena.len();
            self.arena.push(node);
            self.buckets[line][class] = Some(id);
        } else {
            let id = self.arena.len();
            self.arena.push(node);
            self.buckets[line][class] = Some(id);
            self.active_count += 1;
        }
        if line > self.end_line {
            self.end_line = line;
        }
        if line < self.start_line {
            self.start_line = line;
        }
    }

    fn deactivate(&mut self, line: usize, class: usize) {
        if let Some(id) = self.buckets[line][class].take() {
            self.active_count -= 1;
            self.last_deactivated = Some(self.arena[id]);
        }
        while self.start_line < self.end_line
            && self.buckets[self.start_line].iter().all(Option::is_none)
        {
            self.start_line += 1;
        }
    }

    /// Pick the restart node after the active set emptied under force.
    fn recovery_node(&mut self) -> Option<Node> {
        match (self.last_too_short, self.last_too_long) {
            // Only rewind forward; a stale deactivated node would loop.
            (None, None) => self
                .last_deactivated
                .filter(|n| n.position > self.last_forced_position),
            (None, Some(long)) => Some(long),
            (Some(short), long) => {
                if self.last_forced_position == short.position {
                    long.or(Some(short))
                } else {
                    Some(short)
                }
            }
        }
    }

    fn restart_from(&mut self, mut node: Node) -> usize {
        node.total_demerits = 0.0;
        self.last_forced_position = node.position;
        self.total_width = node.total_width;
        self.total_stretch = node.total_stretch;
        self.total_shrink = node.total_shrink;
        self.last_too_short = None;
        self.last_too_long = None;
        self.last_deactivated = None;
        self.start_line = node.line;
        self.end_line = node.line;
        let position = node.position;
        self.add_node(node);
        position
    }

    fn effective_demerits(&self, node: &Node) -> f64 {
        if let Some(state) = self.balance {
            if node.line > state.budget {
                return f64::INFINITY;
            }
        }
        node.total_demerits
    }

    fn select_best(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        let upper = self.end_line.min(self.buckets.len().saturating_sub(1));
        for line in self.start_line..=upper {
            for class in 0..FITNESS_CLASSES {
                let Some(id) = self.buckets[line][class] else {
                    continue;
                };
                let demerits = self.effective_demerits(&self.arena[id]);
                if best.map_or(true, |(_, d)| demerits < d) {
                    best = Some((id, demerits));
                }
            }
        }
        best.map(|(id, _)| id)
    }

    fn build_result(&self, best: usize, attempt: Attempt, start_index: usize) -> BreakingResult {
        let mut chain: Vec<usize> = Vec::with_capacity(self.arena[best].line);
        let mut cursor = Some(best);
        while let Some(id) = cursor {
            let node = &self.arena[id];
            if node.line == 0 {
                break;
            }
            chain.push(id);
            cursor = node.previous;
        }
        chain.reverse();

        let mut breaks = Vec::with_capacity(chain.len());
        let mut fragment_start = start_index;
        for id in chain {
            let node = &self.arena[id];
            let start = self.first_box_at(fragment_start).unwrap_or(fragment_start);
            breaks.push(BreakPoint {
                index: node.position,
                start,
                fragment: node.line,
                adjust_ratio: node.adjust_ratio,
                difference: node.difference,
                available_stretch: node.available_stretch,
                overflow: (-(node.difference + node.available_shrink)).max(0),
            });
            fragment_start = node.position;
        }

        BreakingResult {
            breaks,
            attempt,
            total_demerits: self.arena[best].total_demerits,
        }
    }

    fn first_box_at(&self, from: usize) -> Option<usize> {
        self.elements[from.min(self.elements.len())..]
            .iter()
            .position(Element::is_box)
            .map(|offset| from + offset)
    }
}

fn compute_adjustment_ratio(difference: i32, available_stretch: i32, available_shrink: i32) -> f64 {
    if difference > 0 {
        if available_stretch > 0 {
            f64::from(difference) / f64::from(available_stretch)
        } else {
            INFINITE_RATIO
        }
    } else if difference < 0 {
        if available_shrink > 0 {
            f64::from(difference) / f64::from(available_shrink)
        } else {
            -INFINITE_RATIO
        }
    } else {
        0.0
    }
}

fn next_flagged_run(cand: BreakCandidate, previous: Node) -> u8 {
    if cand.flagged {
        previous.flagged_run.saturating_add(1)
    } else {
        0
    }
}
