//! Range-merge optimizer
//!
//! Each conjunction is rewritten on its own. Entries are grouped by index
//! name; single entries pass through, groups are reduced:
//!
//! - Two entries, one of them `Eq` or `In`: inconsistent.
//! - Two entries `Ge a` and `Le b` with `a <= b`: merged into `Btw(a, b)`.
//! - Two entries in any other pattern: kept as they are.
//! - More than two entries with any `Eq` or `In`: inconsistent.
//! - More than two range entries: the tightest lower bound and the tightest
//!   upper bound survive, then the two-entry rule applies to them.
//! - Any number of `In` tests on a list index: kept as they are, each one
//!   tests a different element of the collection.
//!
//! Output order: untouched entries in their original order, then group
//! results in order of first appearance.

use std::collections::HashMap;

use crate::keys::{KeyRole, KeyValue};
use crate::observability::{self, Event, Logger};

use super::ast::{AtomicQuery, Bound, Conjunction, Disjunction, QueryOperator};
use super::errors::{QueryError, QueryResult};

/// Rewrites compiled queries before they reach the index engine
pub struct QueryOptimizer;

impl QueryOptimizer {
    /// Optimizes every conjunction of a query; modifiers are kept
    pub fn optimize(query: Disjunction) -> QueryResult<Disjunction> {
        let mut optimized = query.empty_like();
        for conjunction in query.elements() {
            optimized.push(Self::optimize_conjunction(conjunction)?);
        }
        Ok(optimized)
    }

    /// Optimizes one conjunction
    pub fn optimize_conjunction(conjunction: &Conjunction) -> QueryResult<Conjunction> {
        let mut groups: Vec<Vec<&AtomicQuery>> = Vec::new();
        let mut by_name: HashMap<&str, usize> = HashMap::new();

        for query in conjunction.elements() {
            match by_name.get(query.index_name()) {
                Some(&at) => groups[at].push(query),
                None => {
                    by_name.insert(query.index_name(), groups.len());
                    groups.push(vec![query]);
                }
            }
        }

        let mut untouched = Vec::new();
        let mut reduced = Vec::new();
        for group in groups {
            if group.len() == 1 {
                untouched.push(group[0].clone());
            } else {
                reduced.extend(Self::reduce_group(&group)?);
            }
        }

        untouched.extend(reduced);
        Ok(Conjunction::new(untouched))
    }

    fn reduce_group(group: &[&AtomicQuery]) -> QueryResult<Vec<AtomicQuery>> {
        let index_name = group[0].index_name();

        if group.iter().all(|q| q.role() == KeyRole::ListIndex && q.operator() == QueryOperator::In) {
            return Ok(group.iter().map(|q| (*q).clone()).collect());
        }

        if let Some(exact) = group.iter().find(|q| q.operator().is_exact()) {
            return Err(QueryError::inconsistent(
                index_name,
                format!(
                    "'{}' cannot be combined with other tests on the same index",
                    exact
                ),
            ));
        }

        if group.len() == 2 {
            return Ok(Self::merge_pair(group[0], group[1]));
        }

        let (lower, upper) = Self::tightest_bounds(group);
        match (lower, upper) {
            (Some(lower), Some(upper)) => Ok(Self::merge_pair(&lower, &upper)),
            (Some(only), None) | (None, Some(only)) => Ok(vec![only]),
            (None, None) => Ok(Vec::new()),
        }
    }

    /// `Ge low` and `Le high` with `low <= high` become `Btw(low, high)`
    fn merge_pair(first: &AtomicQuery, second: &AtomicQuery) -> Vec<AtomicQuery> {
        let (lower, upper) = match (first.operator(), second.operator()) {
            (QueryOperator::Ge, QueryOperator::Le) => (first, second),
            (QueryOperator::Le, QueryOperator::Ge) => (second, first),
            _ => return vec![first.clone(), second.clone()],
        };

        match (lower.value(), upper.value()) {
            (Some(low), Some(high)) if low.repr() <= high.repr() => {
                observability::metrics().increment_ranges_merged();
                Logger::log(
                    Event::RangeMerged.default_severity(),
                    Event::RangeMerged.as_str(),
                    &[("index", lower.index_name())],
                );
                vec![AtomicQuery::between(low.clone(), high.clone())]
            }
            _ => vec![first.clone(), second.clone()],
        }
    }

    /// Highest lower bound and lowest upper bound of a range group.
    ///
    /// On equal values the strict bound is tighter. A `Btw` contributes both
    /// of its ends.
    fn tightest_bounds(group: &[&AtomicQuery]) -> (Option<AtomicQuery>, Option<AtomicQuery>) {
        let mut lower: Option<(QueryOperator, &KeyValue)> = None;
        let mut upper: Option<(QueryOperator, &KeyValue)> = None;

        for query in group {
            match (query.operator(), query.bound()) {
                (op @ (QueryOperator::Ge | QueryOperator::Gt), Bound::Single(v)) => {
                    lower = Some(Self::tighter_lower(lower, (op, v)));
                }
                (op @ (QueryOperator::Le | QueryOperator::Lt), Bound::Single(v)) => {
                    upper = Some(Self::tighter_upper(upper, (op, v)));
                }
                (QueryOperator::Btw, Bound::Range(low, high)) => {
                    lower = Some(Self::tighter_lower(lower, (QueryOperator::Ge, low)));
                    upper = Some(Self::tighter_upper(upper, (QueryOperator::Le, high)));
                }
                _ => {}
            }
        }

        let build = |(op, v): (QueryOperator, &KeyValue)| {
            let v = v.clone();
            match op {
                QueryOperator::Gt => AtomicQuery::gt(v),
                QueryOperator::Ge => AtomicQuery::ge(v),
                QueryOperator::Lt => AtomicQuery::lt(v),
                _ => AtomicQuery::le(v),
            }
        };
        (lower.map(build), upper.map(build))
    }

    fn tighter_lower<'a>(
        current: Option<(QueryOperator, &'a KeyValue)>,
        candidate: (QueryOperator, &'a KeyValue),
    ) -> (QueryOperator, &'a KeyValue) {
        match current {
            None => candidate,
            Some(current) => {
                let (op, v) = candidate;
                if v.repr() > current.1.repr()
                    || (v.repr() == current.1.repr() && op == QueryOperator::Gt)
                {
                    candidate
                } else {
                    current
                }
            }
        }
    }

    fn tighter_upper<'a>(
        current: Option<(QueryOperator, &'a KeyValue)>,
        candidate: (QueryOperator, &'a KeyValue),
    ) -> (QueryOperator, &'a KeyValue) {
        match current {
            None => candidate,
            Some(current) => {
                let (op, v) = candidate;
                if v.repr() < current.1.repr()
                    || (v.repr() == current.1.repr() && op == QueryOperator::Lt)
                {
                    candidate
                } else {
                    current
                }
            }
        }
    }
}
