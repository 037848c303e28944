//! Ordering specs and pluggable sort algorithms.

use crate::value::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

pub type Comparator = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

/// How list items are ordered.
#[derive(Clone)]
pub enum OrderSpec {
    /// Key paths, compared in turn. An empty path orders the items
    /// themselves.
    Keys(Vec<(String, Direction)>),
    Comparator(Comparator),
}

impl OrderSpec {
    pub fn by(key: impl Into<String>, direction: Direction) -> Self {
        OrderSpec::Keys(vec![(key.into(), direction)])
    }

    pub fn asc(key: impl Into<String>) -> Self {
        Self::by(key, Direction::Ascending)
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self::by(key, Direction::Descending)
    }

    /// Add a tie-breaking key.
    pub fn then(self, key: impl Into<String>, direction: Direction) -> Self {
        match self {
            OrderSpec::Keys(mut keys) => {
                keys.push((key.into(), direction));
                OrderSpec::Keys(keys)
            }
            OrderSpec::Comparator(first) => {
                let second = OrderSpec::by(key, direction);
                OrderSpec::comparator(move |a, b| first(a, b).then_with(|| second.compare(a, b)))
            }
        }
    }

    pub fn comparator(f: impl Fn(&Value, &Value) -> Ordering + Send + Sync + 'static) -> Self {
        OrderSpec::Comparator(Arc::new(f))
    }

    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match self {
            OrderSpec::Keys(keys) => {
                for (key, direction) in keys {
                    let ordering = order_values(pick(a, key), pick(b, key));
                    let ordering = match direction {
                        Direction::Ascending => ordering,
                        Direction::Descending => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            }
            OrderSpec::Comparator(f) => f(a, b),
        }
    }
}

impl fmt::Debug for OrderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSpec::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            OrderSpec::Comparator(_) => f.write_str("Comparator"),
        }
    }
}

fn pick<'a>(item: &'a Value, key: &str) -> &'a Value {
    if key.is_empty() {
        return item;
    }
    item.get_path(key).unwrap_or(&Value::Undefined)
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Undefined => 0,
        Value::Null => 1,
        Value::Bool(_) => 2,
        Value::Number(_) => 3,
        Value::Date(_) | Value::Moment(_) => 4,
        Value::String(_) => 5,
        _ => 6,
    }
}

fn millis(value: &Value) -> i64 {
    match value {
        Value::Date(d) => d.timestamp_millis(),
        Value::Moment(m) => m.date().timestamp_millis(),
        _ => 0,
    }
}

/// Total order over values: undefined < null < bool < number < date <
/// string < everything else. NaN sorts after every other number.
pub fn order_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (x, y) if rank(x) == 4 && rank(y) == 4 => millis(x).cmp(&millis(y)),
        (x, y) => rank(x).cmp(&rank(y)),
    }
}

/// A sort implementation.
pub trait Sorter: Send + Sync {
    fn sort(&self, items: &mut [Value], compare: &dyn Fn(&Value, &Value) -> Ordering);
}

/// Which sort implementation runs an [`OrderSpec`].
#[derive(Clone, Default)]
pub enum SortAlgorithm {
    /// Merge sort; keeps equal items in input order.
    #[default]
    Stable,
    /// Pattern-defeating quicksort.
    Unstable,
    /// Insertion sort, for short lists. Stable.
    Insertion,
    Custom(Arc<dyn Sorter>),
}

impl fmt::Debug for SortAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortAlgorithm::Stable => f.write_str("Stable"),
            SortAlgorithm::Unstable => f.write_str("Unstable"),
            SortAlgorithm::Insertion => f.write_str("Insertion"),
            SortAlgorithm::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl SortAlgorithm {
    pub fn custom(sorter: impl Sorter + 'static) -> Self {
        SortAlgorithm::Custom(Arc::new(sorter))
    }

    pub fn sort(&self, items: &mut [Value], spec: &OrderSpec) {
        let compare = |a: &Value, b: &Value| spec.compare(a, b);
        match self {
            SortAlgorithm::Stable => items.sort_by(compare),
            SortAlgorithm::Unstable => items.sort_unstable_by(compare),
            SortAlgorithm::Insertion => insertion_sort(items, &compare),
            SortAlgorithm::Custom(sorter) => sorter.sort(items, &compare),
        }
    }
}

fn insertion_sort(items: &mut [Value], compare: &dyn Fn(&Value, &Value) -> Ordering) {
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && compare(&items[j - 1], &items[j]) == Ordering::Greater {
            items.swap(j - 1, j);
            j -= 1;
        }
    }
}
