//! Chainable query pipeline over a list store.

use super::sort::{OrderSpec, SortAlgorithm};
use crate::error::StateError;
use crate::state::{Action, CompareStrategy, Store};
use crate::subscriptions::{Observable, Projection};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// `first` on an empty result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("Sequence contains no elements")]
pub struct EmptySequence;

impl From<EmptySequence> for StateError {
    fn from(_: EmptySequence) -> Self {
        StateError::EmptySequence
    }
}

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone)]
enum Stage {
    Filter(Predicate),
    Select(Projection),
    Order(OrderSpec, SortAlgorithm),
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Filter(_) => f.write_str("Filter"),
            Stage::Select(p) => f.debug_tuple("Select").field(p).finish(),
            Stage::Order(spec, algorithm) => f.debug_tuple("Order").field(spec).field(algorithm).finish(),
        }
    }
}

/// Lazily composed query. Builder calls only record stages; terminal
/// operators run them against the current value or every emitted one.
#[derive(Clone)]
pub struct ListQuery {
    store: Store,
    stages: Vec<Stage>,
    actions: Vec<Action>,
    compare: Option<CompareStrategy>,
}

impl ListQuery {
    pub(crate) fn new(store: Store) -> Self {
        Self {
            store,
            stages: Vec::new(),
            actions: Vec::new(),
            compare: None,
        }
    }

    /// Keep items matching `predicate`.
    pub fn filter(mut self, predicate: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.stages.push(Stage::Filter(Arc::new(predicate)));
        self
    }

    /// Project every item.
    pub fn select(mut self, projection: Projection) -> Self {
        self.stages.push(Stage::Select(projection));
        self
    }

    pub fn order_by(self, spec: OrderSpec) -> Self {
        self.order_by_with(spec, SortAlgorithm::default())
    }

    pub fn order_by_with(mut self, spec: OrderSpec, algorithm: SortAlgorithm) -> Self {
        self.stages.push(Stage::Order(spec, algorithm));
        self
    }

    /// Streams only react to commits made by these actions.
    pub fn when<I>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = Action>,
    {
        self.actions.extend(actions);
        self
    }

    /// Change check used by the streaming terminals.
    pub fn set_compare(mut self, compare: CompareStrategy) -> Self {
        self.compare = Some(compare);
        self
    }

    fn run(stages: &[Stage], list: &Value) -> Vec<Value> {
        let mut items: Vec<Value> = list.as_array().map(<[Value]>::to_vec).unwrap_or_default();
        for stage in stages {
            match stage {
                Stage::Filter(predicate) => items.retain(|item| predicate(item)),
                Stage::Select(projection) => {
                    items = items.iter().map(|item| projection.apply(item)).collect();
                }
                Stage::Order(spec, algorithm) => algorithm.sort(&mut items, spec),
            }
        }
        items
    }

    pub fn to_list(&self) -> Vec<Value> {
        Self::run(&self.stages, &self.store.value())
    }

    /// First result, or null.
    pub fn first_or_default(&self) -> Value {
        self.to_list().into_iter().next().unwrap_or(Value::Null)
    }

    pub fn first(&self) -> Result<Value, EmptySequence> {
        self.to_list().into_iter().next().ok_or(EmptySequence)
    }

    pub fn any(&self) -> bool {
        !self.to_list().is_empty()
    }

    /// Query results as an array, re-emitted whenever they change.
    pub fn to_list_stream(&self) -> Observable<Value> {
        let stages = self.stages.clone();
        let projection = Projection::map(move |list| Value::from(Self::run(&stages, list)));
        match &self.compare {
            Some(compare) => self
                .store
                .select_with(projection, self.actions.clone(), compare.clone()),
            None => self.store.select_when(projection, self.actions.clone()),
        }
    }

    pub fn first_or_default_stream(&self) -> Observable<Value> {
        self.to_list_stream()
            .map(|list| list.index(0).cloned().unwrap_or(Value::Null))
    }

    /// Emits `Err(EmptySequence)` whenever the result is empty.
    ///
    /// An empty result does not end the stream: the error arrives as an
    /// item and the stream keeps following the store, emitting `Ok` again
    /// once the result fills up.
    pub fn first_stream(&self) -> Observable<Result<Value, EmptySequence>> {
        self.to_list_stream()
            .map(|list| list.index(0).cloned().ok_or(EmptySequence))
    }

    pub fn any_stream(&self) -> Observable<bool> {
        self.to_list_stream()
            .map(|list| list.as_array().is_some_and(|items| !items.is_empty()))
    }
}

impl fmt::Debug for ListQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListQuery")
            .field("store", &self.store.name())
            .field("stages", &self.stages)
            .field("actions", &self.actions)
            .finish()
    }
}
