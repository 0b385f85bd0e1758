//! Ordered fallback chains for header fields.
//!
//! A field is located by trying strategies in priority order; the first one
//! that yields a value wins and the rest never run.

use tracing::debug;

type Strategy<'a, T> = Box<dyn FnOnce() -> Option<T> + 'a>;

pub struct Fallback<'a, T> {
    field: &'static str,
    strategies: Vec<(&'static str, Strategy<'a, T>)>,
}

impl<'a, T> Fallback<'a, T> {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
        }
    }

    /// Append a named strategy to the end of the chain.
    pub fn or(mut self, name: &'static str, strategy: impl FnOnce() -> Option<T> + 'a) -> Self {
        self.strategies.push((name, Box::new(strategy)));
        self
    }

    /// Run strategies in order until one produces a value.
    pub fn resolve(self) -> Option<T> {
        let field = self.field;
        for (name, strategy) in self.strategies {
            if let Some(value) = strategy() {
                debug!(field, strategy = name, "field resolved");
                return Some(value);
            }
        }
        debug!(field, "field not found");
        None
    }

    /// Resolve only when `current` is still empty.
    pub fn fill(self, current: Option<T>) -> Option<T> {
        match current {
            Some(v) => Some(v),
            None => self.resolve(),
        }
    }
}
