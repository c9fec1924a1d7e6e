//! Clone engine configuration

/// How the engine walks the graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Native call-stack recursion
    #[default]
    Recursive,
    /// Explicit pending stack; depth bounded by heap, not by the call stack
    Worklist,
}

/// Clone engine configuration
#[derive(Debug, Clone)]
pub struct CloneConfig {
    /// Traversal strategy
    pub strategy: Strategy,
    /// Initial capacity of the identity map
    pub initial_capacity: usize,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Recursive,
            initial_capacity: 64,
        }
    }
}

impl CloneConfig {
    /// Recursive traversal with default sizing
    pub fn recursive() -> Self {
        Self::default()
    }

    /// Worklist traversal with default sizing
    pub fn worklist() -> Self {
        Self {
            strategy: Strategy::Worklist,
            ..Self::default()
        }
    }

    /// Set the traversal strategy
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the identity map's initial capacity
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}
