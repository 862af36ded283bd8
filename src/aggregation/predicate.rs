use crate::matrix::{Group, TrinaryState};
use std::fmt;
use std::sync::Arc;

/// Regulation direction selected by a time/direction partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    #[default]
    Up,
    Down,
}

impl Direction {
    /// The only trinary state that matches this direction.
    pub fn state(self) -> TrinaryState {
        match self {
            Direction::Up => TrinaryState::Up,
            Direction::Down => TrinaryState::Down,
        }
    }

    pub fn sign(self) -> i8 {
        self.state().value()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

type GroupTest = Arc<dyn Fn(&Group) -> bool + Send + Sync>;

/// Pure boolean test over a group's trinary vector.
#[derive(Clone)]
pub enum Predicate {
    /// Holds when the group's state at `time` equals the direction's sign exactly.
    /// Unchanged states never match, and times past the vector end never match.
    TimeDirection { time: usize, direction: Direction },
    /// Arbitrary caller-supplied test. Must be total over any trinary vector.
    Custom { name: String, test: GroupTest },
}

impl Predicate {
    pub fn time_direction(time: usize, direction: Direction) -> Self {
        Predicate::TimeDirection { time, direction }
    }

    pub fn custom<F>(name: impl Into<String>, test: F) -> Self
    where
        F: Fn(&Group) -> bool + Send + Sync + 'static,
    {
        Predicate::Custom {
            name: name.into(),
            test: Arc::new(test),
        }
    }

    pub fn evaluate(&self, group: &Group) -> bool {
        match self {
            Predicate::TimeDirection { time, direction } => {
                group.state_at(*time) == Some(direction.state())
            }
            Predicate::Custom { test, .. } => test(group),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::TimeDirection { time, direction } => f
                .debug_struct("TimeDirection")
                .field("time", time)
                .field("direction", direction)
                .finish(),
            Predicate::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::TimeDirection { time, direction } => write!(f, "time={},{}", time, direction),
            Predicate::Custom { name, .. } => write!(f, "{}", name),
        }
    }
}

/// Row key of an aggregation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PartitionKey {
    /// Index into a caller-supplied predicate list.
    Predicate(usize),
    /// Time point of a time/direction partitioning.
    Time(usize),
}

impl PartitionKey {
    pub fn index(self) -> usize {
        match self {
            PartitionKey::Predicate(i) | PartitionKey::Time(i) => i,
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionKey::Predicate(i) => write!(f, "predicate {}", i),
            PartitionKey::Time(t) => write!(f, "time {}", t),
        }
    }
}

/// Strategy generating the partitions an aggregation sums over.
#[derive(Debug, Clone)]
pub enum Partitioning {
    /// One partition per predicate, in the given order.
    Predicates(Vec<Predicate>),
    /// One partition per time point, matching groups regulated in `direction` there.
    TimeDirection(Direction),
}

impl Partitioning {
    /// Keyed predicates in row order for vectors of length `num_times`.
    pub fn partitions(&self, num_times: usize) -> Vec<(PartitionKey, Predicate)> {
        match self {
            Partitioning::Predicates(predicates) => predicates
                .iter()
                .enumerate()
                .map(|(i, p)| (PartitionKey::Predicate(i), p.clone()))
                .collect(),
            Partitioning::TimeDirection(direction) => (0..num_times)
                .map(|t| (PartitionKey::Time(t), Predicate::time_direction(t, *direction)))
                .collect(),
        }
    }
}
