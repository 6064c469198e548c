/*!

Health states and the state space they live in.

A [`StateSpace`] is an ordered list of uniquely named states, each either
[`StateKind::Absorbing`] or [`StateKind::Transient`]. The position of a state in that list
is its dense index, which every per-state table (rates, costs, utilities) is keyed by.
[`HealthState`] is that index; the only way to obtain one outside this crate is through a
`StateSpace`, so a `HealthState` is always in range for the space that produced it.

*/

use crate::error::{MicrosimError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Dense index of a health state within its [`StateSpace`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct HealthState(pub(crate) usize);

impl HealthState {
    #[must_use]
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state #{}", self.0)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Transient,
    Absorbing,
}

#[derive(Clone, Debug)]
pub struct StateSpace {
    names: Vec<String>,
    kinds: Vec<StateKind>,
    by_name: FxHashMap<String, HealthState>,
}

impl StateSpace {
    /// Builds the state space from `(name, kind)` pairs in index order. Fails if the list is
    /// empty or a name appears twice.
    pub fn new<S: Into<String>>(states: impl IntoIterator<Item = (S, StateKind)>) -> Result<Self> {
        let mut names = Vec::new();
        let mut kinds = Vec::new();
        let mut by_name = FxHashMap::default();

        for (index, (name, kind)) in states.into_iter().enumerate() {
            let name = name.into();
            if by_name.insert(name.clone(), HealthState(index)).is_some() {
                return Err(MicrosimError::configuration(
                    format!("states[{index}]"),
                    format!("duplicate state name `{name}`"),
                ));
            }
            names.push(name);
            kinds.push(kind);
        }

        if names.is_empty() {
            return Err(MicrosimError::configuration("states", "state space is empty"));
        }

        Ok(StateSpace { names, kinds, by_name })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Looks a state up by name.
    pub fn state(&self, name: &str) -> Result<HealthState> {
        self.by_name.get(name).copied().ok_or_else(|| {
            MicrosimError::configuration("states", format!("unknown state `{name}`"))
        })
    }

    /// Converts a raw index into a `HealthState`, checking the range.
    pub fn state_at(&self, index: usize) -> Result<HealthState> {
        if index < self.len() {
            Ok(HealthState(index))
        } else {
            Err(MicrosimError::configuration(
                "states",
                format!("state index {index} is out of range for {} states", self.len()),
            ))
        }
    }

    #[must_use]
    pub fn name(&self, state: HealthState) -> &str {
        &self.names[state.0]
    }

    #[must_use]
    pub fn kind(&self, state: HealthState) -> StateKind {
        self.kinds[state.0]
    }

    #[must_use]
    pub fn is_declared_absorbing(&self, state: HealthState) -> bool {
        self.kinds[state.0] == StateKind::Absorbing
    }

    pub fn iter(&self) -> impl Iterator<Item = HealthState> + '_ {
        (0..self.names.len()).map(HealthState)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn three_states() -> StateSpace {
        StateSpace::new([
            ("WELL", StateKind::Transient),
            ("SICK", StateKind::Transient),
            ("DEAD", StateKind::Absorbing),
        ])
        .unwrap()
    }

    #[test]
    fn names_map_to_dense_indices() {
        let states = three_states();
        assert_eq!(states.len(), 3);
        assert_eq!(states.state("WELL").unwrap().index(), 0);
        assert_eq!(states.state("DEAD").unwrap().index(), 2);
        assert_eq!(states.name(HealthState(1)), "SICK");
        assert!(states.is_declared_absorbing(HealthState(2)));
        assert!(!states.is_declared_absorbing(HealthState(0)));
        let all: Vec<usize> = states.iter().map(HealthState::index).collect();
        assert_eq!(all, vec![0, 1, 2]);
    }

    #[test]
    fn unknown_name_and_index_are_rejected() {
        let states = three_states();
        assert!(states.state("RECOVERED").unwrap_err().is_configuration_error());
        assert!(states.state_at(3).unwrap_err().is_configuration_error());
        assert_eq!(states.state_at(2).unwrap(), HealthState(2));
    }

    #[test]
    fn duplicate_and_empty_spaces_are_rejected() {
        let duplicate = StateSpace::new([
            ("WELL", StateKind::Transient),
            ("WELL", StateKind::Absorbing),
        ]);
        assert!(duplicate.unwrap_err().is_configuration_error());

        let empty = StateSpace::new(Vec::<(String, StateKind)>::new());
        assert!(empty.unwrap_err().is_configuration_error());
    }
}
