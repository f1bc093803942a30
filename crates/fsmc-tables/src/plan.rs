//! Indexed vs. direct layout planning.

use std::fmt;

use tracing::debug;

use crate::error::Result;
use crate::flat::FlatState;
use crate::width::array_type_size;

/// Global layout of the transition tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Per-state slots hold transition ids; targets and actions are stored
    /// once per transition, in id order.
    Indexed,
    /// Per-state slots hold targets and actions directly.
    Direct,
}

impl Layout {
    #[must_use]
    pub const fn uses_indices(self) -> bool {
        matches!(self, Self::Indexed)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Indexed => "indexed",
            Self::Direct => "direct",
        })
    }
}

/// Quantities the cost comparison depends on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlanInputs {
    /// Σ over states of span + default slot.
    pub total_index: u64,
    /// Number of distinct transitions.
    pub trans_count: u64,
    /// Largest value an index entry holds.
    pub max_index: i128,
    /// Largest target state id.
    pub max_state: i128,
    /// Largest action location.
    pub max_action_loc: i128,
    pub any_actions: bool,
}

impl PlanInputs {
    #[must_use]
    pub fn new(flat: &[FlatState], trans_count: usize) -> Self {
        Self {
            total_index: flat.iter().map(FlatState::slot_count).sum(),
            trans_count: trans_count as u64,
            max_index: (trans_count as i128 - 1).max(0),
            ..Self::default()
        }
    }
}

/// Byte costs of both layouts and the one chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutPlan {
    pub size_with_indices: u64,
    pub size_without_indices: u64,
    pub layout: Layout,
    /// The layout was requested rather than derived from the costs.
    pub forced: bool,
}

impl LayoutPlan {
    /// Compare both layouts' byte costs. Indexed wins only when strictly
    /// cheaper; `force` overrides the choice but not the reported costs.
    pub fn compute(inputs: &PlanInputs, force: Option<Layout>) -> Result<Self> {
        let state_w = array_type_size("trans_targs", inputs.max_state)?;
        let index_w = array_type_size("indices", inputs.max_index)?;
        let action_w = if inputs.any_actions {
            array_type_size("trans_actions", inputs.max_action_loc)?
        } else {
            0
        };

        let size_with_indices = index_w * inputs.total_index
            + state_w * inputs.trans_count
            + action_w * inputs.trans_count;
        let size_without_indices = (state_w + action_w) * inputs.total_index;

        let derived = if size_with_indices < size_without_indices {
            Layout::Indexed
        } else {
            Layout::Direct
        };
        let layout = force.unwrap_or(derived);
        debug!(
            size_with_indices,
            size_without_indices,
            %layout,
            forced = force.is_some(),
            "planned table layout"
        );

        Ok(Self {
            size_with_indices,
            size_without_indices,
            layout,
            forced: force.is_some(),
        })
    }

    /// Bytes the chosen layout costs under the comparison formula.
    #[must_use]
    pub const fn chosen_size(&self) -> u64 {
        match self.layout {
            Layout::Indexed => self.size_with_indices,
            Layout::Direct => self.size_without_indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(total_index: u64, trans_count: u64, states: i128, loc: Option<i128>) -> PlanInputs {
        PlanInputs {
            total_index,
            trans_count,
            max_index: trans_count as i128 - 1,
            max_state: states - 1,
            max_action_loc: loc.unwrap_or(0),
            any_actions: loc.is_some(),
        }
    }

    #[test]
    fn test_many_slots_few_transitions_prefers_indices() {
        // 256 slots, 2 transitions, 300 states: 1*256 + 2*2 < 2*256.
        let plan = LayoutPlan::compute(&inputs(256, 2, 300, None), None).unwrap();
        assert_eq!(plan.size_with_indices, 260);
        assert_eq!(plan.size_without_indices, 512);
        assert_eq!(plan.layout, Layout::Indexed);
    }

    #[test]
    fn test_dense_blocks_prefer_direct() {
        // One slot per transition: indices only add cost.
        let plan = LayoutPlan::compute(&inputs(4, 4, 4, None), None).unwrap();
        assert_eq!(plan.size_with_indices, 8);
        assert_eq!(plan.size_without_indices, 4);
        assert_eq!(plan.layout, Layout::Direct);

        let plan = LayoutPlan::compute(&inputs(2, 1, 1, None), None).unwrap();
        assert_eq!(plan.size_with_indices, 3);
        assert_eq!(plan.size_without_indices, 2);
        assert_eq!(plan.layout, Layout::Direct);
    }

    #[test]
    fn test_action_locations_count_on_both_sides() {
        let plan = LayoutPlan::compute(&inputs(100, 10, 10, Some(1000)), None).unwrap();
        assert_eq!(plan.size_with_indices, 100 + 10 + 2 * 10);
        assert_eq!(plan.size_without_indices, (1 + 2) * 100);
    }

    #[test]
    fn test_forced_layout_keeps_costs() {
        let plan = LayoutPlan::compute(&inputs(256, 2, 300, None), Some(Layout::Direct)).unwrap();
        assert!(plan.forced);
        assert_eq!(plan.layout, Layout::Direct);
        assert_eq!(plan.chosen_size(), 512);
    }
}
