// Property-based tests for grid navigation.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use forecast_core::{Breakdown, Projection, Variable, VariableType};
use forecast_engine::{navigate, Coordinate, GridModel, NavCommand, RowRef};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// (is breakdown, sub-category count, expanded, visible)
type RowSpec = (bool, usize, bool, bool);

fn arb_rows() -> impl Strategy<Value = Vec<RowSpec>> {
    prop::collection::vec((any::<bool>(), 0usize..4, any::<bool>(), prop::bool::weighted(0.85)), 1..7)
}

fn arb_command() -> impl Strategy<Value = NavCommand> {
    prop::sample::select(NavCommand::ALL.to_vec())
}

fn projections(rows: &[RowSpec]) -> Vec<Projection> {
    rows.iter()
        .enumerate()
        .map(|(i, &(breakdown, subs, expanded, visible))| {
            let kind = if breakdown { VariableType::Breakdown } else { VariableType::Real };
            let mut var = Variable::new(format!("v{}", i), format!("V{}", i), kind);
            if breakdown {
                let shares: Breakdown = (0..subs).map(|s| (format!("s{}", s), 1.0)).collect();
                var.default_breakdown = Some(shares);
            }
            Projection::new(var, Vec::new())
                .with_expanded(expanded)
                .with_display(visible)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn prop_navigation_stays_in_bounds(
        rows in arb_rows(),
        cols in 1usize..14,
        start in any::<prop::sample::Index>(),
        start_col in any::<prop::sample::Index>(),
        commands in prop::collection::vec(arb_command(), 0..40),
    ) {
        let grid = GridModel::build(&projections(&rows), cols);
        let order = grid.rows_in_order();
        prop_assume!(!order.is_empty());

        let mut current = Coordinate { row: *start.get(&order), col: start_col.index(cols) };
        prop_assert!(grid.contains(current));

        for cmd in commands {
            if let Some(next) = navigate(&grid, Some(current), cmd) {
                prop_assert!(grid.contains(next), "{:?} from {:?} left the grid: {:?}", cmd, current, next);
                if cmd.is_vertical() {
                    prop_assert_eq!(next.col, current.col);
                } else {
                    prop_assert_eq!(next.row, current.row);
                    prop_assert_eq!(next.col.abs_diff(current.col), 1);
                }
                current = next;
            }
        }
    }

    #[test]
    fn prop_no_selection_is_noop(rows in arb_rows(), cols in 1usize..14, cmd in arb_command()) {
        let grid = GridModel::build(&projections(&rows), cols);
        prop_assert_eq!(navigate(&grid, None, cmd), None);
    }

    #[test]
    fn prop_down_then_up_returns(
        rows in arb_rows(),
        cols in 1usize..6,
        start in any::<prop::sample::Index>(),
    ) {
        let grid = GridModel::build(&projections(&rows), cols);
        let order = grid.rows_in_order();
        prop_assume!(!order.is_empty());
        let from = Coordinate { row: *start.get(&order), col: 0 };

        // Round trips hold inside a subframe block and between plain rows.
        let symmetric = match from.row {
            RowRef::Frame { index } => grid.subframe_row_count(index) == 0,
            RowRef::SubFrame { frame_index, sub_index } => sub_index + 1 < grid.subframe_row_count(frame_index),
        };
        if symmetric {
            if let Some(down) = navigate(&grid, Some(from), NavCommand::Down) {
                prop_assert_eq!(navigate(&grid, Some(down), NavCommand::Up), Some(from));
            }
        }
    }

    #[test]
    fn prop_expanded_rows_match_names(subs in 0usize..5, expanded in any::<bool>()) {
        let grid = GridModel::build(&projections(&[(true, subs, expanded, true)]), 3);
        let expected = if expanded { subs } else { 0 };
        prop_assert_eq!(grid.subframe_row_count(0), expected);
        prop_assert_eq!(grid.total_rows(), 1 + expected);
        if expanded && subs > 0 {
            prop_assert_eq!(
                navigate(&grid, Some(Coordinate::frame(0, 1)), NavCommand::Down),
                Some(Coordinate { row: RowRef::SubFrame { frame_index: 0, sub_index: 0 }, col: 1 })
            );
        }
    }
}
