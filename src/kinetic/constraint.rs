use nalgebra::DMatrix;

use crate::error::ConfigurationError;
use crate::model::compartment::{CompartmentOrder, OrderSpace, RateSpace};
use crate::model::{CompartmentConstraint, Parameters};

/// Positions in `order` of compartments taken out of the decay basis at `index`.
///
/// Every applicable constraint except equal-area removes its compartment.
/// Constraints on compartments of other K-matrices are ignored here. The
/// returned positions are sorted and unique.
pub fn removed_compartments(
    constraints: &[CompartmentConstraint],
    order: &CompartmentOrder<RateSpace>,
    index: f64,
) -> Vec<usize> {
    let mut removed: Vec<usize> = constraints
        .iter()
        .filter(|c| c.removes_compartment() && c.applies(index))
        .filter_map(|c| order.position(c.compartment()))
        .collect();
    removed.sort_unstable();
    removed.dedup();
    removed
}

/// Adds `weight · column[target]` to `column[compartment]` for every
/// applicable equal constraint.
///
/// Constraints are processed in declaration order and accumulate: two
/// constraints on the same compartment both add into its column. A
/// constraint whose compartment is not in `order` belongs to another
/// K-matrix and is skipped; a target that is not in `order` is an error.
pub fn apply_equal_constraints<S: OrderSpace>(
    matrix: &mut DMatrix<f64>,
    order: &CompartmentOrder<S>,
    constraints: &[CompartmentConstraint],
    index: f64,
    parameters: &Parameters,
) -> Result<(), ConfigurationError> {
    for constraint in constraints {
        let CompartmentConstraint::Equal {
            compartment,
            targets,
            ..
        } = constraint
        else {
            continue;
        };
        if !constraint.applies(index) {
            continue;
        }
        let Some(column) = order.position(compartment) else {
            continue;
        };
        for (target, weight) in targets {
            let target_column = order.index_of(target)?;
            let weight = parameters.get(weight)?;
            let source = matrix.column(target_column).clone_owned();
            matrix.column_mut(column).axpy(weight, &source, 1.0);
        }
    }
    Ok(())
}
