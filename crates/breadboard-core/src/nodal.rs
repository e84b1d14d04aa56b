//! Nodal-analysis conductance matrix assembly.
//!
//! [`NodalSystem`] collects the additive stamps of a circuit into a dense
//! conductance matrix G and right-hand side i, so a linear solver can find
//! the node voltages v in G·v = i.
//!
//! Stamp targets are `Option<usize>`: `Some(index)` is a matrix row for a
//! modeled node, `None` is the ground reference (the eliminated row).
//! Voltage sources use the identity-row constraint form: the constrained
//! row is replaced by eₙ and the RHS entry by the source voltage. This is
//! a deliberate simplification that holds because the only voltage sources
//! in this core are pin outputs referenced to a distinct ground; a
//! generalization to floating sources requires Modified Nodal Analysis
//! with auxiliary current variables.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// Stamps with magnitude below this threshold are numerical noise and are
/// discarded. The linear solver uses the same value as its pivot
/// singularity threshold.
pub const STAMP_EPSILON: f64 = 1e-10;

/// Threshold below which a driven voltage is treated as zero.
pub const SOURCE_THRESHOLD: f64 = 0.01;

type BranchKey = (Option<usize>, Option<usize>);

/// Dense nodal system G·v = i with tracked branch currents.
///
/// Additive stamps accumulate in the raw matrix; voltage constraints are
/// recorded separately and applied to a working copy by
/// [`assemble`](NodalSystem::assemble), after every additive stamp. The raw
/// matrix therefore stays intact for branch-current retrieval, and stamp
/// order can never corrupt a constraint row.
#[derive(Debug, Clone)]
pub struct NodalSystem {
    matrix: DMatrix<f64>,
    rhs: DVector<f64>,
    constraints: Vec<(usize, f64)>,
    branch_currents: HashMap<BranchKey, f64>,
    solution: Option<DVector<f64>>,
    dimension: usize,
}

impl NodalSystem {
    /// Create a system of the given dimension (node count, ground
    /// included).
    pub fn new(dimension: usize) -> Self {
        Self {
            matrix: DMatrix::zeros(dimension, dimension),
            rhs: DVector::zeros(dimension),
            constraints: Vec::new(),
            branch_currents: HashMap::new(),
            solution: None,
            dimension,
        }
    }

    /// Matrix dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Clear all stamps, constraints, branch currents, and the stored
    /// solution. Allocated storage is retained.
    pub fn clear(&mut self) {
        self.matrix.fill(0.0);
        self.rhs.fill(0.0);
        self.constraints.clear();
        self.branch_currents.clear();
        self.solution = None;
    }

    fn check(&self, index: usize) -> Result<()> {
        if index < self.dimension {
            Ok(())
        } else {
            Err(Error::Dimension {
                index,
                dimension: self.dimension,
            })
        }
    }

    /// Stamp a conductance between two nodes.
    ///
    /// For a conductance g between rows a and b:
    /// G[a,a] += g, G[b,b] += g, G[a,b] -= g, G[b,a] -= g.
    /// A `None` side contributes only the diagonal term of the other side.
    /// Conductances below [`STAMP_EPSILON`] are discarded.
    pub fn add_conductance(&mut self, a: Option<usize>, b: Option<usize>, g: f64) -> Result<()> {
        if g < STAMP_EPSILON {
            return Ok(());
        }
        if let Some(i) = a {
            self.check(i)?;
        }
        if let Some(j) = b {
            self.check(j)?;
        }
        if let Some(i) = a {
            self.matrix[(i, i)] += g;
        }
        if let Some(j) = b {
            self.matrix[(j, j)] += g;
        }
        if let (Some(i), Some(j)) = (a, b) {
            self.matrix[(i, j)] -= g;
            self.matrix[(j, i)] -= g;
        }
        Ok(())
    }

    /// Stamp a current source from node a to node b.
    ///
    /// Positive current leaves a and enters b. The value is recorded in the
    /// branch-current table keyed by `(a, b)` for later retrieval. Currents
    /// below [`STAMP_EPSILON`] in magnitude are discarded.
    pub fn add_current_source(
        &mut self,
        a: Option<usize>,
        b: Option<usize>,
        current: f64,
    ) -> Result<()> {
        if current.abs() < STAMP_EPSILON {
            return Ok(());
        }
        if let Some(i) = a {
            self.check(i)?;
        }
        if let Some(j) = b {
            self.check(j)?;
        }
        if let Some(i) = a {
            self.rhs[i] -= current;
        }
        if let Some(j) = b {
            self.rhs[j] += current;
        }
        self.branch_currents.insert((a, b), current);
        Ok(())
    }

    /// Stamp a voltage source between two nodes in identity-row constraint
    /// form.
    ///
    /// Node a is pinned to `voltage`; when b is a modeled node it is pinned
    /// to 0 (the source is assumed to be referenced to ground). When a is
    /// ground, b is pinned to `-voltage`.
    pub fn add_voltage_source(
        &mut self,
        a: Option<usize>,
        b: Option<usize>,
        voltage: f64,
    ) -> Result<()> {
        match (a, b) {
            (Some(i), None) => self.set_node_voltage(i, voltage),
            (Some(i), Some(j)) => {
                self.set_node_voltage(i, voltage)?;
                self.set_node_voltage(j, 0.0)
            }
            (None, Some(j)) => self.set_node_voltage(j, -voltage),
            (None, None) => Ok(()),
        }
    }

    /// Pin a node to a fixed voltage with an identity-row constraint.
    /// Used for ground and for fixed-voltage stamping.
    pub fn set_node_voltage(&mut self, node: usize, voltage: f64) -> Result<()> {
        self.check(node)?;
        self.constraints.push((node, voltage));
        Ok(())
    }

    /// Produce the working matrix and RHS with all voltage constraints
    /// applied, in recording order.
    pub fn assemble(&self) -> (DMatrix<f64>, DVector<f64>) {
        let mut a = self.matrix.clone();
        let mut b = self.rhs.clone();
        for &(row, voltage) in &self.constraints {
            for col in 0..self.dimension {
                a[(row, col)] = 0.0;
            }
            a[(row, row)] = 1.0;
            b[row] = voltage;
        }
        (a, b)
    }

    /// Store a solution vector for subsequent voltage and current queries.
    pub fn store_solution(&mut self, solution: DVector<f64>) -> Result<()> {
        if solution.len() != self.dimension {
            return Err(Error::Dimension {
                index: solution.len(),
                dimension: self.dimension,
            });
        }
        self.solution = Some(solution);
        Ok(())
    }

    /// Solved voltage at a node. Ground and unsolved systems read as 0 V.
    pub fn voltage(&self, node: Option<usize>) -> f64 {
        match (node, &self.solution) {
            (Some(i), Some(v)) if i < self.dimension => v[i],
            _ => 0.0,
        }
    }

    /// Branch current between two nodes.
    ///
    /// A stored current-source value for the pair takes precedence.
    /// Otherwise the current is recovered from the off-diagonal conductance
    /// and the voltage difference; for a branch to ground, from the row sum.
    pub fn branch_current(&self, a: Option<usize>, b: Option<usize>) -> f64 {
        if let Some(&current) = self.branch_currents.get(&(a, b)) {
            return current;
        }
        match (a, b) {
            (Some(i), Some(j)) if i < self.dimension && j < self.dimension => {
                let g = -self.matrix[(i, j)];
                g * (self.voltage(a) - self.voltage(b))
            }
            (Some(i), None) if i < self.dimension => {
                // Row sum leaves only the conductance to the reference.
                let mut g = self.matrix[(i, i)];
                for col in 0..self.dimension {
                    if col != i {
                        g += self.matrix[(i, col)];
                    }
                }
                g * self.voltage(a)
            }
            _ => 0.0,
        }
    }

    /// Current injected into a node by a voltage constraint: the KCL
    /// residual of the raw stamped row at the solved voltages.
    pub fn injected_current(&self, node: usize) -> f64 {
        let Some(solution) = &self.solution else {
            return 0.0;
        };
        if node >= self.dimension {
            return 0.0;
        }
        let mut sum = 0.0;
        for col in 0..self.dimension {
            sum += self.matrix[(node, col)] * solution[col];
        }
        sum - self.rhs[node]
    }

    /// Raw stamped matrix, constraints not applied.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Raw stamped right-hand side, constraints not applied.
    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_conductance() {
        let mut sys = NodalSystem::new(2);
        sys.add_conductance(Some(0), Some(1), 1.0).unwrap();

        assert_eq!(sys.matrix()[(0, 0)], 1.0);
        assert_eq!(sys.matrix()[(1, 1)], 1.0);
        assert_eq!(sys.matrix()[(0, 1)], -1.0);
        assert_eq!(sys.matrix()[(1, 0)], -1.0);
    }

    #[test]
    fn test_stamp_conductance_to_reference() {
        let mut sys = NodalSystem::new(2);
        sys.add_conductance(Some(0), None, 0.04).unwrap();

        assert_eq!(sys.matrix()[(0, 0)], 0.04);
        assert_eq!(sys.matrix()[(1, 1)], 0.0);
    }

    #[test]
    fn test_tiny_conductance_discarded() {
        let mut sys = NodalSystem::new(1);
        sys.add_conductance(Some(0), None, 1e-12).unwrap();
        assert_eq!(sys.matrix()[(0, 0)], 0.0);
    }

    #[test]
    fn test_stamp_out_of_range() {
        let mut sys = NodalSystem::new(2);
        let err = sys.add_conductance(Some(5), None, 1.0).unwrap_err();
        assert_eq!(
            err,
            Error::Dimension {
                index: 5,
                dimension: 2
            }
        );
    }

    #[test]
    fn test_stamp_current_source() {
        let mut sys = NodalSystem::new(2);
        sys.add_current_source(None, Some(0), 0.01).unwrap();

        assert_eq!(sys.rhs()[0], 0.01);
        assert_eq!(sys.rhs()[1], 0.0);
        assert_eq!(sys.branch_current(None, Some(0)), 0.01);
    }

    #[test]
    fn test_constraint_survives_later_stamp() {
        // A conductance stamped after the constraint must not disturb the
        // constrained row in the assembled system.
        let mut sys = NodalSystem::new(2);
        sys.set_node_voltage(0, 5.0).unwrap();
        sys.add_conductance(Some(0), Some(1), 0.1).unwrap();

        let (a, b) = sys.assemble();
        assert_eq!(a[(0, 0)], 1.0);
        assert_eq!(a[(0, 1)], 0.0);
        assert_eq!(b[0], 5.0);
        // The unconstrained row keeps its stamps.
        assert_eq!(a[(1, 1)], 0.1);
        assert_eq!(a[(1, 0)], -0.1);
    }

    #[test]
    fn test_injected_current() {
        // Node 0 pinned to 5 V, 10 ohm to the reference: the constraint
        // must inject 0.5 A.
        let mut sys = NodalSystem::new(1);
        sys.add_conductance(Some(0), None, 0.1).unwrap();
        sys.set_node_voltage(0, 5.0).unwrap();
        sys.store_solution(DVector::from_vec(vec![5.0])).unwrap();

        assert!((sys.injected_current(0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_branch_current_from_voltages() {
        let mut sys = NodalSystem::new(2);
        sys.add_conductance(Some(0), Some(1), 0.5).unwrap();
        sys.store_solution(DVector::from_vec(vec![3.0, 1.0])).unwrap();

        // I = g * (v0 - v1) = 0.5 * 2.0
        assert!((sys.branch_current(Some(0), Some(1)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_clear() {
        let mut sys = NodalSystem::new(2);
        sys.add_conductance(Some(0), Some(1), 1.0).unwrap();
        sys.set_node_voltage(0, 5.0).unwrap();
        sys.clear();

        assert_eq!(sys.matrix()[(0, 0)], 0.0);
        let (a, _) = sys.assemble();
        assert_eq!(a[(0, 0)], 0.0);
    }
}
