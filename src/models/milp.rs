use std::collections::HashMap;

use good_lp::{constraint, variable, Constraint, Expression, ProblemVariables, Solution, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Continuous,
    Binary,
}

/// A decision variable together with the name it is reported under
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub var: Variable,
    pub vtype: VarType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

/// A named linear row `lhs <sense> rhs`. `lhs` carries no constant term.
#[derive(Debug, Clone)]
pub struct Row {
    pub name: String,
    pub lhs: Expression,
    pub sense: Sense,
    pub rhs: f64,
}

impl Row {
    pub fn constraint(&self) -> Constraint {
        let lhs = self.lhs.clone();
        let rhs = self.rhs;
        match self.sense {
            Sense::Le => constraint!(lhs <= rhs),
            Sense::Ge => constraint!(lhs >= rhs),
            Sense::Eq => constraint!(lhs == rhs),
        }
    }

    /// How far `values` are from satisfying the row, 0 when it holds
    pub fn violation<S: Solution>(&self, values: &S) -> f64 {
        let lhs = self.lhs.eval_with(values);
        match self.sense {
            Sense::Le => (lhs - self.rhs).max(0.0),
            Sense::Ge => (self.rhs - lhs).max(0.0),
            Sense::Eq => (lhs - self.rhs).abs(),
        }
    }
}

/// Everything about a minimization model except the good_lp variable registry, which is consumed
/// by the solver.
#[derive(Debug, Clone)]
pub struct Formulation {
    pub name: String,
    /// Variables in creation order
    pub columns: Vec<Column>,
    pub objective: Expression,
    pub rows: Vec<Row>,
}

impl Formulation {
    pub fn num_vars(&self) -> usize {
        self.columns.len()
    }

    pub fn num_binaries(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| c.vtype == VarType::Binary)
            .count()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, name: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.name == name)
    }

    /// Pairs column-ordered `values` with their variables
    pub fn assignment(&self, values: &[f64]) -> HashMap<Variable, f64> {
        self.columns
            .iter()
            .zip(values)
            .map(|(c, v)| (c.var, *v))
            .collect()
    }

    /// Names of the rows that `values` violate by more than `tolerance`, relative to the row's rhs
    pub fn violated(&self, values: &[f64], tolerance: f64) -> Vec<&str> {
        let assignment = self.assignment(values);
        self.rows
            .iter()
            .filter(|r| r.violation(&assignment) > tolerance * (1.0 + r.rhs.abs()))
            .map(|r| r.name.as_str())
            .collect()
    }
}

/// Builds a [`Formulation`] while registering its variables with good_lp.
pub struct MilpModel {
    variables: ProblemVariables,
    formulation: Formulation,
}

impl MilpModel {
    pub fn new(name: &str) -> MilpModel {
        MilpModel {
            variables: ProblemVariables::new(),
            formulation: Formulation {
                name: name.to_string(),
                columns: Vec::new(),
                objective: Expression::from(0.0),
                rows: Vec::new(),
            },
        }
    }

    /// Adds a non-negative continuous or a binary variable
    pub fn add_var(&mut self, name: &str, vtype: VarType) -> Variable {
        let definition = match vtype {
            VarType::Continuous => variable().min(0.0),
            VarType::Binary => variable().binary(),
        };
        let var = self.variables.add(definition.name(name));
        self.formulation.columns.push(Column {
            name: name.to_string(),
            var,
            vtype,
        });
        var
    }

    pub fn add_row(&mut self, name: String, lhs: Expression, sense: Sense, rhs: f64) {
        self.formulation.rows.push(Row {
            name,
            lhs,
            sense,
            rhs,
        });
    }

    pub fn set_objective(&mut self, objective: Expression) {
        self.formulation.objective = objective;
    }

    pub fn formulation(&self) -> &Formulation {
        &self.formulation
    }

    pub fn into_parts(self) -> (ProblemVariables, Formulation) {
        (self.variables, self.formulation)
    }
}
