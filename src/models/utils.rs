use std::fmt::Display;

use good_lp::{Solution, Variable};

use super::milp::{MilpModel, VarType};

pub trait AddVars {
    type Out;

    /// Create a variable for every label, named `<base_name>_<label>`
    fn vars(&self, model: &mut MilpModel, base_name: &str, vtype: VarType) -> Self::Out;

    /// Binary variables
    fn binary(&self, model: &mut MilpModel, base_name: &str) -> Self::Out {
        self.vars(model, base_name, VarType::Binary)
    }

    /// A continuous non-negative variable
    fn cont(&self, model: &mut MilpModel, base_name: &str) -> Self::Out {
        self.vars(model, base_name, VarType::Continuous)
    }
}

impl<L: Display> AddVars for [L] {
    type Out = Vec<Variable>;

    fn vars(&self, model: &mut MilpModel, base_name: &str, vtype: VarType) -> Self::Out {
        self.iter()
            .map(|label| model.add_var(&format!("{}_{}", base_name, label), vtype))
            .collect()
    }
}

impl<A: Display, B: Display> AddVars for (&[A], &[B]) {
    type Out = Vec<<[B] as AddVars>::Out>;

    fn vars(&self, model: &mut MilpModel, base_name: &str, vtype: VarType) -> Self::Out {
        let mut out = Vec::with_capacity(self.0.len());
        for a in self.0 {
            out.push(self.1.vars(model, &format!("{}_{}", base_name, a), vtype));
        }

        out
    }
}

/// Trait that looks up the value of model variables in a solution
pub trait ConvertVars {
    type Out;
    fn convert<S: Solution>(&self, solution: &S) -> Self::Out;
}

impl<T: ConvertVars> ConvertVars for Vec<T> {
    type Out = Vec<T::Out>;

    fn convert<S: Solution>(&self, solution: &S) -> Self::Out {
        self.iter().map(|e| e.convert(solution)).collect()
    }
}

impl ConvertVars for Variable {
    type Out = f64;

    fn convert<S: Solution>(&self, solution: &S) -> Self::Out {
        solution.value(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grids_are_named_after_their_labels() {
        let mut model = MilpModel::new("grid");
        let rows = ["Anderson", "Bexar"];
        let cols = [1, 2, 3];

        let x = (&rows[..], &cols[..]).cont(&mut model, "Q");
        let h = cols.binary(&mut model, "H");

        assert_eq!(x.len(), 2);
        assert_eq!(x[1].len(), 3);

        let formulation = model.formulation();
        let names: Vec<&str> = formulation.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Q_Anderson_1", "Q_Anderson_2", "Q_Anderson_3", "Q_Bexar_1", "Q_Bexar_2", "Q_Bexar_3", "H_1", "H_2", "H_3"]
        );
        assert_eq!(formulation.columns[5].var, x[1][2]);
        assert_eq!(formulation.columns[8].var, h[2]);
        assert_eq!(formulation.columns[8].vtype, VarType::Binary);
        assert_eq!(formulation.num_binaries(), 3);

        let values: Vec<f64> = (0..formulation.num_vars()).map(|i| i as f64).collect();
        let assignment = formulation.assignment(&values);
        assert_eq!(x.convert(&assignment), vec![vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 5.0]]);
        assert_eq!(h.convert(&assignment), vec![6.0, 7.0, 8.0]);
    }
}
