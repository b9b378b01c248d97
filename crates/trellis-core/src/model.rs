use crate::potential::Potential;
use crate::variable::{Interface, MAX_NAME_LEN, MAX_SYMBOL_LEN, VarId, Variable};
use std::collections::HashMap;
use trellis_error::{TrellisResult, ensure, trellis_err};
use trellis_utils::SortedBuffer;

/// A fully constructed network: the owned variable table, the conditional
/// probability table of every variable with parents, the priors of the
/// parentless ones, and the DBN annotations.
///
/// A `Model` is what an external loader (e.g. a HUGIN NET parser) hands to
/// the compiler. It carries no process-wide state; independent models are
/// fully isolated. In-process construction goes through
/// [ModelBuilder].
#[derive(Clone, Debug)]
pub struct Model {
    variables: Vec<Variable>,
    cpts: Vec<Option<Potential>>,
    priors: Vec<Option<Vec<f64>>>,
    symbols: HashMap<String, VarId>,
}

impl Model {
    pub fn builder() -> ModelBuilder {
        ModelBuilder {
            variables: Vec::new(),
            cpts: Vec::new(),
            priors: Vec::new(),
            symbols: HashMap::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    #[inline]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    #[inline]
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    #[inline]
    pub fn variable_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.variables[id.index()]
    }

    /// Look a variable up by its short symbol.
    pub fn find(&self, symbol: &str) -> Option<VarId> {
        self.symbols.get(symbol).copied()
    }

    pub fn variable_by_symbol(&self, symbol: &str) -> TrellisResult<&Variable> {
        self.find(symbol)
            .map(|id| self.variable(id))
            .ok_or_else(|| trellis_err!(NotFound: "no variable with symbol '{}'", symbol))
    }

    /// The conditional probability table of a variable with parents, over
    /// `(child, parent_1, ..., parent_k)` with the child least significant.
    pub fn cpt(&self, id: VarId) -> Option<&Potential> {
        self.cpts[id.index()].as_ref()
    }

    /// The prior of a parentless variable, if one was declared.
    pub fn prior(&self, id: VarId) -> Option<&[f64]> {
        self.priors[id.index()].as_deref()
    }

    /// Variables with at least one parent.
    pub fn children(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|v| !v.parents().is_empty())
    }

    /// Variables without parents.
    pub fn independent(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|v| v.parents().is_empty())
    }

    /// Variables flagged as the outgoing time-slice interface, ascending.
    pub fn outgoing_interface(&self) -> SortedBuffer<VarId> {
        self.interface_set(Interface::Outgoing)
    }

    /// Variables standing in for the previous slice's outgoing interface.
    pub fn old_outgoing_interface(&self) -> SortedBuffer<VarId> {
        self.interface_set(Interface::OldOutgoing)
    }

    fn interface_set(&self, flag: Interface) -> SortedBuffer<VarId> {
        self.variables
            .iter()
            .filter(|v| v.interface() == flag)
            .map(|v| v.id())
            .collect()
    }

    /// Forget all evidence: every likelihood back to all-ones.
    pub fn reset_likelihoods(&mut self) {
        for v in self.variables.iter_mut() {
            v.reset_likelihood();
        }
    }
}

/// Incremental construction of a [Model] with the validation the wire
/// formats leave to us: unique symbols, positive cardinalities, CPT
/// geometry, and slice-link compatibility.
pub struct ModelBuilder {
    variables: Vec<Variable>,
    cpts: Vec<Option<Potential>>,
    priors: Vec<Option<Vec<f64>>>,
    symbols: HashMap<String, VarId>,
}

impl ModelBuilder {
    /// Declare a variable and get its id. Ids are assigned monotonically in
    /// declaration order.
    pub fn variable(&mut self, symbol: &str, name: &str, states: &[&str]) -> TrellisResult<VarId> {
        ensure!(
            !symbol.is_empty() && symbol.len() <= MAX_SYMBOL_LEN,
            InvalidArgument: "symbol '{}' must be 1..={} characters",
            symbol,
            MAX_SYMBOL_LEN
        );
        ensure!(
            name.len() <= MAX_NAME_LEN,
            InvalidArgument: "name of '{}' exceeds {} characters",
            symbol,
            MAX_NAME_LEN
        );
        ensure!(
            !states.is_empty(),
            InvalidArgument: "variable '{}' needs at least one state",
            symbol
        );
        ensure!(
            !self.symbols.contains_key(symbol),
            InvalidArgument: "duplicate variable symbol '{}'",
            symbol
        );

        let id = VarId::from(self.variables.len());
        self.variables.push(Variable::new(
            id,
            symbol.to_string(),
            name.to_string(),
            states.iter().map(|s| s.to_string()).collect(),
        ));
        self.cpts.push(None);
        self.priors.push(None);
        self.symbols.insert(symbol.to_string(), id);
        Ok(id)
    }

    /// Attach a conditional probability table P(child | parents). `table`
    /// is flat over `(child, parent_1, ..., parent_k)` with the child least
    /// significant.
    pub fn cpt(&mut self, child: VarId, parents: &[VarId], table: &[f64]) -> TrellisResult<()> {
        ensure!(
            !parents.is_empty(),
            InvalidArgument: "'{}' has no parents; declare a prior instead",
            self.variables[child.index()].symbol()
        );
        ensure!(
            !parents.contains(&child),
            InvalidArgument: "'{}' cannot be its own parent",
            self.variables[child.index()].symbol()
        );

        let mut cards = vec![self.variables[child.index()].cardinality()];
        cards.extend(parents.iter().map(|p| self.variables[p.index()].cardinality()));

        let potential = Potential::new(&cards, Some(table))?;
        self.variables[child.index()].set_parents(parents.to_vec());
        self.cpts[child.index()] = Some(potential);
        Ok(())
    }

    /// Declare the prior distribution of a parentless variable.
    pub fn prior(&mut self, var: VarId, distribution: &[f64]) -> TrellisResult<()> {
        let v = &self.variables[var.index()];
        ensure!(
            distribution.len() == v.cardinality(),
            DimensionMismatch: "prior of '{}' has {} entries, variable has {} states",
            v.symbol(),
            distribution.len(),
            v.cardinality()
        );
        ensure!(
            distribution.iter().all(|&p| p >= 0.0),
            InvalidArgument: "prior of '{}' has negative entries",
            v.symbol()
        );
        self.priors[var.index()] = Some(distribution.to_vec());
        Ok(())
    }

    /// Flag a variable's time-slice interface membership.
    pub fn interface(&mut self, var: VarId, flag: Interface) {
        self.variables[var.index()].set_interface(flag);
    }

    /// Link an outgoing variable to the variable receiving its value in the
    /// following slice (its previous-slice stand-in in the template).
    pub fn next_link(&mut self, from: VarId, to: VarId) -> TrellisResult<()> {
        ensure!(
            self.variables[from.index()].cardinality() == self.variables[to.index()].cardinality(),
            InvalidArgument: "slice link '{}' -> '{}' joins variables of different cardinality",
            self.variables[from.index()].symbol(),
            self.variables[to.index()].symbol()
        );
        self.variables[from.index()].set_next(to);
        self.variables[to.index()].set_previous(from);
        Ok(())
    }

    pub fn build(self) -> TrellisResult<Model> {
        ensure!(!self.variables.is_empty(), InvalidArgument: "a model needs at least one variable");

        // every outgoing-interface variable must name its receiver
        for v in &self.variables {
            if v.interface() == Interface::Outgoing {
                ensure!(
                    v.next().is_some(),
                    InvalidArgument: "outgoing variable '{}' has no slice link",
                    v.symbol()
                );
            }
        }

        Ok(Model {
            variables: self.variables,
            cpts: self.cpts,
            priors: self.priors,
            symbols: self.symbols,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assigns_monotonic_ids() {
        let mut b = Model::builder();
        let a = b.variable("A", "first", &["0", "1"]).unwrap();
        let c = b.variable("C", "second", &["0", "1", "2"]).unwrap();
        assert_eq!(a, VarId(0));
        assert_eq!(c, VarId(1));

        let model = b.build().unwrap();
        assert_eq!(model.find("C"), Some(c));
        assert_eq!(model.variable(c).cardinality(), 3);
        assert!(model.find("X").is_none());
    }

    #[test]
    fn duplicate_symbols_rejected() {
        let mut b = Model::builder();
        b.variable("A", "", &["0", "1"]).unwrap();
        assert!(b.variable("A", "", &["0", "1"]).is_err());
    }

    #[test]
    fn cpt_geometry_validated() {
        let mut b = Model::builder();
        let a = b.variable("A", "", &["0", "1"]).unwrap();
        let c = b.variable("B", "", &["0", "1"]).unwrap();
        assert!(b.cpt(c, &[a], &[0.9, 0.1]).is_err()); // needs 4 cells
        b.cpt(c, &[a], &[0.9, 0.1, 0.2, 0.8]).unwrap();

        let model = b.build().unwrap();
        assert_eq!(model.variable(c).parents(), &[a]);
        assert_eq!(model.cpt(c).unwrap().cardinality(), &[2, 2]);
        assert!(model.cpt(a).is_none());
    }

    #[test]
    fn outgoing_without_link_rejected() {
        let mut b = Model::builder();
        let x = b.variable("X", "", &["0", "1"]).unwrap();
        b.interface(x, Interface::Outgoing);
        assert!(b.build().is_err());
    }

    #[test]
    fn slice_links_pair_up() {
        let mut b = Model::builder();
        let x0 = b.variable("X0", "", &["0", "1"]).unwrap();
        let x = b.variable("X", "", &["0", "1"]).unwrap();
        b.interface(x, Interface::Outgoing);
        b.interface(x0, Interface::OldOutgoing);
        b.next_link(x, x0).unwrap();

        let model = b.build().unwrap();
        assert_eq!(model.variable(x).next(), Some(x0));
        assert_eq!(model.variable(x0).previous(), Some(x));
        assert_eq!(model.outgoing_interface().as_slice(), &[x]);
        assert_eq!(model.old_outgoing_interface().as_slice(), &[x0]);
    }

    #[test]
    fn link_cardinalities_must_match() {
        let mut b = Model::builder();
        let x = b.variable("X", "", &["0", "1"]).unwrap();
        let y = b.variable("Y", "", &["0", "1", "2"]).unwrap();
        assert!(b.next_link(x, y).is_err());
    }
}
