mod utils;

#[cfg(test)]
mod tests {
    use super::utils::*;
    use trellis_core::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn chain_marginals_match_hand_computation() {
        let mut model = chain_model();
        let mut tree = compile_with_priors(&mut model);
        tree.make_consistent().unwrap();

        let a = model.find("A").unwrap();
        let b = model.find("B").unwrap();
        let c = model.find("C").unwrap();

        // P(B) = [0.3*0.9 + 0.7*0.2, ...] = [0.41, 0.59]
        // P(C) = [0.8*0.41 + 0.3*0.59, ...] = [0.505, 0.495]
        assert_close(&tree.distribution_of(&model, a).unwrap(), &[0.3, 0.7], TOL);
        assert_close(&tree.distribution_of(&model, b).unwrap(), &[0.41, 0.59], TOL);
        assert_close(
            &tree.distribution_of(&model, c).unwrap(),
            &[0.505, 0.495],
            TOL,
        );
    }

    #[test]
    fn hard_evidence_flows_against_the_arrows() {
        let mut model = chain_model();
        let mut tree = compile_with_priors(&mut model);
        let a = model.find("A").unwrap();
        let c = model.find("C").unwrap();

        tree.enter_observation(&mut model, c, 0).unwrap();
        tree.make_consistent().unwrap();

        // P(A = a | C = 0) ∝ P(a) Σ_b P(b|a) P(C=0|b)
        let joint0 = 0.3 * (0.9 * 0.8 + 0.1 * 0.3);
        let joint1 = 0.7 * (0.2 * 0.8 + 0.8 * 0.3);
        let total = joint0 + joint1;
        assert_close(
            &tree.distribution_of(&model, a).unwrap(),
            &[joint0 / total, joint1 / total],
            TOL,
        );

        // evidence has mass only at the observed state
        assert_close(&tree.distribution_of(&model, c).unwrap(), &[1.0, 0.0], TOL);

        // the unnormalized tree mass is P(C = 0)
        assert!((tree.total_mass() - 0.505).abs() < TOL);
    }

    #[test]
    fn xor_evidence_adjusts_both_parents_symmetrically() {
        let mut model = xor_model();
        let mut tree = compile_with_priors(&mut model);
        let a = model.find("A").unwrap();
        let b = model.find("B").unwrap();
        let c = model.find("C").unwrap();

        tree.enter_observation(&mut model, c, 0).unwrap();
        tree.make_consistent().unwrap();

        let pa = tree.distribution_of(&model, a).unwrap();
        let pb = tree.distribution_of(&model, b).unwrap();

        // by symmetry the parents stay uniform and identical
        assert_close(&pa, &[0.5, 0.5], TOL);
        assert_close(&pa, &pb, TOL);
    }

    #[test]
    fn sepset_marginals_agree_after_consistency() {
        let mut model = chain_model();
        let mut tree = compile_with_priors(&mut model);
        let c = model.find("C").unwrap();
        tree.enter_observation(&mut model, c, 1).unwrap();
        tree.make_consistent().unwrap();

        for sepset in tree.sepsets() {
            let (one, two) = sepset.cliques();
            let mut from_one = tree.joint_marginal(one, sepset.vars(), &model).unwrap();
            let mut from_two = tree.joint_marginal(two, sepset.vars(), &model).unwrap();
            from_one.normalize_mass();
            from_two.normalize_mass();
            assert_close(from_one.data(), from_two.data(), TOL);
        }
    }

    #[test]
    fn marginals_do_not_depend_on_the_root() {
        let mut reference: Option<Vec<Vec<f64>>> = None;
        let clique_count = {
            let mut model = chain_model();
            compile_with_priors(&mut model).cliques().len()
        };

        for root in 0..clique_count {
            let mut model = chain_model();
            let mut tree = compile_with_priors(&mut model);
            let c = model.find("C").unwrap();
            tree.enter_observation(&mut model, c, 0).unwrap();
            tree.make_consistent_from(CliqueId(root)).unwrap();

            let marginals: Vec<Vec<f64>> = model
                .variables()
                .iter()
                .map(|v| tree.distribution_of(&model, v.id()).unwrap())
                .collect();

            match &reference {
                None => reference = Some(marginals),
                Some(expected) => {
                    for (got, want) in marginals.iter().zip(expected) {
                        assert_close(got, want, TOL);
                    }
                }
            }
        }
    }

    #[test]
    fn reset_reproduces_the_compiled_state_exactly() {
        let mut pristine_model = chain_model();
        let pristine = compile(&mut pristine_model).unwrap();

        let mut model = chain_model();
        let mut tree = compile_with_priors(&mut model);
        let c = model.find("C").unwrap();
        tree.enter_observation(&mut model, c, 0).unwrap();
        tree.make_consistent().unwrap();

        tree.reset_evidence(&mut model).unwrap();

        for (clique, fresh) in tree.cliques().iter().zip(pristine.cliques()) {
            assert_eq!(clique.potential().data(), fresh.potential().data());
        }
        for v in model.variables() {
            assert!(v.likelihood().iter().all(|&l| l == 1.0));
        }
    }

    #[test]
    fn contradictory_observation_triggers_retraction() {
        let mut model = chain_model();
        let mut tree = compile_with_priors(&mut model);
        let c = model.find("C").unwrap();
        let a = model.find("A").unwrap();

        let first = tree.enter_observation(&mut model, c, 0).unwrap();
        assert_eq!(first, EvidenceOutcome::Updated);
        tree.make_consistent().unwrap();

        // C = 1 had been ruled out; re-observing it must retract globally
        let second = tree.enter_observation(&mut model, c, 1).unwrap();
        assert_eq!(second, EvidenceOutcome::Retracted);
        tree.make_consistent().unwrap();

        assert_close(&tree.distribution_of(&model, c).unwrap(), &[0.0, 1.0], TOL);

        // mass elsewhere is restored, and A's prior survived the retraction
        assert!(tree.total_mass() > 0.0);
        let joint0 = 0.3 * (0.9 * 0.2 + 0.1 * 0.7);
        let joint1 = 0.7 * (0.2 * 0.2 + 0.8 * 0.7);
        let total = joint0 + joint1;
        assert_close(
            &tree.distribution_of(&model, a).unwrap(),
            &[joint0 / total, joint1 / total],
            TOL,
        );
    }
}
