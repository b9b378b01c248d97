use trellis_core::*;

/// Chain A -> B -> C, all binary. P(A) = [0.3, 0.7] is NOT folded into the
/// tree at compile time; enter it as soft evidence the way the time-slice
/// engine applies priors.
pub fn chain_model() -> Model {
    let mut b = Model::builder();
    let a = b.variable("A", "source", &["0", "1"]).unwrap();
    let mid = b.variable("B", "middle", &["0", "1"]).unwrap();
    let c = b.variable("C", "sink", &["0", "1"]).unwrap();
    b.prior(a, &[0.3, 0.7]).unwrap();
    // tables are flat with the child least significant
    b.cpt(mid, &[a], &[0.9, 0.1, 0.2, 0.8]).unwrap();
    b.cpt(c, &[mid], &[0.8, 0.2, 0.3, 0.7]).unwrap();
    b.build().unwrap()
}

/// V-structure A -> C <- B with uniform parents and a noisy-XOR child:
/// P(C = 0 | a, b) is 0.9 when a == b and 0.1 otherwise.
pub fn xor_model() -> Model {
    let mut b = Model::builder();
    let a = b.variable("A", "", &["0", "1"]).unwrap();
    let bb = b.variable("B", "", &["0", "1"]).unwrap();
    let c = b.variable("C", "", &["0", "1"]).unwrap();
    b.prior(a, &[0.5, 0.5]).unwrap();
    b.prior(bb, &[0.5, 0.5]).unwrap();
    b.cpt(
        c,
        &[a, bb],
        &[
            0.9, 0.1, // a=0, b=0
            0.1, 0.9, // a=1, b=0
            0.1, 0.9, // a=0, b=1
            0.9, 0.1, // a=1, b=1
        ],
    )
    .unwrap();
    b.build().unwrap()
}

/// Compile a model and enter the declared priors as soft evidence.
pub fn compile_with_priors(model: &mut Model) -> JoinTree {
    let mut tree = compile(model).unwrap();
    let priors: Vec<(VarId, Vec<f64>)> = model
        .independent()
        .filter_map(|v| model.prior(v.id()).map(|p| (v.id(), p.to_vec())))
        .collect();
    for (var, prior) in priors {
        tree.enter_evidence(model, var, &prior).unwrap();
    }
    tree
}

pub fn assert_close(actual: &[f64], expected: &[f64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tolerance,
            "entry {}: {} != {} (tolerance {})",
            i,
            a,
            e,
            tolerance
        );
    }
}
