use trellis::*;

fn main() -> TrellisResult<()> {
    init_logging();
    domain::random_provider::set_seed(40);

    // 1) A two-state HMM as a two-slice template: X0 is the previous
    //    slice's hidden state, X the current one, Y the observation.
    let mut b = Model::builder();
    let x0 = b.variable("X0", "previous state", &["lo", "hi"])?;
    let x = b.variable("X", "hidden state", &["lo", "hi"])?;
    let y = b.variable("Y", "observation", &["lo", "hi"])?;

    b.prior(x0, &[0.6, 0.4])?;
    b.cpt(x, &[x0], &[0.85, 0.15, 0.15, 0.85])?;
    b.cpt(y, &[x], &[0.9, 0.1, 0.2, 0.8])?;
    b.interface(x, Interface::Outgoing);
    b.interface(x0, Interface::OldOutgoing);
    b.next_link(x, x0)?;

    // 2) Compile and have a look at the junction tree
    let mut engine = TimeSliceEngine::new(b.build()?)?;
    println!("{}", engine.tree());

    // 3) Sample a synthetic observation sequence, then hide the states
    let sampled = engine.generate(&["Y", "X"], 20)?;
    let mut series = TimeSeries::new(engine.model(), &["Y"])?;
    for t in 0..sampled.len() {
        series.push_row(&[sampled.value_of(t, y)])?;
    }

    // 4) Filtering and smoothing over the hidden chain
    let (filtered, loglik) = engine.forward(&series, &[x])?;
    let smoothed = engine.forward_backward(&series, &[x])?;

    println!("log-likelihood of the sequence: {:.6}", loglik);
    println!(" t   Y    true   P(hi|y_0..t)   P(hi|y_0..T)");
    for t in 0..series.len() {
        println!(
            "{:2}   {}    {}      {:.4}         {:.4}",
            t,
            sampled.value_of(t, y).unwrap(),
            sampled.value_of(t, x).unwrap(),
            filtered.distribution(t, x).unwrap()[1],
            smoothed.distribution(t, x).unwrap()[1],
        );
    }
    Ok(())
}
