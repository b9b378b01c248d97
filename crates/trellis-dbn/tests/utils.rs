use trellis_dbn::*;

/// Initial distribution of the hidden chain.
pub const PI: [f64; 2] = [0.6, 0.4];
/// `TRANSITION[i][j]` = P(X = j | X_prev = i).
pub const TRANSITION: [[f64; 2]; 2] = [[0.7, 0.3], [0.3, 0.7]];
/// `EMISSION[x][y]` = P(Y = y | X = x).
pub const EMISSION: [[f64; 2]; 2] = [[0.9, 0.1], [0.2, 0.8]];

/// The canonical two-state HMM as a two-slice template: X0 stands in for
/// the previous slice's hidden state and receives the interface message.
pub fn hmm_model() -> Model {
    let mut b = Model::builder();
    let x0 = b.variable("X0", "previous state", &["0", "1"]).unwrap();
    let x = b.variable("X", "hidden state", &["0", "1"]).unwrap();
    let y = b.variable("Y", "observation", &["0", "1"]).unwrap();

    b.prior(x0, &PI).unwrap();
    // flat tables with the child least significant
    b.cpt(
        x,
        &[x0],
        &[
            TRANSITION[0][0],
            TRANSITION[0][1],
            TRANSITION[1][0],
            TRANSITION[1][1],
        ],
    )
    .unwrap();
    b.cpt(
        y,
        &[x],
        &[
            EMISSION[0][0],
            EMISSION[0][1],
            EMISSION[1][0],
            EMISSION[1][1],
        ],
    )
    .unwrap();

    b.interface(x, Interface::Outgoing);
    b.interface(x0, Interface::OldOutgoing);
    b.next_link(x, x0).unwrap();
    b.build().unwrap()
}

/// An observation series over Y, `None` for missing steps.
pub fn series_of(model: &Model, observations: &[Option<usize>]) -> TimeSeries {
    let mut series = TimeSeries::new(model, &["Y"]).unwrap();
    for &y in observations {
        series.push_row(&[y]).unwrap();
    }
    series
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
