use crate::graph::Graph;
use crate::heap::{Heap, HeapItem};
use crate::model::Model;
use crate::tree::{Clique, CliqueId, JoinTree};
use crate::variable::VarId;
use trellis_error::{TrellisResult, ensure, trellis_bail, trellis_err};
use trellis_utils::SortedBuffer;

/// An elimination cluster: a variable position and its current neighborhood.
/// `members[0]` is always the generating position.
struct Cluster {
    members: Vec<usize>,
}

/// A scored clique pair awaiting spanning-tree selection.
struct SepsetCandidate {
    a: usize,
    b: usize,
    vars: SortedBuffer<VarId>,
}

/// Number of edges missing between cluster members, i.e. the fill-ins
/// this elimination would force.
fn fill_in_edges(graph: &Graph, members: &[usize]) -> i64 {
    let mut missing = 0;
    for (i, &a) in members.iter().enumerate() {
        for &b in &members[i + 1..] {
            if !graph.is_adjacent(a, b) {
                missing += 1;
            }
        }
    }
    missing
}

/// State-space weight of a cluster: the product of member cardinalities.
fn cluster_weight(graph: &Graph, model: &Model, members: &[usize]) -> u64 {
    members
        .iter()
        .map(|&p| model.variable(graph.var_at(p)).cardinality() as u64)
        .product()
}

fn build_cluster_heap(graph: &Graph, model: &Model) -> Heap<Cluster> {
    let items = (0..graph.len())
        .map(|position| {
            let mut members = vec![position];
            members.extend(graph.neighbors(position));
            HeapItem {
                primary: fill_in_edges(graph, &members),
                secondary: cluster_weight(graph, model, &members),
                payload: Cluster { members },
            }
        })
        .collect();
    Heap::new(items)
}

/// Triangulate an undirected graph by minimum-weight greedy elimination,
/// filling edges into `graph` as clusters are eliminated. Returns the
/// maximal clusters as variable sets in elimination-acceptance order.
pub(crate) fn triangulate(
    graph: &mut Graph,
    model: &Model,
) -> TrellisResult<Vec<SortedBuffer<VarId>>> {
    let n = graph.len();
    let mut heap = build_cluster_heap(graph, model);
    // accepted clusters, newest first
    let mut clusters: Vec<SortedBuffer<usize>> = Vec::new();

    for _ in 0..n {
        let min = heap
            .extract_min()
            .ok_or_else(|| trellis_err!(Inconsistent: "elimination heap exhausted early"))?;
        let members = min.payload.members;
        let eliminated = members[0];

        // Merge the eliminated cluster into each surviving neighbor's
        // cluster and rescore, then repair the heap shape. Scores are taken
        // against the graph as it stands before this round's fill-ins.
        for &u in &members[1..] {
            if let Some(pos) = heap.position_where(|c| c.members[0] == u) {
                heap.rescore(pos, |cluster| {
                    for &m in &members {
                        if m != eliminated && !cluster.members.contains(&m) {
                            cluster.members.push(m);
                        }
                    }
                    cluster.members.retain(|&m| m != eliminated);
                    (
                        fill_in_edges(graph, &cluster.members),
                        cluster_weight(graph, model, &cluster.members),
                    )
                });
            }
        }
        for &u in &members[1..] {
            if let Some(pos) = heap.position_where(|c| c.members[0] == u) {
                heap.sift_down(pos);
            }
        }
        heap.sift_down(0);

        // make the cluster complete in the working graph
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                graph.connect(a, b);
            }
        }

        // maximality filter: keep only clusters not covered by an earlier one
        let candidate: SortedBuffer<usize> = members.iter().copied().collect();
        if !clusters.iter().any(|c| candidate.is_subset_of(c)) {
            clusters.insert(0, candidate);
        }
    }

    Ok(clusters
        .into_iter()
        .rev()
        .map(|set| set.iter().map(|&p| graph.var_at(p)).collect())
        .collect())
}

/// Connect the cliques into a spanning tree: every pair becomes a candidate
/// sepset, extracted best-first (largest intersection, then lightest hosts)
/// and accepted only when its hosts are not yet connected. Exactly `k - 1`
/// acceptances produce a tree satisfying the running intersection property.
pub(crate) fn find_sepsets(tree: &mut JoinTree, model: &Model) -> TrellisResult<()> {
    let k = tree.cliques().len();
    if k <= 1 {
        return Ok(());
    }

    let mut items = Vec::with_capacity(k * (k - 1) / 2);
    for i in 0..k - 1 {
        for j in i + 1..k {
            let one = &tree.cliques()[i];
            let two = &tree.cliques()[j];
            let intersection = one.vars().intersection(two.vars());
            items.push(HeapItem {
                primary: -(intersection.len() as i64),
                secondary: one.weight() + two.weight(),
                payload: SepsetCandidate {
                    a: i,
                    b: j,
                    vars: intersection,
                },
            });
        }
    }
    let mut heap = Heap::new(items);

    let mut inserted = 0;
    while inserted < k - 1 {
        let Some(min) = heap.extract_min() else {
            trellis_bail!(Inconsistent: "candidate sepsets ran out before the cliques were spanned");
        };
        let candidate = min.payload;
        let (a, b) = (CliqueId(candidate.a), CliqueId(candidate.b));
        if !tree.connected(a, b) {
            tree.add_sepset(a, b, candidate.vars, model)?;
            inserted += 1;
        }
    }
    Ok(())
}

/// Compile a model into a junction tree:
/// moralize → interface augmentation → undirect → triangulate → sepsets,
/// then assign family cliques and fold every CPT into its host.
pub fn compile(model: &mut Model) -> TrellisResult<JoinTree> {
    ensure!(!model.is_empty(), InvalidArgument: "cannot compile an empty model");

    let mut graph = Graph::from_model(model)
        .moralize()
        .add_interface_edges(model)
        .to_undirected();

    let clusters = triangulate(&mut graph, model)?;
    tracing::debug!(cliques = clusters.len(), "triangulation complete");

    let cliques = clusters
        .into_iter()
        .map(|vars| Clique::new(vars, model))
        .collect::<TrellisResult<Vec<_>>>()?;
    let mut tree = JoinTree::new(cliques);
    find_sepsets(&mut tree, model)?;

    for idx in 0..model.len() {
        let id = VarId::from(idx);
        let family = model.variable(id).family();
        let clique = tree.find_clique_covering(&family).ok_or_else(|| {
            trellis_err!(
                Inconsistent: "no clique contains the family of '{}'",
                model.variable(id).symbol()
            )
        })?;
        model.variable_mut(id).set_family_clique(clique);
    }

    for idx in 0..model.len() {
        let id = VarId::from(idx);
        let Some(cpt) = model.cpt(id) else {
            continue;
        };
        let host = model.variable(id).family_clique().ok_or_else(
            || trellis_err!(Inconsistent: "family clique missing after assignment"),
        )?;

        // CPT dimensions are (child, parents...) in declared order
        let mut mapping = Vec::with_capacity(cpt.rank());
        for v in std::iter::once(id).chain(model.variable(id).parents().iter().copied()) {
            let dim = tree.clique(host).dimension_of(v).ok_or_else(
                || trellis_err!(Inconsistent: "family clique does not contain the whole family"),
            )?;
            mapping.push(dim);
        }
        tree.inject_potential(host, cpt, &mapping)?;
    }

    tree.snapshot_originals();
    tracing::debug!(
        cliques = tree.cliques().len(),
        sepsets = tree.sepsets().len(),
        "model compiled"
    );
    Ok(tree)
}
