use hashring_lab::{
    HashAlgorithm,
    Node,
    Ring,
    RingBuilder,
    RingError,
    Session,
    SweepConfig,
    distribution,
    par_distribution,
    sweep,
};

fn sample_keys(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("key-{i}")).collect()
}

fn balance_ratio(prefix: &str, nodes: usize, replicas: u32, keys: &[String]) -> f64 {
    let ring = Ring::new("sha256", 64).unwrap();
    for i in 0..nodes {
        ring.add_node(Node::new(format!("{prefix}-node{i}")).with_replicas(replicas))
            .unwrap();
    }
    distribution(&ring.snapshot(), keys).unwrap().balance_ratio
}

#[test]
fn balance_improves_with_replicas() {
    let keys = sample_keys(10_000);

    let mut sparse = Vec::new();
    let mut dense = Vec::new();
    for seed in 0..5 {
        let prefix = format!("s{seed}");
        let one = balance_ratio(&prefix, 4, 1, &keys);
        let fifty = balance_ratio(&prefix, 4, 50, &keys);
        assert!(
            fifty < one,
            "seed {seed}: replicas=50 ({fifty:.3}) should beat replicas=1 ({one:.3})"
        );
        sparse.push(one);
        dense.push(fifty);
    }

    let mean = |ratios: &[f64]| ratios.iter().sum::<f64>() / ratios.len() as f64;
    assert!(mean(&sparse) > 1.5, "replicas=1 mean: {}", mean(&sparse));
    assert!(mean(&dense) < 1.25, "replicas=50 mean: {}", mean(&dense));
}

#[test]
fn weight_is_proportional() {
    let ring = Ring::new("sha256", 64).unwrap();
    ring.add_node(Node::new("light").with_replicas(200)).unwrap();
    ring.add_node(Node::new("heavy").with_replicas(200).with_weight(2.0))
        .unwrap();

    let snapshot = ring.snapshot();
    assert_eq!(snapshot.positions("light").unwrap().len(), 200);
    assert_eq!(snapshot.positions("heavy").unwrap().len(), 400);

    let report = distribution(&snapshot, &sample_keys(20_000)).unwrap();
    let ratio = report.share("heavy") / report.share("light");
    assert!(
        (1.7..=2.3).contains(&ratio),
        "heavy/light key ratio out of tolerance: {ratio:.3}"
    );

    let expected = snapshot.ownership_share("heavy").unwrap()
        / snapshot.ownership_share("light").unwrap();
    assert!(
        (1.7..=2.3).contains(&expected),
        "heavy/light ring share out of tolerance: {expected:.3}"
    );
}

#[test]
fn distribution_report() {
    let ring = RingBuilder::new()
        .with_algorithm(HashAlgorithm::Rapidhash)
        .with_nodes((0..5).map(|i| Node::new(format!("node{i}")).with_replicas(100)))
        .build()
        .unwrap();
    let keys = sample_keys(10_000);
    let snapshot = ring.snapshot();

    let report = distribution(&snapshot, &keys).unwrap();
    assert_eq!(report.total, 10_000);
    assert_eq!(report.per_node_counts.len(), 5);
    assert_eq!(report.per_node_counts.values().sum::<usize>(), 10_000);
    assert_eq!(report.mean, 2_000.0);
    assert!(report.min <= 2_000 && report.max >= 2_000);
    assert_eq!(report.balance_ratio, report.max as f64 / 2_000.0);
    assert!(report.balance_ratio >= 1.0);

    assert_eq!(report, par_distribution(&snapshot, &keys).unwrap());

    // Snapshot keeps answering after the ring is gone.
    drop(ring);
    assert_eq!(distribution(&snapshot, &keys).unwrap(), report);
}

#[test]
fn empty_ring_distribution_fails() {
    let ring = Ring::new("fnv1a", 32).unwrap();
    assert_eq!(
        distribution(&ring.snapshot(), &sample_keys(10)),
        Err(RingError::EmptyRing)
    );
}

#[test]
fn benchmark_sweep() {
    let keys = sample_keys(10_000);
    let config = SweepConfig {
        min_nodes: 2,
        max_nodes: 10,
        replicas: 3,
        ..Default::default()
    };

    let steps = sweep(&config, &keys).unwrap();
    assert_eq!(steps.len(), 9);
    for step in &steps[1..] {
        // Going from n-1 to n nodes moves well under half of the keys.
        let moved = step.moved_fraction.unwrap();
        assert!(moved > 0.0 && moved < 0.5, "{} nodes moved {moved}", step.nodes);
    }
}

#[test]
fn interactive_session() {
    let ring = Ring::new("sha256", 64).unwrap();
    for i in 0..4 {
        ring.add_node(Node::new(format!("node{i}"))).unwrap();
    }
    let mut session = Session::new(ring, sample_keys(10_000));

    let added = session.add_node(Node::new("node4")).unwrap();
    let removed = session.remove_node("node1").unwrap();
    assert_eq!(added.moved_to("node4"), added.moved_count);
    assert_eq!(removed.moved_from("node1"), removed.moved_count);

    let status = session.status().unwrap();
    assert_eq!(status.distribution.per_node_counts.len(), 4);
    assert!(status.distribution.count("node1").is_none());
    assert!(status.since_baseline.moved_count <= added.moved_count + removed.moved_count);
}
