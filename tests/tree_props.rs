//! Property and contract tests for the hierarchical bandit.

use banditree::{
    build_override, build_skeleton, ArmPolicy, ArmSet, BanditError, BanditNode, BetaFactory, FieldUpdates,
    FieldValue, Skeleton,
};
use proptest::prelude::*;

fn s(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|x| x.to_string()).collect()
}

fn abc_tree(seed: u64) -> BanditNode {
    BanditNode::from_combinations(
        [["a", "b", "x"], ["a", "b", "y"], ["a", "c", "z"]],
        BetaFactory::with_seed(seed),
    )
    .unwrap()
}

fn counts(tree: &BanditNode, prefix: &[&str]) -> (Vec<u64>, Vec<u64>) {
    let arms = tree.arm_set(prefix).unwrap();
    (
        arms.policy().trials_slice().to_vec(),
        arms.policy().rewards_slice().to_vec(),
    )
}

// ---------------------------------------------------------------------------
// Contract tests
// ---------------------------------------------------------------------------

#[test]
fn skeleton_round_trip() {
    let skel = build_skeleton([["a", "b", "x"], ["a", "b", "y"], ["a", "c", "z"]]).unwrap();
    let want = Skeleton::branch([(
        "a",
        Skeleton::branch([("b", Skeleton::leaf(["x", "y"])), ("c", Skeleton::leaf(["z"]))]),
    )]);
    assert_eq!(skel, want);
}

#[test]
fn evaluated_paths_follow_the_skeleton() {
    let mut tree = abc_tree(11);
    for _ in 0..300 {
        let p = tree.evaluate().unwrap();
        assert_eq!(p.len(), 3);
        assert_eq!(p[0], "a");
        match p[1].as_str() {
            "b" => assert!(p[2] == "x" || p[2] == "y", "path={p:?}"),
            "c" => assert_eq!(p[2], "z"),
            other => panic!("unexpected tier-2 key {other}"),
        }
    }
}

#[test]
fn override_biases_selection_toward_the_seeded_arm() {
    let mut tree = abc_tree(5);
    let fields = FieldUpdates::from([
        ("trials".to_string(), FieldValue::Count(10)),
        ("rewards".to_string(), FieldValue::Count(8)),
    ]);
    tree.override_prior(&build_override(&["a", "b", "x"], fields).unwrap())
        .unwrap();

    let (mut x, mut y) = (0usize, 0usize);
    for _ in 0..2000 {
        let p = tree.evaluate().unwrap();
        match p[2].as_str() {
            "x" => x += 1,
            "y" => y += 1,
            _ => {}
        }
    }
    assert!(x + y > 0);
    let x_share = x as f64 / (x + y) as f64;
    assert!(x_share > 0.6, "x={x} y={y}");
}

#[test]
fn unknown_leaf_key_leaves_the_subtree_unchanged() {
    let mut tree = abc_tree(2);
    tree.update(&["a", "b", "y"], &true).unwrap();
    let before: Vec<_> = [&[][..], &["a"][..], &["a", "b"][..], &["a", "c"][..]]
        .iter()
        .map(|p| counts(&tree, p))
        .collect();

    let err = tree.update(&["a", "b", "q"], &true).unwrap_err();
    assert_eq!(
        err,
        BanditError::UnknownArm {
            arm: "q".to_string()
        }
    );
    let err = tree.update(&["a", "nope", "x"], &false).unwrap_err();
    assert!(matches!(err, BanditError::PathMismatch { depth: 1, .. }));

    let after: Vec<_> = [&[][..], &["a"][..], &["a", "b"][..], &["a", "c"][..]]
        .iter()
        .map(|p| counts(&tree, p))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn top_arms_example() {
    let mut arms = ArmSet::new(s(&["k0", "k1", "k2", "k3"]), &mut BetaFactory::default()).unwrap();
    let overrides = [("k0", 7, 5), ("k1", 1, 1), ("k2", 12, 9), ("k3", 4, 3)]
        .into_iter()
        .map(|(k, t, r)| {
            (
                k.to_string(),
                FieldUpdates::from([
                    ("trials".to_string(), FieldValue::Count(t)),
                    ("rewards".to_string(), FieldValue::Count(r)),
                ]),
            )
        })
        .collect();
    arms.override_priors(&overrides).unwrap();
    assert_eq!(
        arms.top_arms(2),
        vec![("k2".to_string(), 12), ("k0".to_string(), 7)]
    );
}

#[test]
fn prior_override_replaces_the_prior_pair() {
    let mut tree = abc_tree(0);
    let fields = FieldUpdates::from([("prior".to_string(), FieldValue::Prior(50.0, 1.0))]);
    tree.override_prior(&build_override(&["a", "c"], fields).unwrap())
        .unwrap();
    let a = tree.arm_set(&["a"]).unwrap();
    assert_eq!(a.policy().priors(), &[(1.0, 1.0), (50.0, 1.0)]);

    let c_share = (0..500)
        .filter(|_| tree.evaluate().unwrap()[1] == "c")
        .count();
    assert!(c_share > 450, "c_share={c_share}");
}

// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

fn combos_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    // Three fixed tiers with small alphabets, so prefixes collide often.
    proptest::collection::vec(("[a-c]", "[m-o]", "[x-z]"), 1..20).prop_map(|rows| {
        rows.into_iter()
            .map(|(t1, t2, t3)| vec![t1, t2, t3])
            .collect()
    })
}

proptest! {
    /// Every sampled path is one of the input combinations.
    #[test]
    fn sampled_paths_are_input_combinations(
        combos in combos_strategy(),
        seed in any::<u64>(),
        draws in 1usize..40,
    ) {
        let mut tree = BanditNode::from_combinations(&combos, BetaFactory::with_seed(seed)).unwrap();
        for _ in 0..draws {
            let p = tree.evaluate().unwrap();
            prop_assert!(combos.contains(&p), "path {:?} not an input", p);
        }
    }

    /// `paths()` enumerates exactly the distinct combinations.
    #[test]
    fn paths_enumerate_distinct_combinations(combos in combos_strategy()) {
        let tree = BanditNode::from_combinations(&combos, BetaFactory::default()).unwrap();
        let mut got = tree.paths();
        let mut want = combos.clone();
        got.sort();
        want.sort();
        want.dedup();
        prop_assert_eq!(got, want);
    }

    /// Each update adds exactly one trial to each arm on the path and nowhere else.
    #[test]
    fn update_counts_are_exact(
        combos in combos_strategy(),
        seed in any::<u64>(),
        ok in any::<bool>(),
    ) {
        let mut tree = BanditNode::from_combinations(&combos, BetaFactory::with_seed(seed)).unwrap();
        let path = tree.evaluate().unwrap();
        tree.update(&path, &ok).unwrap();

        let root = tree.arm_set::<&str>(&[]).unwrap();
        let i0 = root.index_of(&path[0]).unwrap();
        for (i, (&t, &r)) in root
            .policy()
            .trials_slice()
            .iter()
            .zip(root.policy().rewards_slice())
            .enumerate()
        {
            if i == i0 {
                prop_assert_eq!((t, r), (1, u64::from(ok)));
            } else {
                prop_assert_eq!((t, r), (0, 0));
            }
        }
        let leaf = tree.arm_set(&path[..2]).unwrap();
        let total: u64 = leaf.policy().trials_slice().iter().sum();
        prop_assert_eq!(total, 1);
        prop_assert_eq!(leaf.policy().trials(leaf.index_of(&path[2]).unwrap()), 1);
    }

    /// A corrupted path is rejected and changes nothing anywhere.
    #[test]
    fn corrupted_paths_are_atomic(
        combos in combos_strategy(),
        seed in any::<u64>(),
        tier in 0usize..3,
    ) {
        let mut tree = BanditNode::from_combinations(&combos, BetaFactory::with_seed(seed)).unwrap();
        let mut path = tree.evaluate().unwrap();
        path[tier] = "#missing".to_string();
        let before = tree.paths().len();
        prop_assert!(tree.update(&path, &true).is_err());
        prop_assert_eq!(tree.paths().len(), before);
        let root = tree.arm_set::<&str>(&[]).unwrap();
        prop_assert!(root.policy().trials_slice().iter().all(|&t| t == 0));
    }
}
