//! Simulated ad campaign: channel → audience → creative.
//!
//! Run with `RUST_LOG=banditree=debug` to see per-arm updates.

use banditree::{build_override, BanditNode, BetaFactory, FieldUpdates, FieldValue, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

const CAMPAIGN: &[[&str; 3]] = &[
    ["search", "returning", "discount"],
    ["search", "returning", "loyalty"],
    ["search", "new", "discount"],
    ["search", "new", "brand"],
    ["social", "new", "video"],
    ["social", "new", "carousel"],
    ["social", "lookalike", "video"],
    ["email", "returning", "loyalty"],
];

/// Hidden conversion rate per full path.
fn conversion_rate(path: &[String]) -> f64 {
    match (path[0].as_str(), path[1].as_str(), path[2].as_str()) {
        ("search", "returning", "loyalty") => 0.32,
        ("search", "returning", _) => 0.18,
        ("search", "new", "discount") => 0.12,
        ("social", "lookalike", _) => 0.15,
        ("email", _, _) => 0.22,
        _ => 0.05,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut tree = BanditNode::from_combinations(CAMPAIGN, BetaFactory::with_seed(2024))?;
    info!(depth = tree.depth(), paths = tree.paths().len(), "campaign tree built");

    // Last quarter's numbers for the email creative.
    let history = FieldUpdates::from([
        ("trials".to_string(), FieldValue::Count(40)),
        ("rewards".to_string(), FieldValue::Count(9)),
    ]);
    tree.override_prior(&build_override(&["email", "returning", "loyalty"], history)?)?;

    let mut market = StdRng::seed_from_u64(7);
    let mut conversions = 0u64;
    for day in 1..=10u32 {
        let mut today = 0u64;
        for _ in 0..500 {
            let path = tree.evaluate()?;
            let converted = market.random_bool(conversion_rate(&path));
            tree.update(&path, &converted)?;
            today += u64::from(converted);
        }
        conversions += today;
        tree.record_metric(today as f64 / 500.0);
        info!(day, conversions = today, "day closed");
    }

    info!(total = conversions, "simulation done");
    for (key, trials) in tree.arms().top_arms(3) {
        info!(channel = key.as_str(), trials, "top channel");
    }
    let leaf = tree.arm_set(&["search", "returning"])?;
    for snap in leaf.snapshot() {
        info!(
            creative = snap.key.as_str(),
            trials = snap.trials,
            conversions = snap.reward_total,
            "search/returning"
        );
    }
    info!(daily = ?tree.performance(), "conversion rate by day");
    Ok(())
}
