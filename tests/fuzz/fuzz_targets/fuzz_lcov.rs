#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsing must not panic, and whatever parses must build a tree whose
    // rollups stay consistent after nesting packages.
    let Ok(coverage) = covtree::adapters::lcov::parse(data) else {
        return;
    };
    let Ok(facts) = covtree::facts::facts_from_coverage(&coverage) else {
        return;
    };
    let mut result = covtree::builder::build_tree("fuzz", facts).result;
    let before = result.statistics();
    result.split_packages();
    assert_eq!(before, result.statistics());
    for ratio in before.values() {
        assert!(ratio.covered() <= ratio.total());
    }
});
