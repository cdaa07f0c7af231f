// tests/ordering_property.rs

use std::collections::BTreeSet;
use std::fs;

use proptest::prelude::*;

use assetpipe::config::Config;
use assetpipe::tasks::sources::collect_sources;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Without `order`, sources come back sorted no matter how the files
    /// were created or how many overlapping globs match them.
    #[test]
    fn unordered_sources_are_lexicographic(
        names in proptest::collection::btree_set("[a-z]{1,6}(/[a-z]{1,6})?", 1..12),
        creation_seed in any::<u64>(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let mut creation: Vec<&String> = names.iter().collect();
        let len = creation.len();
        if len > 1 {
            creation.rotate_left((creation_seed % len as u64) as usize);
        }
        for name in creation {
            let path = dir.path().join("src/scripts").join(format!("{name}.js"));
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, name.as_bytes()).unwrap();
        }

        let mut group = Config::default().scripts;
        group.src = vec!["src/scripts/**/*.js".into(), "src/**/*.js".into()];
        let found = collect_sources(dir.path(), &group, Some("dist")).unwrap();

        let rels: Vec<String> = found.iter().map(|s| s.rel.clone()).collect();
        let expected: Vec<String> = names
            .iter()
            .map(|n| format!("src/scripts/{n}.js"))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        prop_assert_eq!(rels, expected);
    }
}
