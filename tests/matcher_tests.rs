// Edit distance checked against strsim's Levenshtein implementation

use pipfind::matcher::{edit_distance, nearest_match, search};

const NAMES: &[&str] = &[
    "",
    "a",
    "ab",
    "requests",
    "requests-oauthlib",
    "requests_toolbelt",
    "flask",
    "Flask-SQLAlchemy",
    "django",
    "djangorestframework",
    "numpy",
    "scipy",
    "zope.interface",
    "ruamel.yaml",
    "naïve",
    "日本語",
];

#[test]
fn test_matches_strsim_levenshtein() {
    for a in NAMES {
        for b in NAMES {
            assert_eq!(
                edit_distance(a, b),
                strsim::levenshtein(a, b),
                "distance({:?}, {:?})",
                a,
                b
            );
        }
    }
}

#[test]
fn test_triangle_inequality() {
    for a in NAMES {
        for b in NAMES {
            for c in NAMES {
                assert!(edit_distance(a, c) <= edit_distance(a, b) + edit_distance(b, c));
            }
        }
    }
}

#[test]
fn test_search_then_nearest() {
    let index: Vec<String> = ["requests", "requests-oauthlib", "flask"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let hits = search(&index, "requests");
    assert_eq!(hits, vec!["requests", "requests-oauthlib"]);
    assert_eq!(nearest_match(&hits, "requests"), Some("requests"));
    assert_eq!(edit_distance("requests", "requests"), 0);
}

#[test]
fn test_nearest_is_global_minimum() {
    let candidates = ["numpy-ext", "nump", "numpyy", "numpy"];
    let best = nearest_match(&candidates, "numpy").unwrap();
    assert_eq!(best, "numpy");

    let candidates = ["numpy-ext", "nump", "numpyy"];
    let best = nearest_match(&candidates, "numpy").unwrap();
    // "nump" and "numpyy" are both one edit away; the earlier one wins
    assert_eq!(best, "nump");
}
