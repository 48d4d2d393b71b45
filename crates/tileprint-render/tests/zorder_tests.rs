//! Integration tests for layer draw order.

use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use std::cmp::Ordering;
use tileprint_render::stacking::SurfaceTree;
use tileprint_render::zorder::{compare_layers, compare_paths, resolve};
use tileprint_render::{PageRequest, PrintLayer, RenderError, TileFetch};

struct Anchored {
    name: &'static str,
    path: Option<Vec<i32>>,
}

impl Anchored {
    fn new(name: &'static str, path: Option<Vec<i32>>) -> Self {
        Self { name, path }
    }
}

impl PrintLayer for Anchored {
    fn name(&self) -> &str {
        self.name
    }

    fn stacking_path(&self) -> Option<Vec<i32>> {
        self.path.clone()
    }

    fn is_overlay(&self) -> bool {
        false
    }

    fn scale_dependent(&self) -> bool {
        false
    }

    fn tiles_for(&self, _request: &PageRequest<'_>) -> Vec<TileFetch> {
        Vec::new()
    }
}

fn names(layers: &[&dyn PrintLayer]) -> Vec<String> {
    layers.iter().map(|l| l.name().to_string()).collect()
}

#[quickcheck]
fn prop_first_divergence_decides(
    prefix: Vec<i32>,
    a: i32,
    b: i32,
    tail_a: Vec<i32>,
    tail_b: Vec<i32>,
) -> TestResult {
    if a == b {
        return TestResult::discard();
    }
    let prefix = &prefix[..prefix.len().min(9)];
    let join = |x: i32, tail: &[i32]| {
        let mut path = prefix.to_vec();
        path.push(x);
        path.extend_from_slice(tail);
        path
    };
    let (path_a, path_b) = (join(a, &tail_a), join(b, &tail_b));
    TestResult::from_bool(compare_paths(&path_a, &path_b) == a.cmp(&b))
}

#[quickcheck]
fn prop_proper_prefix_paints_first(path: Vec<i32>, extra: i32) -> bool {
    let mut longer = path.clone();
    longer.push(extra);
    compare_paths(&path, &longer) == Ordering::Less
        && compare_paths(&longer, &path) == Ordering::Greater
}

#[quickcheck]
fn prop_compare_is_antisymmetric(a: Vec<i32>, b: Vec<i32>) -> bool {
    compare_paths(&a, &b) == compare_paths(&b, &a).reverse()
}

#[test]
fn test_resolve_sorts_bottom_to_top() {
    let labels = Anchored::new("labels", Some(vec![650, 0]));
    let osm = Anchored::new("osm", Some(vec![200, 1]));
    let shade = Anchored::new("shade", Some(vec![400, 0]));
    let sat = Anchored::new("sat", Some(vec![200, 0]));
    let input: Vec<&dyn PrintLayer> = vec![&labels, &osm, &shade, &sat];

    let ordered = resolve(&input).unwrap();
    assert_eq!(names(&ordered), ["sat", "osm", "shade", "labels"]);
}

#[test]
fn test_resolve_is_stable_for_equal_paths() {
    let first = Anchored::new("first", Some(vec![200, 0]));
    let second = Anchored::new("second", Some(vec![200, 0]));
    let input: Vec<&dyn PrintLayer> = vec![&first, &second];
    assert_eq!(names(&resolve(&input).unwrap()), ["first", "second"]);
}

#[test]
fn test_unanchored_layer_is_rejected() {
    let ok = Anchored::new("ok", Some(vec![200]));
    let loose = Anchored::new("loose", None);
    let input: Vec<&dyn PrintLayer> = vec![&ok, &loose];

    match resolve(&input) {
        Err(RenderError::LayerNotRenderable { layer }) => assert_eq!(layer, "loose"),
        other => panic!("expected LayerNotRenderable, got {:?}", other.map(|l| names(&l))),
    }
    assert!(compare_layers(&ok, &loose).is_err());
}

#[test]
fn test_paths_from_surface_tree() {
    let mut tree = SurfaceTree::new();
    let root = tree.root();
    let tiles = tree.insert(root, "tilePane", Some(200));
    let overlays = tree.insert(root, "overlayPane", Some(400));
    let base = tree.insert(tiles, "osm", Some(1));
    let shade = tree.insert(overlays, "shade", None);
    let sat = tree.insert(tiles, "sat", Some(0));

    let base = Anchored::new("osm", tree.stacking_path(base));
    let shade = Anchored::new("shade", tree.stacking_path(shade));
    let sat = Anchored::new("sat", tree.stacking_path(sat));
    let input: Vec<&dyn PrintLayer> = vec![&shade, &base, &sat];

    assert_eq!(
        compare_layers(&sat, &base).unwrap(),
        Ordering::Less,
        "sibling z-index decides within a pane"
    );
    assert_eq!(names(&resolve(&input).unwrap()), ["sat", "osm", "shade"]);
}
