//! Draw order for printable layers.
//!
//! There is no canonical list of layers in stacking order: the UI reorders
//! them freely. The order is instead read back from where each layer sits in
//! the live surface hierarchy, as a path of stacking indices from the map
//! container down to the layer's anchor (see [`PrintLayer::stacking_path`]).
//!
//! Two paths compare lexicographically. The first differing level decides;
//! if one path is a prefix of the other, the shorter one (closer to the root)
//! paints first.

use crate::error::{RenderError, Result};
use crate::layer::PrintLayer;
use std::cmp::Ordering;

/// Compare two stacking paths. `Less` paints underneath.
#[must_use]
pub fn compare_paths(a: &[i32], b: &[i32]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match x.cmp(y) {
            Ordering::Equal => {}
            decided => return decided,
        }
    }
    a.len().cmp(&b.len())
}

fn path_of(layer: &dyn PrintLayer) -> Result<Vec<i32>> {
    layer
        .stacking_path()
        .ok_or_else(|| RenderError::LayerNotRenderable {
            layer: layer.name().to_string(),
        })
}

/// Three-way comparison of two layers by stacking order.
///
/// # Errors
///
/// Returns [`RenderError::LayerNotRenderable`] if either layer has no anchor.
pub fn compare_layers(a: &dyn PrintLayer, b: &dyn PrintLayer) -> Result<Ordering> {
    Ok(compare_paths(&path_of(a)?, &path_of(b)?))
}

/// Sort `layers` bottom-to-top.
///
/// Each layer's path is read once. Layers with equal paths keep their input
/// order.
///
/// # Errors
///
/// Returns [`RenderError::LayerNotRenderable`] for the first layer (in input
/// order) without an anchor.
pub fn resolve<'a>(layers: &[&'a dyn PrintLayer]) -> Result<Vec<&'a dyn PrintLayer>> {
    let mut keyed = layers
        .iter()
        .map(|&layer| path_of(layer).map(|path| (path, layer)))
        .collect::<Result<Vec<_>>>()?;
    keyed.sort_by(|(a, _), (b, _)| compare_paths(a, b));
    Ok(keyed.into_iter().map(|(_, layer)| layer).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_difference_decides() {
        assert_eq!(compare_paths(&[200, 1, 9], &[200, 2, 0]), Ordering::Less);
        assert_eq!(compare_paths(&[400], &[200, 5]), Ordering::Greater);
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(compare_paths(&[200], &[200, 0]), Ordering::Less);
        assert_eq!(compare_paths(&[200, 0], &[200]), Ordering::Greater);
        assert_eq!(compare_paths(&[], &[]), Ordering::Equal);
    }

    #[test]
    fn test_negative_indices() {
        assert_eq!(compare_paths(&[-1], &[0]), Ordering::Less);
    }
}
