//! Tree queries: look scanners up by name or by a path of names, with `"*"`
//! matching a whole level. Used for introspection and heavily by the tests.

use std::sync::Arc;

use crate::models::Scanner;

/// A lookup failed somewhere in the tree.
#[derive(Debug, thiserror::Error)]
pub enum NotFoundError {
    #[error("scanner {name:?} not found among {count} children")]
    Name { name: String, count: usize },
    #[error("scanner {segment:?} not found at index {index} of path {path:?}")]
    Path {
        path: Vec<String>,
        index: usize,
        segment: String,
        #[source]
        source: Box<NotFoundError>,
    },
}

/// All scanners in `scanners` named `name`, or all of them when `name` is
/// `"*"`. An empty non-wildcard match is an error.
pub fn find_scanners(
    scanners: &[Arc<dyn Scanner>],
    name: &str,
) -> Result<Vec<Arc<dyn Scanner>>, NotFoundError> {
    if name == "*" {
        return Ok(scanners.to_vec());
    }

    let found: Vec<_> = scanners
        .iter()
        .filter(|scanner| scanner.name() == name)
        .cloned()
        .collect();

    if found.is_empty() {
        return Err(NotFoundError::Name {
            name: name.to_string(),
            count: scanners.len(),
        });
    }
    Ok(found)
}

/// Walk `path` from `scanners`: each segment narrows the working set to the
/// matching nodes, then descends into the concatenation of their children.
/// The first segment is matched against `scanners` themselves. Fails with
/// the index of the first segment that matches nothing.
pub fn find_path(
    scanners: &[Arc<dyn Scanner>],
    path: &[&str],
) -> Result<Vec<Arc<dyn Scanner>>, NotFoundError> {
    let mut children: Vec<Arc<dyn Scanner>> = scanners.to_vec();
    let mut targets = Vec::new();

    for (index, segment) in path.iter().enumerate() {
        targets = find_scanners(&children, segment).map_err(|source| NotFoundError::Path {
            path: path.iter().map(ToString::to_string).collect(),
            index,
            segment: (*segment).to_string(),
            source: Box::new(source),
        })?;

        children = targets.iter().flat_map(|target| target.children()).collect();
    }

    Ok(targets)
}
