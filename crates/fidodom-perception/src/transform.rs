//! Transform resolution between named reference frames.
//!
//! [`TransformResolver`] is the lookup capability the fusion pipeline
//! consumes.  [`TfEngine`] implements it over a graph of frames: every
//! registered parent→child transform is also walkable child→parent through
//! its inverse, and a BFS composes the chain between any two connected
//! frames.
//!
//! # Example
//!
//! ```rust
//! use fidodom_perception::transform::{TfEngine, TransformResolver};
//! use fidodom_types::{Quaternion, Transform3D, Vec3};
//!
//! let mut tf = TfEngine::new();
//!
//! // The bin sits 2 m along +X of the odom origin.
//! tf.set_transform("odom", "bin_footprint",
//!     Transform3D::new(Vec3::new(2.0, 0.0, 0.0), Quaternion::identity()));
//!
//! let t = tf.resolve("odom", "bin_footprint", 0.0).unwrap();
//! assert!((t.translation.x - 2.0).abs() < 1e-12);
//!
//! // The reverse lookup is the exact inverse.
//! let back = tf.resolve("bin_footprint", "odom", 0.0).unwrap();
//! assert!((back.translation.x + 2.0).abs() < 1e-12);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use fidodom_types::{FusionError, Transform3D};
use tracing::trace;

// ────────────────────────────────────────────────────────────────────────────
// TransformResolver
// ────────────────────────────────────────────────────────────────────────────

/// Frame lookup capability.
///
/// `resolve(source_frame, target_frame, time)` returns the pose of
/// `target_frame` expressed in `source_frame`: the transform that maps points
/// given in `target_frame` coordinates into `source_frame`.
///
/// Implementations own any buffering or interpolation over `time`; callers
/// treat the lookup as opaque.
pub trait TransformResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns [`FusionError::TransformUnavailable`] when no transform chain
    /// connects the two frames at `time`.
    fn resolve(
        &self,
        source_frame: &str,
        target_frame: &str,
        time: f64,
    ) -> Result<Transform3D, FusionError>;
}

// ────────────────────────────────────────────────────────────────────────────
// TfEngine
// ────────────────────────────────────────────────────────────────────────────

/// A graph of named reference frames and the [`Transform3D`]s that relate
/// them.
///
/// Frames are identified by arbitrary string names (e.g. `"odom"`,
/// `"footprint"`, `"camera_link"`).  Only the most recent transform per edge
/// is kept, so the `time` argument of [`TransformResolver::resolve`] is
/// accepted and ignored.
#[derive(Debug, Default)]
pub struct TfEngine {
    /// `edges[from][to] = pose of `to` in `from``, stored in both directions.
    edges: HashMap<String, HashMap<String, Transform3D>>,
}

impl TfEngine {
    /// Create an empty TF engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update the pose of `child_frame` in `parent_frame`.
    ///
    /// The inverse edge is registered at the same time.
    pub fn set_transform(&mut self, parent_frame: &str, child_frame: &str, transform: Transform3D) {
        self.edges
            .entry(parent_frame.to_string())
            .or_default()
            .insert(child_frame.to_string(), transform);
        self.edges
            .entry(child_frame.to_string())
            .or_default()
            .insert(parent_frame.to_string(), transform.inverse());
    }

    /// `true` if `frame` appears in any registered transform.
    pub fn has_frame(&self, frame: &str) -> bool {
        self.edges.contains_key(frame)
    }

    /// Compose the pose of `target_frame` in `source_frame`.
    ///
    /// Returns `None` if no path exists between the two frames.
    pub fn lookup(&self, source_frame: &str, target_frame: &str) -> Option<Transform3D> {
        if source_frame == target_frame {
            return Some(Transform3D::identity());
        }

        // BFS; each queue item carries T_source_current.
        let mut queue: VecDeque<(&str, Transform3D)> = VecDeque::new();
        let mut visited: HashSet<&str> = HashSet::new();

        queue.push_back((source_frame, Transform3D::identity()));
        visited.insert(source_frame);

        while let Some((current, accumulated)) = queue.pop_front() {
            let Some(neighbours) = self.edges.get(current) else {
                continue;
            };
            for (next, edge_tf) in neighbours {
                if visited.contains(next.as_str()) {
                    continue;
                }
                let composed = accumulated.compose(edge_tf);
                if next == target_frame {
                    return Some(composed);
                }
                visited.insert(next.as_str());
                queue.push_back((next.as_str(), composed));
            }
        }

        None
    }
}

impl TransformResolver for TfEngine {
    fn resolve(
        &self,
        source_frame: &str,
        target_frame: &str,
        _time: f64,
    ) -> Result<Transform3D, FusionError> {
        trace!(source_frame, target_frame, "resolving transform");
        self.lookup(source_frame, target_frame)
            .ok_or_else(|| FusionError::TransformUnavailable {
                source_frame: source_frame.to_string(),
                target_frame: target_frame.to_string(),
                details: if self.has_frame(source_frame) && self.has_frame(target_frame) {
                    "frames are not connected".to_string()
                } else {
                    "frame has never been published".to_string()
                },
            })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
