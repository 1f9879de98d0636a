// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree configuration and its validation errors.

use thiserror::Error;

/// Construction parameters for an [`RTree`][crate::RTree].
///
/// The fill constraints are validated when the tree is built and are fixed
/// for the tree's lifetime; [`clear`][crate::RTree::clear] preserves them.
///
/// ```
/// use canopy_rtree::Config;
///
/// let cfg = Config::new(5, 16).unsorted_bulk_load();
/// assert!(cfg.validate().is_ok());
/// assert!(Config::new(5, 9).validate().is_err());
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Minimum entries per node (except the root, which may be underfull).
    pub min_children: usize,
    /// Maximum entries per node; the branching factor.
    pub max_children: usize,
    /// Width:height ratio of the packing grid used by sorted bulk loads.
    ///
    /// `1` packs a square grid of leaves; larger values favor wide, short
    /// slices. Must be at least 1.
    pub grid_aspect: usize,
    /// Whether [`commit`][crate::RTree::commit] sorts staged entries for
    /// spatial locality before packing. Disabling trades looser bounding
    /// boxes (slower queries) for a cheaper rebuild.
    pub sort_bulk_load: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_children: 4,
            max_children: 8,
            grid_aspect: 1,
            sort_bulk_load: true,
        }
    }
}

impl Config {
    /// Create a config with the given fill bounds and default tuning.
    pub fn new(min_children: usize, max_children: usize) -> Self {
        Self {
            min_children,
            max_children,
            ..Self::default()
        }
    }

    /// Pack staged entries in arrival order, skipping the sort pass.
    pub fn unsorted_bulk_load(mut self) -> Self {
        self.sort_bulk_load = false;
        self
    }

    /// Set the packing grid's width:height ratio.
    pub fn grid_aspect(mut self, aspect: usize) -> Self {
        self.grid_aspect = aspect;
        self
    }

    /// Check the fill constraints without building a tree.
    ///
    /// Invalid parameters are a configuration error surfaced to the caller;
    /// they are never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_children == 0 {
            return Err(ConfigError::MinChildrenTooSmall);
        }
        if self.max_children < 2 * self.min_children {
            return Err(ConfigError::FillRatio {
                min_children: self.min_children,
                max_children: self.max_children,
            });
        }
        if self.grid_aspect == 0 {
            return Err(ConfigError::GridAspectZero);
        }
        Ok(())
    }
}

/// Rejected [`Config`] parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `min_children` must be at least 1.
    #[error("min_children must be at least 1")]
    MinChildrenTooSmall,
    /// `max_children` must be at least twice `min_children`, so a full node
    /// can always split into two nodes meeting the minimum fill.
    #[error("max_children ({max_children}) must be at least 2 * min_children ({min_children})")]
    FillRatio {
        /// The rejected minimum fill.
        min_children: usize,
        /// The rejected branching factor.
        max_children: usize,
    },
    /// `grid_aspect` must be at least 1.
    #[error("grid_aspect must be at least 1")]
    GridAspectZero,
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError};

    #[test]
    fn default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn fill_constraint_is_not_clamped() {
        assert_eq!(
            Config::new(0, 8).validate(),
            Err(ConfigError::MinChildrenTooSmall)
        );
        assert_eq!(
            Config::new(5, 9).validate(),
            Err(ConfigError::FillRatio {
                min_children: 5,
                max_children: 9
            })
        );
        // The boundary case is allowed.
        assert!(Config::new(5, 10).validate().is_ok());
        assert_eq!(
            Config::new(2, 4).grid_aspect(0).validate(),
            Err(ConfigError::GridAspectZero)
        );
    }
}
