use std::fmt;
use std::sync::Arc;

use crate::config::ConflictStrategy;
use crate::model::SyncItem;
use crate::{Error, Result};

/// Caller-supplied policy for [`ConflictStrategy::Custom`]
pub type CustomResolverFn = Arc<dyn Fn(&SyncItem, &SyncItem, &[String]) -> SyncItem + Send + Sync>;

/// Which side a resolution picked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Source,
    Target,
    /// The custom resolver returned an item of its own making
    Custom,
}

/// Outcome of resolving a conflict
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub winner: Winner,
    pub item: SyncItem,
    pub reason: String,
}

/// Picks a winner between conflicting snapshots according to a strategy
#[derive(Clone)]
pub struct ConflictResolver {
    strategy: ConflictStrategy,
    custom: Option<CustomResolverFn>,
}

impl fmt::Debug for ConflictResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConflictResolver")
            .field("strategy", &self.strategy)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl ConflictResolver {
    pub fn new(strategy: ConflictStrategy) -> Self {
        Self {
            strategy,
            custom: None,
        }
    }

    pub fn strategy(&self) -> ConflictStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: ConflictStrategy) {
        self.strategy = strategy;
    }

    /// Register the callback used by [`ConflictStrategy::Custom`].
    pub fn set_custom_resolver<F>(&mut self, f: F)
    where
        F: Fn(&SyncItem, &SyncItem, &[String]) -> SyncItem + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(f));
    }

    pub fn has_custom_resolver(&self) -> bool {
        self.custom.is_some()
    }

    /// Pick the winning item.
    ///
    /// # Errors
    ///
    /// - [`Error::ManualResolutionRequired`] for the manual strategy
    /// - [`Error::CustomResolverMissing`] for the custom strategy without a
    ///   registered callback
    pub fn resolve(
        &self,
        source: &SyncItem,
        target: &SyncItem,
        conflicts: &[String],
    ) -> Result<Resolution> {
        let resolution = match self.strategy {
            ConflictStrategy::LastWriteWins => {
                if target.last_modified > source.last_modified {
                    Resolution {
                        winner: Winner::Target,
                        item: target.clone(),
                        reason: format!("Target has newer timestamp ({})", target.last_modified),
                    }
                } else {
                    Resolution {
                        winner: Winner::Source,
                        item: source.clone(),
                        reason: format!("Source has newer timestamp ({})", source.last_modified),
                    }
                }
            }
            ConflictStrategy::SourceWins => Resolution {
                winner: Winner::Source,
                item: source.clone(),
                reason: ConflictStrategy::SourceWins.to_string(),
            },
            ConflictStrategy::TargetWins => Resolution {
                winner: Winner::Target,
                item: target.clone(),
                reason: ConflictStrategy::TargetWins.to_string(),
            },
            ConflictStrategy::Manual => {
                return Err(Error::ManualResolutionRequired {
                    item_id: source.id.clone(),
                    conflicts: conflicts.to_vec(),
                });
            }
            ConflictStrategy::Custom => {
                let f = self.custom.as_ref().ok_or(Error::CustomResolverMissing)?;
                let item = f(source, target, conflicts);
                let winner = if item == *source {
                    Winner::Source
                } else if item == *target {
                    Winner::Target
                } else {
                    Winner::Custom
                };
                Resolution {
                    winner,
                    item,
                    reason: "Custom resolver".to_string(),
                }
            }
        };

        tracing::debug!(
            item = %source.id,
            strategy = %self.strategy,
            winner = ?resolution.winner,
            "Resolved conflict"
        );
        Ok(resolution)
    }
}
