//! Where nodes may go.
//!
//! This module holds the type-compatibility table for relocations and the
//! rules that turn a drop target into the node whose directory actually
//! receives the mover. It is pure: it reads an [`Outline`] and never touches
//! the filesystem.

use super::{
    node::{NodeId, NodeKind, ResourceType},
    outline::Outline,
};

/// The destination types a mover of the given type may be dropped onto.
#[must_use]
pub const fn allowed_targets(mover: ResourceType) -> &'static [ResourceType] {
    use ResourceType::{Chapter, Container, Fragment, Root, Snip};
    match mover {
        Snip => &[Chapter, Fragment, Root, Container, Snip],
        Container => &[Chapter, Root, Snip, Container, Fragment],
        Fragment => &[Chapter, Snip, Fragment],
        Chapter | Root => &[],
    }
}

/// Whether a mover of one type may be dropped onto a target of another.
#[must_use]
pub fn can_move(mover: ResourceType, target: ResourceType) -> bool {
    allowed_targets(mover).contains(&target)
}

/// A single relocation: move `mover` into the directory of `destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    /// The node being moved.
    pub mover: NodeId,
    /// The chapter, snip or container whose directory receives the mover.
    pub destination: NodeId,
}

/// Reasons a placement cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// The id does not belong to the current outline.
    #[error("node {0} is not part of the current outline")]
    UnknownNode(NodeId),

    /// The type table forbids the move.
    #[error("a {mover} cannot be moved onto a {target}")]
    NotAllowed {
        /// The mover's type.
        mover: ResourceType,
        /// The target's type.
        target: ResourceType,
    },

    /// Only containers of snips can be moved.
    #[error("the chapters container cannot be moved")]
    ChaptersContainer,

    /// The target does not unambiguously name a home for a new node.
    #[error("cannot create a {kind} at {target}: choose a chapter or snip")]
    Ambiguous {
        /// The kind of node being placed.
        kind: ResourceType,
        /// The target's type.
        target: ResourceType,
    },
}

/// Resolves the node whose directory should hold a `mover_type` dropped onto
/// `target`.
///
/// # Errors
///
/// Returns an error if the target is unknown or the type table forbids it.
pub fn destination_for(
    outline: &Outline,
    mover_type: ResourceType,
    target: NodeId,
) -> Result<NodeId, PlacementError> {
    let target_node = outline
        .get(target)
        .ok_or(PlacementError::UnknownNode(target))?;
    let target_type = target_node.resource_type();

    if !can_move(mover_type, target_type) {
        return Err(PlacementError::NotAllowed {
            mover: mover_type,
            target: target_type,
        });
    }

    match mover_type {
        ResourceType::Fragment => match target_type {
            ResourceType::Chapter | ResourceType::Snip => Ok(target),
            _ => outline
                .enclosing(target, |t| matches!(t, ResourceType::Chapter | ResourceType::Snip))
                .map(|node| node.id())
                .ok_or(PlacementError::NotAllowed {
                    mover: mover_type,
                    target: target_type,
                }),
        },
        _ => Ok(snips_home(outline, target)),
    }
}

/// The snips container that a snip dropped onto `target` lands in.
///
/// Roots and chapters use their own snips container. Anything else walks
/// upward to the nearest chapter or root.
fn snips_home(outline: &Outline, target: NodeId) -> NodeId {
    let owner = match outline.get(target).map(|node| node.resource_type()) {
        Some(ResourceType::Root | ResourceType::Chapter) => outline.get(target),
        _ => outline.enclosing(target, |t| matches!(t, ResourceType::Root | ResourceType::Chapter)),
    };
    match owner.map(|node| &node.kind) {
        Some(NodeKind::Chapter { snips, .. }) => *snips,
        _ => outline.snips(),
    }
}

/// Resolves a move request into the relocations that carry it out.
///
/// A container of snips expands into one relocation per child snip, all
/// aimed at the same target. An empty container yields no relocations.
///
/// # Errors
///
/// Returns an error, before anything is touched, if the move is illegal.
pub fn resolve_move(
    outline: &Outline,
    mover: NodeId,
    target: NodeId,
) -> Result<Vec<Relocation>, PlacementError> {
    let mover_node = outline
        .get(mover)
        .ok_or(PlacementError::UnknownNode(mover))?;

    match mover_node.resource_type() {
        ResourceType::Container => {
            if mover == outline.chapters() {
                return Err(PlacementError::ChaptersContainer);
            }
            // Check the container's own row of the table first.
            let target_type = outline
                .get(target)
                .ok_or(PlacementError::UnknownNode(target))?
                .resource_type();
            if !can_move(ResourceType::Container, target_type) {
                return Err(PlacementError::NotAllowed {
                    mover: ResourceType::Container,
                    target: target_type,
                });
            }
            outline
                .children(mover)
                .into_iter()
                .map(|child| {
                    destination_for(outline, child.resource_type(), target).map(|destination| {
                        Relocation {
                            mover: child.id(),
                            destination,
                        }
                    })
                })
                .collect()
        }
        mover_type => {
            let destination = destination_for(outline, mover_type, target)?;
            Ok(vec![Relocation { mover, destination }])
        }
    }
}

/// Resolves where a new snip created "at" `target` lives.
///
/// # Errors
///
/// Returns an error for the chapters container or an unknown id.
pub fn snip_home(outline: &Outline, target: NodeId) -> Result<NodeId, PlacementError> {
    let node = outline
        .get(target)
        .ok_or(PlacementError::UnknownNode(target))?;
    match node.resource_type() {
        ResourceType::Snip => Ok(target),
        ResourceType::Container if target == outline.chapters() => Err(PlacementError::Ambiguous {
            kind: ResourceType::Snip,
            target: ResourceType::Container,
        }),
        ResourceType::Container => Ok(target),
        ResourceType::Chapter | ResourceType::Root | ResourceType::Fragment => {
            Ok(snips_home(outline, target))
        }
    }
}

/// Resolves where a new fragment created "at" `target` lives.
///
/// # Errors
///
/// Returns an error for roots and containers, which do not hold fragments.
pub fn fragment_home(outline: &Outline, target: NodeId) -> Result<NodeId, PlacementError> {
    let node = outline
        .get(target)
        .ok_or(PlacementError::UnknownNode(target))?;
    match node.resource_type() {
        ResourceType::Chapter | ResourceType::Snip => Ok(target),
        ResourceType::Fragment => node
            .ids
            .parent_internal_id
            .ok_or(PlacementError::UnknownNode(target)),
        other @ (ResourceType::Root | ResourceType::Container) => Err(PlacementError::Ambiguous {
            kind: ResourceType::Fragment,
            target: other,
        }),
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::outline::tests::sample;

    #[test_case(ResourceType::Snip, ResourceType::Chapter => true)]
    #[test_case(ResourceType::Snip, ResourceType::Fragment => true)]
    #[test_case(ResourceType::Snip, ResourceType::Root => true)]
    #[test_case(ResourceType::Snip, ResourceType::Container => true)]
    #[test_case(ResourceType::Snip, ResourceType::Snip => true)]
    #[test_case(ResourceType::Container, ResourceType::Fragment => true)]
    #[test_case(ResourceType::Container, ResourceType::Root => true)]
    #[test_case(ResourceType::Fragment, ResourceType::Chapter => true)]
    #[test_case(ResourceType::Fragment, ResourceType::Snip => true)]
    #[test_case(ResourceType::Fragment, ResourceType::Fragment => true)]
    #[test_case(ResourceType::Fragment, ResourceType::Root => false)]
    #[test_case(ResourceType::Fragment, ResourceType::Container => false)]
    #[test_case(ResourceType::Chapter, ResourceType::Chapter => false)]
    #[test_case(ResourceType::Chapter, ResourceType::Root => false)]
    #[test_case(ResourceType::Root, ResourceType::Snip => false)]
    fn type_table(mover: ResourceType, target: ResourceType) -> bool {
        can_move(mover, target)
    }

    #[test]
    fn fragment_onto_fragment_lands_in_enclosing_chapter() {
        let s = sample();
        let plan = resolve_move(&s.outline, s.tf, s.f1).unwrap();
        assert_eq!(
            plan,
            vec![Relocation {
                mover: s.tf,
                destination: s.ch1
            }]
        );
    }

    #[test]
    fn fragment_onto_fragment_in_snip_lands_in_snip() {
        let s = sample();
        let plan = resolve_move(&s.outline, s.f1, s.tf).unwrap();
        assert_eq!(plan[0].destination, s.top);
    }

    #[test]
    fn fragment_onto_root_is_rejected() {
        let s = sample();
        let err = resolve_move(&s.outline, s.f1, s.outline.root()).unwrap_err();
        assert_eq!(
            err,
            PlacementError::NotAllowed {
                mover: ResourceType::Fragment,
                target: ResourceType::Root
            }
        );
    }

    #[test]
    fn chapters_cannot_move() {
        let s = sample();
        assert!(resolve_move(&s.outline, s.ch1, s.top).is_err());
        assert!(resolve_move(&s.outline, s.outline.root(), s.ch1).is_err());
        assert_eq!(
            resolve_move(&s.outline, s.outline.chapters(), s.top).unwrap_err(),
            PlacementError::ChaptersContainer
        );
    }

    #[test]
    fn snip_onto_fragment_in_chapter_lands_in_chapter_snips() {
        let s = sample();
        let plan = resolve_move(&s.outline, s.top, s.f2).unwrap();
        assert_eq!(plan[0].destination, s.ch1_snips);
    }

    #[test]
    fn snip_onto_snip_walks_up_to_root() {
        let s = sample();
        let plan = resolve_move(&s.outline, s.s1, s.top).unwrap();
        assert_eq!(plan[0].destination, s.outline.snips());
    }

    #[test]
    fn snip_onto_root_lands_in_top_level_snips() {
        let s = sample();
        let plan = resolve_move(&s.outline, s.s1, s.outline.root()).unwrap();
        assert_eq!(plan[0].destination, s.outline.snips());
    }

    #[test]
    fn container_expands_into_child_moves() {
        let s = sample();
        let plan = resolve_move(&s.outline, s.ch1_snips, s.outline.root()).unwrap();
        assert_eq!(
            plan,
            vec![Relocation {
                mover: s.s1,
                destination: s.outline.snips()
            }]
        );
    }

    #[test]
    fn new_snip_homes() {
        let s = sample();
        let o = &s.outline;
        assert_eq!(snip_home(o, s.top).unwrap(), s.top);
        assert_eq!(snip_home(o, s.ch1).unwrap(), s.ch1_snips);
        assert_eq!(snip_home(o, s.f1).unwrap(), s.ch1_snips);
        assert_eq!(snip_home(o, s.tf).unwrap(), o.snips());
        assert_eq!(snip_home(o, o.root()).unwrap(), o.snips());
        assert!(snip_home(o, o.chapters()).is_err());
    }

    #[test]
    fn new_fragment_homes() {
        let s = sample();
        let o = &s.outline;
        assert_eq!(fragment_home(o, s.f2).unwrap(), s.ch1);
        assert_eq!(fragment_home(o, s.top).unwrap(), s.top);
        assert!(fragment_home(o, o.root()).is_err());
        assert!(fragment_home(o, s.ch1_snips).is_err());
    }
}
