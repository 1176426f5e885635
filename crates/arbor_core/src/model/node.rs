//! Container and leaf records.
//!
//! # Responsibility
//! - Define the canonical shapes for hierarchy containers and leaves.
//! - Map kind/policy tags to stable storage strings.
//!
//! # Invariants
//! - `parent_id = None` / `container_id = None` means root level.
//! - `display_order` is dense within a sibling group after every successful
//!   structural operation.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable container identifier.
pub type ContainerId = Uuid;

/// Stable leaf identifier.
pub type LeafId = Uuid;

/// Nesting policy carried by a container.
///
/// `TwoLevel` is the navigation-menu rule: the container may sit at root or
/// directly under a root-level container, never deeper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthPolicy {
    /// Unlimited nesting (folder trees).
    #[default]
    Unbounded,
    /// At most two levels (navigation menus).
    TwoLevel,
}

impl DepthPolicy {
    /// Maximum number of levels, if bounded.
    pub fn max_depth(self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::TwoLevel => Some(2),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unbounded => "unbounded",
            Self::TwoLevel => "two_level",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unbounded" => Some(Self::Unbounded),
            "two_level" => Some(Self::TwoLevel),
            _ => None,
        }
    }
}

/// Container category shown by admin surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// Content folder.
    Folder,
    /// Navigation menu parent.
    MenuGroup,
}

impl ContainerKind {
    /// Nesting policy applied to newly created containers of this kind.
    pub fn default_depth_policy(self) -> DepthPolicy {
        match self {
            Self::Folder => DepthPolicy::Unbounded,
            Self::MenuGroup => DepthPolicy::TwoLevel,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::MenuGroup => "menu_group",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "folder" => Some(Self::Folder),
            "menu_group" => Some(Self::MenuGroup),
            _ => None,
        }
    }
}

/// Leaf category shown by admin surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafKind {
    /// Content item living in a folder.
    ContentItem,
    /// Navigation entry living in a menu group.
    MenuEntry,
}

impl LeafKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContentItem => "content_item",
            Self::MenuEntry => "menu_entry",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "content_item" => Some(Self::ContentItem),
            "menu_entry" => Some(Self::MenuEntry),
            _ => None,
        }
    }
}

/// Folder or menu parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    /// User-facing label. Never logged.
    pub name: String,
    pub description: Option<String>,
    /// `None` means root level.
    pub parent_id: Option<ContainerId>,
    /// Position within the parent's container siblings.
    pub display_order: u32,
    pub kind: ContainerKind,
    pub depth_policy: DepthPolicy,
}

impl Container {
    /// Creates a root-level container with a generated id and the kind's
    /// default depth policy.
    pub fn new(kind: ContainerKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            parent_id: None,
            display_order: 0,
            kind,
            depth_policy: kind.default_depth_policy(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Content item or menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    pub id: LeafId,
    /// `None` means root level.
    pub container_id: Option<ContainerId>,
    /// Position within the container's leaf siblings.
    pub display_order: u32,
    pub kind: LeafKind,
    /// Domain payload owned by the CRUD layer.
    pub payload: Option<String>,
}

impl Leaf {
    /// Creates a root-level leaf with a generated id.
    pub fn new(kind: LeafKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            container_id: None,
            display_order: 0,
            kind,
            payload: None,
        }
    }
}

/// Reference to any hierarchy record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeRef {
    Container(ContainerId),
    Leaf(LeafId),
}

impl NodeRef {
    pub fn container_id(self) -> Option<ContainerId> {
        match self {
            Self::Container(id) => Some(id),
            Self::Leaf(_) => None,
        }
    }

    pub fn leaf_id(self) -> Option<LeafId> {
        match self {
            Self::Container(_) => None,
            Self::Leaf(id) => Some(id),
        }
    }
}

impl Display for NodeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Container(id) => write!(f, "container {id}"),
            Self::Leaf(id) => write!(f, "leaf {id}"),
        }
    }
}
