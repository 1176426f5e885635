//! Hierarchy repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide load/insert/edit APIs for containers and leaves.
//! - Apply placement and delete writes, one at a time or as one transaction.
//!
//! # Invariants
//! - Records are listed in insertion order; sibling sorting is done by the
//!   engine so ties stay deterministic.
//! - Batched writes commit all-or-nothing inside one `IMMEDIATE` transaction.
//! - Foreign keys reject deleting a container that still has children or
//!   leaves, so callers must rescue leaves and delete bottom-up.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::node::{
    Container, ContainerId, ContainerKind, DepthPolicy, Leaf, LeafId, LeafKind, NodeRef,
};
use crate::tree::Hierarchy;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type used by hierarchy repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from hierarchy repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target record does not exist.
    NotFound(NodeRef),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid record, or a write was
    /// refused by the backing store.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(node) => write!(f, "{node} not found in storage"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "hierarchy repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "hierarchy repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "hierarchy repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid hierarchy data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One persistence step of a structural operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyWrite {
    /// Set a container's parent and order.
    PlaceContainer {
        id: ContainerId,
        parent_id: Option<ContainerId>,
        display_order: u32,
    },
    /// Set a leaf's container and order.
    PlaceLeaf {
        id: LeafId,
        container_id: Option<ContainerId>,
        display_order: u32,
    },
    /// Remove one container record. Missing rows are skipped.
    DeleteContainer(ContainerId),
}

impl HierarchyWrite {
    pub fn place_container(container: &Container) -> Self {
        Self::PlaceContainer {
            id: container.id,
            parent_id: container.parent_id,
            display_order: container.display_order,
        }
    }

    pub fn place_leaf(leaf: &Leaf) -> Self {
        Self::PlaceLeaf {
            id: leaf.id,
            container_id: leaf.container_id,
            display_order: leaf.display_order,
        }
    }

    /// Record touched by this write.
    pub fn target(&self) -> NodeRef {
        match self {
            Self::PlaceContainer { id, .. } | Self::DeleteContainer(id) => NodeRef::Container(*id),
            Self::PlaceLeaf { id, .. } => NodeRef::Leaf(*id),
        }
    }
}

/// Repository interface for hierarchy persistence.
pub trait HierarchyRepository {
    /// Lists every container in insertion order.
    fn list_containers(&self) -> RepoResult<Vec<Container>>;
    /// Lists every leaf in insertion order.
    fn list_leaves(&self) -> RepoResult<Vec<Leaf>>;
    /// Inserts one container record as-is.
    fn insert_container(&self, container: &Container) -> RepoResult<()>;
    /// Inserts one leaf record as-is.
    fn insert_leaf(&self, leaf: &Leaf) -> RepoResult<()>;
    /// Updates name and description of one container.
    fn update_container_details(
        &self,
        id: ContainerId,
        name: &str,
        description: Option<&str>,
    ) -> RepoResult<()>;
    /// Applies one write on its own.
    fn apply_write(&self, write: &HierarchyWrite) -> RepoResult<()>;

    /// Whether [`HierarchyRepository::apply_batch`] is atomic.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Applies all writes atomically. Only called when `supports_batch`.
    fn apply_batch(&self, writes: &[HierarchyWrite]) -> RepoResult<()> {
        for write in writes {
            self.apply_write(write)?;
        }
        Ok(())
    }

    /// Loads the full flat collection.
    fn load_hierarchy(&self) -> RepoResult<Hierarchy> {
        Ok(Hierarchy::new(self.list_containers()?, self.list_leaves()?))
    }
}

/// SQLite-backed hierarchy repository.
pub struct SqliteHierarchyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHierarchyRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_hierarchy_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl HierarchyRepository for SqliteHierarchyRepository<'_> {
    fn list_containers(&self) -> RepoResult<Vec<Container>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                container_uuid,
                name,
                description,
                parent_uuid,
                display_order,
                kind,
                depth_policy
             FROM hierarchy_containers
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_container_row(row)?);
        }
        Ok(items)
    }

    fn list_leaves(&self) -> RepoResult<Vec<Leaf>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                leaf_uuid,
                container_uuid,
                display_order,
                kind,
                payload
             FROM hierarchy_leaves
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_leaf_row(row)?);
        }
        Ok(items)
    }

    fn insert_container(&self, container: &Container) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO hierarchy_containers (
                container_uuid,
                name,
                description,
                parent_uuid,
                display_order,
                kind,
                depth_policy
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                container.id.to_string(),
                container.name.as_str(),
                container.description.as_deref(),
                container.parent_id.map(|value| value.to_string()),
                container.display_order,
                container.kind.as_str(),
                container.depth_policy.as_str(),
            ],
        )?;
        Ok(())
    }

    fn insert_leaf(&self, leaf: &Leaf) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO hierarchy_leaves (
                leaf_uuid,
                container_uuid,
                display_order,
                kind,
                payload
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                leaf.id.to_string(),
                leaf.container_id.map(|value| value.to_string()),
                leaf.display_order,
                leaf.kind.as_str(),
                leaf.payload.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn update_container_details(
        &self,
        id: ContainerId,
        name: &str,
        description: Option<&str>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE hierarchy_containers
             SET name = ?2,
                 description = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE container_uuid = ?1;",
            params![id.to_string(), name, description],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(NodeRef::Container(id)));
        }
        Ok(())
    }

    fn apply_write(&self, write: &HierarchyWrite) -> RepoResult<()> {
        execute_write(self.conn, write)
    }

    fn supports_batch(&self) -> bool {
        true
    }

    fn apply_batch(&self, writes: &[HierarchyWrite]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for write in writes {
            execute_write(&tx, write)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn execute_write(conn: &Connection, write: &HierarchyWrite) -> RepoResult<()> {
    match write {
        HierarchyWrite::PlaceContainer {
            id,
            parent_id,
            display_order,
        } => {
            let changed = conn.execute(
                "UPDATE hierarchy_containers
                 SET parent_uuid = ?2,
                     display_order = ?3,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE container_uuid = ?1;",
                params![
                    id.to_string(),
                    parent_id.map(|value| value.to_string()),
                    display_order,
                ],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound(NodeRef::Container(*id)));
            }
        }
        HierarchyWrite::PlaceLeaf {
            id,
            container_id,
            display_order,
        } => {
            let changed = conn.execute(
                "UPDATE hierarchy_leaves
                 SET container_uuid = ?2,
                     display_order = ?3,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE leaf_uuid = ?1;",
                params![
                    id.to_string(),
                    container_id.map(|value| value.to_string()),
                    display_order,
                ],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound(NodeRef::Leaf(*id)));
            }
        }
        HierarchyWrite::DeleteContainer(id) => {
            conn.execute(
                "DELETE FROM hierarchy_containers WHERE container_uuid = ?1;",
                [id.to_string()],
            )?;
        }
    }
    Ok(())
}

fn parse_container_row(row: &Row<'_>) -> RepoResult<Container> {
    let id_text: String = row.get("container_uuid")?;
    let parent_id = row
        .get::<_, Option<String>>("parent_uuid")?
        .map(|value| parse_uuid(&value, "hierarchy_containers.parent_uuid"))
        .transpose()?;

    let kind_text: String = row.get("kind")?;
    let kind = ContainerKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid container kind `{kind_text}` in hierarchy_containers.kind"
        ))
    })?;
    let policy_text: String = row.get("depth_policy")?;
    let depth_policy = DepthPolicy::parse(&policy_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid depth policy `{policy_text}` in hierarchy_containers.depth_policy"
        ))
    })?;

    Ok(Container {
        id: parse_uuid(&id_text, "hierarchy_containers.container_uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        parent_id,
        display_order: parse_order(row, "hierarchy_containers.display_order")?,
        kind,
        depth_policy,
    })
}

fn parse_leaf_row(row: &Row<'_>) -> RepoResult<Leaf> {
    let id_text: String = row.get("leaf_uuid")?;
    let container_id = row
        .get::<_, Option<String>>("container_uuid")?
        .map(|value| parse_uuid(&value, "hierarchy_leaves.container_uuid"))
        .transpose()?;
    let kind_text: String = row.get("kind")?;
    let kind = LeafKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid leaf kind `{kind_text}` in hierarchy_leaves.kind"
        ))
    })?;

    Ok(Leaf {
        id: parse_uuid(&id_text, "hierarchy_leaves.leaf_uuid")?,
        container_id,
        display_order: parse_order(row, "hierarchy_leaves.display_order")?,
        kind,
        payload: row.get("payload")?,
    })
}

fn parse_order(row: &Row<'_>, column: &'static str) -> RepoResult<u32> {
    let value: i64 = row.get("display_order")?;
    u32::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid display order `{value}` in {column}"))
    })
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_hierarchy_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let required: [(&'static str, &[&'static str]); 2] = [
        (
            "hierarchy_containers",
            &[
                "container_uuid",
                "name",
                "description",
                "parent_uuid",
                "display_order",
                "kind",
                "depth_policy",
            ],
        ),
        (
            "hierarchy_leaves",
            &[
                "leaf_uuid",
                "container_uuid",
                "display_order",
                "kind",
                "payload",
            ],
        ),
    ];

    for (table, columns) in required {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{HierarchyRepository, HierarchyWrite, RepoError, SqliteHierarchyRepository};
    use crate::db::open_db_in_memory;
    use crate::model::node::{Container, ContainerKind, Leaf, LeafKind, NodeRef};
    use rusqlite::Connection;

    #[test]
    fn rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteHierarchyRepository::try_new(&conn)
            .err()
            .expect("unmigrated connection must be rejected");
        assert!(matches!(
            err,
            RepoError::UninitializedConnection {
                actual_version: 0,
                ..
            }
        ));
    }

    #[test]
    fn records_round_trip_through_storage() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteHierarchyRepository::try_new(&conn).unwrap();

        let mut menu = Container::new(ContainerKind::MenuGroup, "Main");
        menu.description = Some("top navigation".to_string());
        repo.insert_container(&menu).unwrap();
        let mut entry = Leaf::new(LeafKind::MenuEntry);
        entry.container_id = Some(menu.id);
        entry.payload = Some("{\"url\":\"/home\"}".to_string());
        repo.insert_leaf(&entry).unwrap();

        let hierarchy = repo.load_hierarchy().unwrap();
        assert_eq!(hierarchy.containers, vec![menu]);
        assert_eq!(hierarchy.leaves, vec![entry]);
    }

    #[test]
    fn placement_of_missing_record_is_not_found_but_delete_is_skipped() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteHierarchyRepository::try_new(&conn).unwrap();
        let ghost = uuid::Uuid::new_v4();

        let err = repo
            .apply_write(&HierarchyWrite::PlaceLeaf {
                id: ghost,
                container_id: None,
                display_order: 0,
            })
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(NodeRef::Leaf(id)) if id == ghost));

        repo.apply_write(&HierarchyWrite::DeleteContainer(ghost))
            .unwrap();
    }

    #[test]
    fn batch_rolls_back_on_failure() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteHierarchyRepository::try_new(&conn).unwrap();
        let folder = Container::new(ContainerKind::Folder, "Docs");
        repo.insert_container(&folder).unwrap();

        let result = repo.apply_batch(&[
            HierarchyWrite::PlaceContainer {
                id: folder.id,
                parent_id: None,
                display_order: 4,
            },
            HierarchyWrite::PlaceLeaf {
                id: uuid::Uuid::new_v4(),
                container_id: None,
                display_order: 0,
            },
        ]);
        assert!(result.is_err());

        let containers = repo.list_containers().unwrap();
        assert_eq!(containers[0].display_order, 0);
    }
}
