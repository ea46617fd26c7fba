//! Target catalog - the persisted list of sync targets
//!
//! Targets are kept in user order and form a tree through `parent_id`
//! links pointing at groups. The catalog is the single authoritative copy
//! of every [`SyncTarget`]: the sync engine works on clones and the caller
//! writes results back with [`TargetCatalog::replace`].
//!
//! ## File format
//!
//! Pretty-printed JSON `{"notes": [...]}` written atomically (temp file in
//! the same directory, then rename).

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::domain::{
    derive_file_name, DomainError, SyncTarget, TargetId, STATUS_EDITED,
};

/// Prefix of Yandex Disk pseudo-URLs
pub const YANDEX_PSEUDO_SCHEME: &str = "ya-disk-public://";

const INVALID_URL_MESSAGE: &str = "URL is invalid. Use public http/https or ya-disk-public link";

/// Normalizes a user-entered source URL
///
/// Pseudo-URLs keep their scheme with spaces turned into `+`; anything
/// without a scheme is treated as `https`. Only http(s) URLs with a host
/// are accepted otherwise. Accepted input is stored as typed, not in
/// parsed form.
pub fn normalize_source_url(raw: &str) -> Result<String, DomainError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(DomainError::InvalidUrl(INVALID_URL_MESSAGE.into()));
    }

    if value.to_ascii_lowercase().starts_with(YANDEX_PSEUDO_SCHEME) {
        return Ok(value.replace(' ', "+"));
    }

    let candidate = if value.contains("://") {
        value.to_string()
    } else {
        format!("https://{value}")
    };

    let parsed =
        Url::parse(&candidate).map_err(|_| DomainError::InvalidUrl(INVALID_URL_MESSAGE.into()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DomainError::InvalidUrl(INVALID_URL_MESSAGE.into()));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(DomainError::InvalidUrl(INVALID_URL_MESSAGE.into()));
    }
    Ok(candidate)
}

/// Requested changes to a target; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct TargetEdit {
    pub title: Option<String>,
    pub url: Option<String>,
    /// `Some(None)` moves the target to the top level
    pub parent: Option<Option<TargetId>>,
}

/// Result of [`TargetCatalog::edit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// The URL changed; the caller must purge the target's local mirror
    pub url_changed: bool,
}

#[derive(Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    notes: Vec<SyncTarget>,
}

/// Ordered, tree-shaped collection of sync targets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetCatalog {
    targets: Vec<SyncTarget>,
}

impl TargetCatalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from records, repairing names and parent links
    pub fn from_targets(targets: Vec<SyncTarget>) -> Self {
        let mut catalog = Self { targets };
        catalog.repair();
        catalog
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Loads the catalog from `path`; a missing file yields an empty catalog
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Catalog file not found, starting empty");
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let file: CatalogFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
        Ok(Self::from_targets(file.notes))
    }

    /// Writes the catalog atomically to `path`
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create catalog directory")?;
        }
        let file = CatalogFile {
            notes: self.targets.clone(),
        };
        let json = serde_json::to_string_pretty(&file).context("Failed to serialize catalog")?;

        let mut tmp_path = path.as_os_str().to_owned();
        tmp_path.push(".tmp");
        std::fs::write(&tmp_path, json).context("Failed to write catalog temp file")?;
        std::fs::rename(&tmp_path, path).context("Failed to move catalog into place")?;
        debug!(path = %path.display(), count = self.targets.len(), "Catalog saved");
        Ok(())
    }

    /// Fills missing file names and drops invalid parent links
    fn repair(&mut self) {
        let groups: HashSet<TargetId> = self
            .targets
            .iter()
            .filter(|t| t.is_group)
            .map(|t| t.id)
            .collect();

        for target in &mut self.targets {
            if target.file_name.is_empty() {
                target.file_name = derive_file_name(&target.title, &target.id);
            }
            if let Some(parent) = target.parent_id {
                if parent == target.id || !groups.contains(&parent) {
                    warn!(target_id = %target.id, %parent, "Dropping invalid parent link");
                    target.parent_id = None;
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// All targets in catalog order
    pub fn targets(&self) -> &[SyncTarget] {
        &self.targets
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Looks up a target by id
    pub fn find(&self, id: &TargetId) -> Option<&SyncTarget> {
        self.targets.iter().find(|t| &t.id == id)
    }

    /// Looks up a target by full id or unique id prefix
    pub fn find_by_prefix(&self, prefix: &str) -> Result<&SyncTarget, DomainError> {
        let prefix = prefix.trim().to_ascii_lowercase();
        if prefix.is_empty() {
            return Err(DomainError::TargetNotFound(prefix));
        }
        let mut matches = self
            .targets
            .iter()
            .filter(|t| t.id.to_string().starts_with(&prefix));
        let first = matches
            .next()
            .ok_or_else(|| DomainError::TargetNotFound(prefix.clone()))?;
        if matches.next().is_some() {
            return Err(DomainError::AmbiguousId(prefix));
        }
        Ok(first)
    }

    fn children(&self, parent: Option<TargetId>) -> impl Iterator<Item = &SyncTarget> {
        self.targets.iter().filter(move |t| t.parent_id == parent)
    }

    /// Every target below `root`, excluding `root` itself
    pub fn descendant_ids(&self, root: &TargetId) -> HashSet<TargetId> {
        let mut descendants = HashSet::new();
        let mut stack = vec![*root];
        while let Some(current) = stack.pop() {
            for child in self.children(Some(current)) {
                if descendants.insert(child.id) {
                    stack.push(child.id);
                }
            }
        }
        descendants.remove(root);
        descendants
    }

    /// Targets a sync of `id` covers: itself, or a group's syncable descendants
    pub fn sync_ids_for(&self, id: &TargetId) -> Vec<TargetId> {
        let Some(target) = self.find(id) else {
            return Vec::new();
        };
        if !target.is_group {
            return vec![target.id];
        }
        let descendants = self.descendant_ids(id);
        self.targets
            .iter()
            .filter(|t| !t.is_group && descendants.contains(&t.id))
            .map(|t| t.id)
            .collect()
    }

    /// Every syncable target
    pub fn all_sync_ids(&self) -> Vec<TargetId> {
        self.targets
            .iter()
            .filter(|t| t.is_syncable())
            .map(|t| t.id)
            .collect()
    }

    /// Depth-first tree order with nesting depth
    ///
    /// Siblings list groups first, then by case-insensitive title. Targets
    /// unreachable from the top level (parent cycles) are appended at depth 0.
    pub fn flatten(&self) -> Vec<(&SyncTarget, usize)> {
        let mut by_parent: HashMap<Option<TargetId>, Vec<&SyncTarget>> = HashMap::new();
        for target in &self.targets {
            let parent = target
                .parent_id
                .filter(|p| *p != target.id && self.find(p).is_some());
            by_parent.entry(parent).or_default().push(target);
        }
        let sort_key = |t: &&SyncTarget| (!t.is_group, t.title.to_lowercase());
        for siblings in by_parent.values_mut() {
            siblings.sort_by_key(sort_key);
        }

        let mut flattened = Vec::with_capacity(self.targets.len());
        let mut visited = HashSet::new();
        let mut stack: Vec<(&SyncTarget, usize)> = by_parent
            .get(&None)
            .map(|top| top.iter().rev().map(|t| (*t, 0)).collect())
            .unwrap_or_default();

        while let Some((target, depth)) = stack.pop() {
            if !visited.insert(target.id) {
                continue;
            }
            flattened.push((target, depth));
            if let Some(children) = by_parent.get(&Some(target.id)) {
                stack.extend(children.iter().rev().map(|c| (*c, depth + 1)));
            }
        }

        let mut orphans: Vec<&SyncTarget> = self
            .targets
            .iter()
            .filter(|t| !visited.contains(&t.id))
            .collect();
        orphans.sort_by_key(sort_key);
        flattened.extend(orphans.into_iter().map(|t| (t, 0)));
        flattened
    }

    /// Titles from the top level down to `id`, joined with " / "
    pub fn display_path(&self, id: &TargetId) -> String {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(*id);
        while let Some(cur) = current {
            if !seen.insert(cur) {
                break;
            }
            let Some(target) = self.find(&cur) else {
                break;
            };
            chain.push(target.title.as_str());
            current = target.parent_id;
        }
        chain.reverse();
        chain.join(" / ")
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    fn check_parent(&self, parent: Option<TargetId>) -> Result<(), DomainError> {
        match parent {
            None => Ok(()),
            Some(p) => match self.find(&p) {
                Some(t) if t.is_group => Ok(()),
                Some(_) => Err(DomainError::ValidationFailed(format!(
                    "Parent {p} is not a folder"
                ))),
                None => Err(DomainError::TargetNotFound(p.to_string())),
            },
        }
    }

    fn clean_title(title: &str) -> Result<String, DomainError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::ValidationFailed("Title cannot be empty".into()));
        }
        Ok(title.to_string())
    }

    /// Adds a syncable target
    pub fn add_target(
        &mut self,
        title: &str,
        url: &str,
        parent: Option<TargetId>,
    ) -> Result<&SyncTarget, DomainError> {
        let title = Self::clean_title(title)?;
        let url = normalize_source_url(url)?;
        self.check_parent(parent)?;

        let mut target = SyncTarget::new(title, url);
        target.parent_id = parent;
        Ok(self.push(target))
    }

    /// Adds a group node
    pub fn add_group(
        &mut self,
        title: &str,
        parent: Option<TargetId>,
    ) -> Result<&SyncTarget, DomainError> {
        let title = Self::clean_title(title)?;
        self.check_parent(parent)?;

        let mut group = SyncTarget::new_group(title);
        group.parent_id = parent;
        Ok(self.push(group))
    }

    fn push(&mut self, target: SyncTarget) -> &SyncTarget {
        self.targets.push(target);
        let last = self.targets.len() - 1;
        &self.targets[last]
    }

    /// Writes back a target returned by the sync engine
    pub fn replace(&mut self, target: SyncTarget) -> Result<(), DomainError> {
        let slot = self
            .targets
            .iter_mut()
            .find(|t| t.id == target.id)
            .ok_or_else(|| DomainError::TargetNotFound(target.id.to_string()))?;
        *slot = target;
        Ok(())
    }

    /// Applies a user edit
    pub fn edit(&mut self, id: &TargetId, edit: TargetEdit) -> Result<EditOutcome, DomainError> {
        let title = edit.title.as_deref().map(Self::clean_title).transpose()?;

        let url = match edit.url.as_deref() {
            Some(raw) => {
                let is_group = self
                    .find(id)
                    .ok_or_else(|| DomainError::TargetNotFound(id.to_string()))?
                    .is_group;
                if is_group {
                    return Err(DomainError::ValidationFailed(
                        "Folders have no source URL".into(),
                    ));
                }
                Some(normalize_source_url(raw)?)
            }
            None => None,
        };

        if let Some(parent) = edit.parent {
            self.check_parent(parent)?;
            if let Some(p) = parent {
                if &p == id || self.descendant_ids(id).contains(&p) {
                    return Err(DomainError::InvalidParent(id.to_string()));
                }
            }
        }

        let target = self
            .targets
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| DomainError::TargetNotFound(id.to_string()))?;

        if let Some(title) = title {
            target.title = title;
        }
        let url_changed = url.map_or(false, |u| target.set_url(u));
        if let Some(parent) = edit.parent {
            target.parent_id = parent;
        }
        if !target.is_group {
            target.status = STATUS_EDITED.to_string();
            target.last_error = None;
        }

        Ok(EditOutcome { url_changed })
    }

    /// Removes a target; a group must be empty first
    ///
    /// # Returns
    /// The removed record, so the caller can purge its local store
    pub fn remove(&mut self, id: &TargetId) -> Result<SyncTarget, DomainError> {
        let index = self
            .targets
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| DomainError::TargetNotFound(id.to_string()))?;
        if self.targets[index].is_group && self.children(Some(*id)).next().is_some() {
            return Err(DomainError::GroupNotEmpty);
        }
        Ok(self.targets.remove(index))
    }
}
