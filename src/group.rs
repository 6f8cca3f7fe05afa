//! Directory tree of groups and arrays, discovered by scanning the
//! filesystem rather than an in-memory index: `.zgroup` marks a group,
//! `.zarray` marks an array, and a directory with neither is not part of
//! the tree.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::warn;
use walkdir::WalkDir;

use crate::collection::{open_untyped, Attributes, BaseCollection, IArray};
use crate::error::Error;

const ZGROUP_FILE: &str = ".zgroup";

/// A named child of a [Group]: either a nested group or an array, opened
/// lazily and shared via `Rc` so repeated lookups don't reopen the array.
pub enum Node {
    Group(Rc<Group>),
    Array(Rc<std::cell::RefCell<Box<dyn IArray>>>),
}

pub struct Group {
    base: BaseCollection,
}

impl Group {
    /// Create a new, empty group directory and write its `.zgroup` marker.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        fs::create_dir(&path).map_err(|e| Error::io(path.clone(), e))?;
        fs::write(path.join(ZGROUP_FILE), r#"{"zarr_format":2}"#)
            .map_err(|e| Error::io(path.clone(), e))?;
        BaseCollection::open(&path).map(|base| Group { base })
    }

    /// Open an existing group directory.
    pub fn read(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        if !BaseCollection::is_group_dir(&path) {
            return Err(Error::io(
                path.clone(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "missing .zgroup"),
            ));
        }
        BaseCollection::open(path).map(|base| Group { base })
    }

    pub fn path(&self) -> &Path {
        self.base.path()
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn attributes(&self) -> &Attributes {
        self.base.attributes()
    }

    /// Immediate children, each classified as a group or an array by
    /// whichever marker file it carries. Entries under a child that is
    /// itself an array's own chunk files never appear here: only direct
    /// subdirectories of `self` are considered.
    pub fn children(&self) -> Result<Vec<(String, Node)>, Error> {
        let mut out = Vec::new();
        let entries = fs::read_dir(self.base.path()).map_err(|e| Error::io(self.base.path().to_owned(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(self.base.path().to_owned(), e))?;
            let child_path = entry.path();
            if !child_path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if BaseCollection::is_group_dir(&child_path) {
                out.push((name, Node::Group(Rc::new(Group::read(child_path)?))));
            } else if BaseCollection::is_array_dir(&child_path) {
                let array = open_untyped(child_path)?;
                out.push((name, Node::Array(Rc::new(std::cell::RefCell::new(array)))));
            }
            // a plain directory with neither marker is not part of the tree
        }
        Ok(out)
    }

    /// Find a descendant by a `/`-separated path relative to this group,
    /// skipping subdirectories that are neither a group nor an array.
    pub fn find(&self, relative: &str) -> Result<Option<Node>, Error> {
        let mut current = self.base.path().to_owned();
        for component in relative.split('/').filter(|c| !c.is_empty()) {
            current.push(component);
            if !current.is_dir() {
                return Ok(None);
            }
        }
        if BaseCollection::is_group_dir(&current) {
            Ok(Some(Node::Group(Rc::new(Group::read(current)?))))
        } else if BaseCollection::is_array_dir(&current) {
            Ok(Some(Node::Array(Rc::new(std::cell::RefCell::new(open_untyped(
                current,
            )?)))))
        } else {
            Ok(None)
        }
    }

    /// Walk the entire subtree, returning every array's path relative to
    /// this group. Non-fatal anomalies (a directory that disappears mid-scan,
    /// a permission error on one entry) are logged and skipped rather than
    /// aborting the whole scan.
    pub fn array_paths(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        for entry in WalkDir::new(self.base.path()).into_iter() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("skipping unreadable entry while scanning group: {e}");
                    continue;
                }
            };
            if entry.file_type().is_dir() && BaseCollection::is_array_dir(entry.path()) {
                out.push(entry.path().to_owned());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::codec::CompressorKind;
    use crate::order::Order;
    use smallvec::smallvec;
    use tempfile::tempdir;

    #[test]
    fn create_read_roundtrip() {
        let dir = tempdir().unwrap();
        let group_path = dir.path().join("g");
        Group::create(&group_path).unwrap();
        let group = Group::read(&group_path).unwrap();
        assert_eq!(group.path(), group_path);
    }

    #[test]
    fn children_classifies_groups_and_arrays() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        Group::create(&root).unwrap();
        Group::create(root.join("sub")).unwrap();
        Array::<i32>::create_at(
            &root.join("data"),
            smallvec![2u64],
            smallvec![2u64],
            Order::ColumnMajor,
            0.0,
            CompressorKind::Null,
        )
        .unwrap();

        let group = Group::read(&root).unwrap();
        let children = group.children().unwrap();
        assert_eq!(children.len(), 2);
        let mut names: Vec<_> = children.iter().map(|(n, _)| n.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["data", "sub"]);
    }

    #[test]
    fn find_descends_nested_path() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        Group::create(&root).unwrap();
        Group::create(root.join("sub")).unwrap();
        Array::<i32>::create_at(
            &root.join("sub").join("data"),
            smallvec![2u64],
            smallvec![2u64],
            Order::ColumnMajor,
            0.0,
            CompressorKind::Null,
        )
        .unwrap();

        let group = Group::read(&root).unwrap();
        assert!(matches!(group.find("sub/data").unwrap(), Some(Node::Array(_))));
        assert!(group.find("missing").unwrap().is_none());
    }
}
