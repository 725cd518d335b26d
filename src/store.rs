use std::collections::HashMap;
use std::path::Path;

use crate::error::Error;
use crate::model::PackageRecord;

/// Read access to package records.
pub trait PackageStore {
    /// Look up each ID, returning results in input order. IDs that do not
    /// exist come back as `None`; `Err` is reserved for the store itself failing.
    fn resolve_packages(&self, ids: &[String]) -> Result<Vec<Option<PackageRecord>>, Error>;

    fn get_package(&self, id: &str) -> Result<Option<PackageRecord>, Error> {
        let mut found = self.resolve_packages(&[id.to_string()])?;
        Ok(found.pop().flatten())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    packages: HashMap<String, PackageRecord>,
}

impl MemoryStore {
    pub fn new(records: impl IntoIterator<Item = PackageRecord>) -> Self {
        Self {
            packages: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    pub fn insert(&mut self, record: PackageRecord) {
        self.packages.insert(record.id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl PackageStore for MemoryStore {
    fn resolve_packages(&self, ids: &[String]) -> Result<Vec<Option<PackageRecord>>, Error> {
        Ok(ids.iter().map(|id| self.packages.get(id).cloned()).collect())
    }
}

/// Packages loaded once from a JSON array of records.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    inner: MemoryStore,
}

impl JsonFileStore {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let data = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())))
            }
            _ => Error::Io(e),
        })?;
        Self::from_json(&data)
            .map_err(|e| Error::Store(format!("{}: {e}", path.display())))
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let records: Vec<PackageRecord> =
            serde_json::from_str(json).map_err(|e| Error::Store(e.to_string()))?;
        log::debug!("package store loaded {} records", records.len());
        Ok(Self {
            inner: MemoryStore::new(records),
        })
    }
}

impl PackageStore for JsonFileStore {
    fn resolve_packages(&self, ids: &[String]) -> Result<Vec<Option<PackageRecord>>, Error> {
        self.inner.resolve_packages(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_in_input_order_with_gaps() {
        let store = MemoryStore::new([
            PackageRecord::new("a", "PKG-0001", "Attic"),
            PackageRecord::new("b", "PKG-0002", "Basement"),
        ]);
        let ids: Vec<String> = ["b", "zzz", "a"].iter().map(|s| s.to_string()).collect();
        let found = store.resolve_packages(&ids).unwrap();
        let names: Vec<Option<&str>> = found
            .iter()
            .map(|r| r.as_ref().map(|r| r.display_id.as_str()))
            .collect();
        assert_eq!(names, vec![Some("PKG-0002"), None, Some("PKG-0001")]);
    }

    #[test]
    fn json_store_reads_records() {
        let store = JsonFileStore::from_json(
            r#"[{ "id": "p1", "display_id": "PKG-0001", "location": "Shed" },
                { "id": "p2", "display_id": "PKG-0002" }]"#,
        )
        .unwrap();
        let p2 = store.get_package("p2").unwrap().unwrap();
        assert_eq!(p2.location, "");
        assert!(store.get_package("p3").unwrap().is_none());
    }

    #[test]
    fn bad_json_is_store_error() {
        assert!(matches!(JsonFileStore::from_json("{}"), Err(Error::Store(_))));
    }
}
