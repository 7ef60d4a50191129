use crate::catalog::{BackupEntry, BackupKind};
use crate::errors::HostError;

/// Archives to apply, oldest layer first. Later entries overwrite earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreChain {
    entries: Vec<BackupEntry>,
}

impl RestoreChain {
    pub fn entries(&self) -> &[BackupEntry] {
        &self.entries
    }

    /// The restore point the user picked.
    pub fn target(&self) -> &BackupEntry {
        // never empty: built from at least the selected entry
        &self.entries[self.entries.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size).sum()
    }
}

/// Work out which archives rebuild `selected`. A partial differential needs the
/// nearest full differential strictly older than itself.
pub fn resolve(catalog: &[BackupEntry], selected: &BackupEntry) -> Result<RestoreChain, HostError> {
    if selected.kind != BackupKind::DifferentialPartial {
        return Ok(RestoreChain {
            entries: vec![selected.clone()],
        });
    }

    let base = catalog
        .iter()
        .filter(|entry| entry.kind == BackupKind::DifferentialFull)
        .filter(|entry| entry.modified < selected.modified)
        .max_by_key(|entry| entry.modified)
        .ok_or_else(|| HostError::ChainBroken {
            partial: selected.name.clone(),
        })?;

    Ok(RestoreChain {
        entries: vec![base.clone(), selected.clone()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: BackupKind, modified: u64) -> BackupEntry {
        BackupEntry {
            name: name.to_string(),
            path: format!("/backups/world/differential/{name}"),
            size: modified * 10,
            modified,
            kind,
        }
    }

    #[test]
    fn partial_is_paired_with_nearest_earlier_full() {
        let catalog = vec![
            entry("p25.zip", BackupKind::DifferentialPartial, 25),
            entry("f20-full.zip", BackupKind::DifferentialFull, 20),
            entry("f10-full.zip", BackupKind::DifferentialFull, 10),
            entry("f30-full.zip", BackupKind::DifferentialFull, 30),
        ];
        let chain = resolve(&catalog, &catalog[0]).expect("chain");
        let names = chain.entries().iter().map(|e| e.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["f20-full.zip", "p25.zip"]);
        assert_eq!(chain.target().name, "p25.zip");
        assert_eq!(chain.total_size(), 450);
    }

    #[test]
    fn partial_without_base_is_rejected() {
        let catalog = vec![
            entry("p5.zip", BackupKind::DifferentialPartial, 5),
            entry("f10-full.zip", BackupKind::DifferentialFull, 10),
        ];
        let err = resolve(&catalog, &catalog[0]).expect_err("broken chain");
        assert!(matches!(err, HostError::ChainBroken { .. }));
    }

    #[test]
    fn full_with_same_timestamp_does_not_qualify() {
        let catalog = vec![
            entry("p10.zip", BackupKind::DifferentialPartial, 10),
            entry("f10-full.zip", BackupKind::DifferentialFull, 10),
        ];
        assert!(resolve(&catalog, &catalog[0]).is_err());
    }

    #[test]
    fn standalone_kinds_restore_alone() {
        for kind in [
            BackupKind::DifferentialFull,
            BackupKind::PlainArchive,
            BackupKind::Snapshot,
        ] {
            let selected = entry("x.zip", kind, 7);
            let chain = resolve(&[], &selected).expect("chain");
            assert_eq!(chain.len(), 1);
            assert_eq!(chain.target(), &selected);
        }
    }
}
