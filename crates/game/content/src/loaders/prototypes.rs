//! Action prototype loader.
//!
//! Loads action prototypes from RON catalogs and serves them through the
//! core's [`PrototypeOracle`].

use std::path::Path;

use actions_core::{ActionPrototype, PrototypeId, PrototypeOracle, PrototypeTable};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::loaders::{LoadResult, read_file};

/// Prototype catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrototypeCatalog {
    pub prototypes: Vec<ActionPrototype>,
}

/// Embedded catalogs shipped with the crate, in load order.
const EMBEDDED: &[(&str, &str)] = &[
    ("innate.ron", include_str!("../../data/actions/innate.ron")),
    ("spells.ron", include_str!("../../data/actions/spells.ron")),
    ("equipment.ron", include_str!("../../data/actions/equipment.ron")),
];

/// Registry of action prototypes keyed by id.
///
/// Ids must be unique across every catalog loaded into one registry.
#[derive(Debug, Clone, Default)]
pub struct PrototypeRegistry {
    table: PrototypeTable,
}

impl PrototypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every catalog embedded in the crate.
    pub fn load_embedded() -> LoadResult<Self> {
        let mut registry = Self::new();
        for (name, source) in EMBEDDED {
            registry.extend_from_ron(name, source)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Loads every `*.ron` catalog in `dir`, in file-name order.
    pub fn load_dir(dir: &Path) -> LoadResult<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            anyhow::anyhow!("Failed to read prototype dir {}: {}", dir.display(), e)
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "ron") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut registry = Self::new();
        for path in &paths {
            registry.load_file(path)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Parses a single catalog.
    pub fn from_ron_str(source: &str) -> LoadResult<Self> {
        let mut registry = Self::new();
        registry.extend_from_ron("<inline>", source)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Adds the prototypes of one catalog file.
    pub fn load_file(&mut self, path: &Path) -> LoadResult<usize> {
        let content = read_file(path)?;
        self.extend_from_ron(&path.display().to_string(), &content)
    }

    fn extend_from_ron(&mut self, origin: &str, source: &str) -> LoadResult<usize> {
        let catalog: PrototypeCatalog = ron::from_str(source)
            .map_err(|e| anyhow::anyhow!("Failed to parse prototype RON {}: {}", origin, e))?;

        let count = catalog.prototypes.len();
        for prototype in catalog.prototypes {
            self.insert(prototype)
                .map_err(|e| anyhow::anyhow!("{} ({})", e, origin))?;
        }
        debug!(origin, count, "loaded action prototypes");
        Ok(count)
    }

    /// Registers one prototype. Display names default to the id.
    pub fn insert(&mut self, mut prototype: ActionPrototype) -> LoadResult<()> {
        if self.table.prototype(&prototype.id).is_some() {
            anyhow::bail!("duplicate action prototype '{}'", prototype.id);
        }
        if prototype.name.is_empty() {
            prototype.name = prototype.id.to_string();
        }
        self.table.insert(prototype);
        Ok(())
    }

    /// Checks that every upgrade table only names known prototypes.
    pub fn validate(&self) -> LoadResult<()> {
        for id in self.table.ids() {
            let Some(upgrade) = self.table.prototype(id).and_then(|p| p.upgrade.as_ref()) else {
                continue;
            };
            for (level, replacement) in &upgrade.levels {
                if self.table.prototype(replacement).is_none() {
                    anyhow::bail!(
                        "prototype '{}' upgrades to unknown '{}' at level {}",
                        id,
                        replacement,
                        level
                    );
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ActionPrototype> {
        self.table.prototype(&PrototypeId::from(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = &PrototypeId> + '_ {
        self.table.ids()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn table(&self) -> &PrototypeTable {
        &self.table
    }

    pub fn into_table(self) -> PrototypeTable {
        self.table
    }
}

impl PrototypeOracle for PrototypeRegistry {
    fn prototype(&self, id: &PrototypeId) -> Option<&ActionPrototype> {
        self.table.prototype(id)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actions_core::{ActionKind, KindTag};

    use super::*;

    #[test]
    fn embedded_catalogs_load() {
        let registry = PrototypeRegistry::load_embedded().expect("embedded catalogs");

        let blink = registry.get("Blink").unwrap();
        assert_eq!(blink.kind.tag(), KindTag::Instant);
        assert_eq!(blink.use_delay(), Some(Duration::from_secs(2)));

        let smite = registry.get("Smite").unwrap();
        let ActionKind::EntityTarget(params) = &smite.kind else {
            panic!("Smite should be entity-targeted");
        };
        assert!(!params.can_target_self);
        assert!(params.whitelist.is_some());

        assert!(registry.get("ToggleCombatMode").unwrap().client_exclusive);
        assert_eq!(
            registry.get("Fireball").unwrap().upgrade.as_ref().unwrap().max_level(),
            Some(3)
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let source = r#"(prototypes: [(id: "Blink"), (id: "Blink")])"#;
        let err = PrototypeRegistry::from_ron_str(source).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn unknown_upgrade_target_is_rejected() {
        let source = r#"(prototypes: [
            (id: "Spark", upgrade: Some((level: 1, levels: {2: "Inferno"}))),
        ])"#;
        assert!(PrototypeRegistry::from_ron_str(source).is_err());
    }

    #[test]
    fn defaults_fill_omitted_fields() {
        let registry = PrototypeRegistry::from_ron_str(r#"(prototypes: [(id: "Wave")])"#).unwrap();
        let wave = registry.get("Wave").unwrap();
        assert_eq!(wave.name, "Wave");
        assert!(wave.enabled);
        assert!(wave.check_can_interact);
        assert_eq!(wave.kind, ActionKind::Instant);
    }
}
