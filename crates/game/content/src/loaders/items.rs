//! Item kit loader.
//!
//! An item kit names the action prototypes an item provides while it is
//! equipped in one of its slots. The runtime binds a kit to a concrete item
//! entity when the item is spawned.

use std::path::Path;

use actions_core::action::ProvidedActions;
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, PrototypeRegistry, read_file};

/// One item archetype and the actions it provides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemKit {
    pub name: String,
    pub provides: ProvidedActions,
}

/// Item kit catalog structure for RON files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemKitCatalog {
    pub items: Vec<ItemKit>,
}

impl ItemKitCatalog {
    pub fn get(&self, name: &str) -> Option<&ItemKit> {
        self.items.iter().find(|kit| kit.name == name)
    }

    /// Checks that every kit only names prototypes known to `registry`.
    pub fn validate(&self, registry: &PrototypeRegistry) -> LoadResult<()> {
        for kit in &self.items {
            if kit.provides.slots.is_empty() {
                anyhow::bail!("item kit '{}' provides actions in no slot", kit.name);
            }
            for prototype in &kit.provides.prototypes {
                if registry.get(prototype.as_str()).is_none() {
                    anyhow::bail!(
                        "item kit '{}' references unknown prototype '{}'",
                        kit.name,
                        prototype
                    );
                }
            }
        }
        Ok(())
    }
}

/// Loader for item kits from RON files.
pub struct ItemKitLoader;

impl ItemKitLoader {
    /// Load an item kit catalog from a RON file.
    pub fn load(path: &Path) -> LoadResult<ItemKitCatalog> {
        let content = read_file(path)?;
        Self::from_ron_str(&content)
    }

    pub fn from_ron_str(content: &str) -> LoadResult<ItemKitCatalog> {
        ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse item kit RON: {}", e))
    }

    /// Loads the kit catalog embedded in the crate.
    pub fn load_embedded() -> LoadResult<ItemKitCatalog> {
        Self::from_ron_str(include_str!("../../data/items.ron"))
    }
}

#[cfg(test)]
mod tests {
    use actions_core::SlotFlags;

    use super::*;

    #[test]
    fn embedded_kits_reference_known_prototypes() {
        let registry = PrototypeRegistry::load_embedded().unwrap();
        let kits = ItemKitLoader::load_embedded().unwrap();
        kits.validate(&registry).unwrap();

        let visor = kits.get("WeldingVisor").unwrap();
        assert!(visor.provides.slots.contains(SlotFlags::HEAD));
        assert!(!visor.provides.slots.intersects(SlotFlags::HANDS));
    }

    #[test]
    fn slots_parse_from_flag_names() {
        let kits = ItemKitLoader::from_ron_str(
            r#"(items: [(name: "Lamp", provides: (slots: "HANDS | BELT|POCKET", prototypes: ["ToggleLight"]))])"#,
        )
        .unwrap();

        assert_eq!(
            kits.get("Lamp").unwrap().provides.slots,
            SlotFlags::HANDS | SlotFlags::BELT | SlotFlags::POCKET
        );
    }

    #[test]
    fn kits_without_slots_are_rejected() {
        let kits = ItemKitLoader::from_ron_str(
            r#"(items: [(name: "Rock", provides: (slots: "", prototypes: []))])"#,
        )
        .unwrap();
        assert!(kits.validate(&PrototypeRegistry::new()).is_err());
    }
}
