//! Archetype loader.
//!
//! Reads one JSON file per archetype from a kind directory under the data
//! root (`tiles/cobblestone-floor.json` becomes `tile:cobblestone-floor`).

use std::path::{Path, PathBuf};

use delver_domain::{
    Archetype, ArchetypeKind, ArmorArchetype, Catalog, CharacterArchetype, DoorArchetype,
    ItemArchetype, Namespaces, TileArchetype, WeaponArchetype,
};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Archetype root {path} is not readable: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn parse(kind: ArchetypeKind, content: &str) -> Result<Archetype, serde_json::Error> {
    Ok(match kind {
        ArchetypeKind::Character => {
            Archetype::Character(serde_json::from_str::<CharacterArchetype>(content)?)
        }
        ArchetypeKind::Weapon => Archetype::Weapon(serde_json::from_str::<WeaponArchetype>(content)?),
        ArchetypeKind::Armor => Archetype::Armor(serde_json::from_str::<ArmorArchetype>(content)?),
        ArchetypeKind::Item => Archetype::Item(serde_json::from_str::<ItemArchetype>(content)?),
        ArchetypeKind::Tile => Archetype::Tile(serde_json::from_str::<TileArchetype>(content)?),
        ArchetypeKind::Door => Archetype::Door(serde_json::from_str::<DoorArchetype>(content)?),
    })
}

/// `*.json` files of one directory, sorted so load order is stable.
async fn json_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every archetype below `root` into a catalog.
///
/// Missing kind directories and malformed files are skipped with a warning.
pub async fn load_archetypes(root: &Path, namespaces: &Namespaces) -> Result<Catalog, CatalogError> {
    fs::read_dir(root)
        .await
        .map_err(|source| CatalogError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;

    let mut catalog = Catalog::new();
    for kind in ArchetypeKind::ALL {
        let dir = root.join(kind.directory());
        let files = match json_files(&dir).await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Skipping archetype directory");
                continue;
            }
        };

        for path in files {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Skipping unreadable archetype");
                    continue;
                }
            };
            let mut archetype = match parse(kind, &content) {
                Ok(archetype) => archetype,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Skipping malformed archetype");
                    continue;
                }
            };
            archetype.tag_image(kind.directory());
            let id = namespaces.content_id(&format!("{}:{}", kind.prefix(), stem));
            catalog.insert(id, archetype);
        }
    }

    tracing::info!(root = %root.display(), archetypes = catalog.len(), "Archetypes loaded");
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use delver_domain::BlockKind;

    use super::*;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, content).expect("write");
    }

    #[tokio::test]
    async fn loads_each_kind_with_prefixed_ids_and_images() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            dir.path(),
            "tiles/cobblestone-floor.json",
            r#"{"title":"Cobblestone","image":"cobble.png","blocks":"none"}"#,
        );
        write(
            dir.path(),
            "characters/fighter.json",
            r#"{"title":"Fighter","health":14,"damage":{"min":1,"max":4}}"#,
        );
        write(dir.path(), "doors/oak.json", r#"{"title":"Oak door","locked":true}"#);
        let ns = Namespaces::default();

        let catalog = load_archetypes(dir.path(), &ns).await.expect("load");

        assert_eq!(catalog.len(), 3);
        let floor = catalog
            .archetype(ns.content_id("tile:cobblestone-floor"))
            .expect("floor");
        assert_eq!(floor.image(), "tiles/cobble.png");
        assert_eq!(
            catalog.first_tile(BlockKind::None),
            Some(ns.content_id("tile:cobblestone-floor"))
        );
        let fighter = catalog
            .character(ns.content_id("character:fighter"))
            .expect("fighter");
        assert_eq!(fighter.health, 14);
        assert_eq!(catalog.door_archetypes().count(), 1);
    }

    #[tokio::test]
    async fn skips_malformed_files_and_other_extensions() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "items/torch.json", r#"{"title":"Torch"}"#);
        write(dir.path(), "items/broken.json", r#"{"title":"#);
        write(dir.path(), "items/notes.txt", "not an archetype");
        write(dir.path(), "armors/no-slot.json", r#"{"title":"Helm"}"#);
        let ns = Namespaces::default();

        let catalog = load_archetypes(dir.path(), &ns).await.expect("load");

        assert_eq!(catalog.len(), 1);
        assert!(catalog.archetype(ns.content_id("item:torch")).is_some());
    }

    #[tokio::test]
    async fn missing_root_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nowhere");

        let result = load_archetypes(&missing, &Namespaces::default()).await;

        assert!(matches!(result, Err(CatalogError::RootUnreadable { .. })));
    }
}
