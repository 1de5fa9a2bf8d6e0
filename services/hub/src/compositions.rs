//! Saved compositions
//!
//! Compositions are opaque JSON documents created on the web renderer and
//! browsed from the gallery. The controller keeps the list in memory; every
//! change is handed to a writer task that persists snapshots in order, so
//! the controller loop never waits on the disk.

use crate::error::{HubError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Persistence for the composition list.
#[async_trait]
pub trait CompositionStore: Send + Sync + 'static {
    async fn load(&self) -> Result<Vec<Value>>;
    async fn save(&self, items: &[Value]) -> Result<()>;
}

/// Compositions stored as one JSON array in a file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CompositionStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Value>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No compositions file at {:?}, starting empty", self.path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&contents)? {
            Value::Array(items) => Ok(items),
            _ => Err(HubError::store(format!(
                "{:?} does not hold a JSON array",
                self.path
            ))),
        }
    }

    async fn save(&self, items: &[Value]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        // Write then rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(items)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Saved {} compositions to {:?}", items.len(), self.path);
        Ok(())
    }
}

/// In-memory composition list with write-behind persistence.
#[derive(Debug)]
pub struct CompositionLibrary {
    items: Vec<Value>,
    saver: Option<mpsc::UnboundedSender<Vec<Value>>>,
}

impl CompositionLibrary {
    /// Load the saved list and start the writer task.
    pub async fn open<S: CompositionStore>(store: S) -> Result<(Self, JoinHandle<()>)> {
        let items = store.load().await?;
        info!("Loaded {} compositions", items.len());

        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Value>>();
        let writer = tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                if let Err(e) = store.save(&snapshot).await {
                    error!("Failed to save compositions: {}", e);
                }
            }
            debug!("Composition writer stopped");
        });

        Ok((
            Self {
                items,
                saver: Some(tx),
            },
            writer,
        ))
    }

    /// A library that never touches the disk.
    pub fn in_memory(items: Vec<Value>) -> Self {
        Self { items, saver: None }
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// The list as sent to the gallery.
    pub fn to_value(&self) -> Value {
        Value::Array(self.items.clone())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a new composition, giving it an `id` if it has none.
    /// Returns the id, or `None` for a payload that is not an object.
    pub fn add(&mut self, mut composition: Value) -> Option<String> {
        if !composition.is_object() {
            warn!("Ignoring composition that is not a JSON object: {}", composition);
            return None;
        }
        let map = composition.as_object_mut()?;
        let id = match map.get("id").and_then(id_string) {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                map.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };
        self.items.push(composition);
        info!("Composition {} added ({} total)", id, self.items.len());
        self.persist();
        Some(id)
    }

    /// Replace the composition with the same `id`, or append it when no
    /// such composition exists yet.
    pub fn update(&mut self, composition: Value) -> Option<String> {
        let Some(id) = composition.get("id").and_then(id_string) else {
            warn!("Composition update without an id, treating it as new");
            return self.add(composition);
        };
        let existing = self
            .items
            .iter_mut()
            .find(|item| item.get("id").and_then(id_string).as_deref() == Some(id.as_str()));
        match existing {
            Some(slot) => {
                *slot = composition;
                info!("Composition {} updated", id);
            }
            None => {
                self.items.push(composition);
                info!("Composition {} was unknown, appended", id);
            }
        }
        self.persist();
        Some(id)
    }

    fn persist(&self) {
        if let Some(saver) = &self.saver {
            if saver.send(self.items.clone()).is_err() {
                error!("Composition writer is gone, changes will not be saved");
            }
        }
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("none.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/compositions.json"));
        store.save(&[json!({"id": "a"}), json!({"id": "b"})]).await.unwrap();
        let items = store.load().await.unwrap();
        assert_eq!(items, vec![json!({"id": "a"}), json!({"id": "b"})]);
    }

    #[tokio::test]
    async fn test_non_array_document_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, "{\"id\": 1}").await.unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).load().await,
            Err(HubError::Store { .. })
        ));
    }

    #[test]
    fn test_add_assigns_id() {
        let mut library = CompositionLibrary::in_memory(Vec::new());
        let id = library.add(json!({"name": "first"})).unwrap();
        assert_eq!(library.items()[0]["id"], json!(id));
        assert_eq!(library.add(json!({"id": 7})).as_deref(), Some("7"));
        assert!(library.add(json!("not an object")).is_none());
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn test_update_replaces_or_appends() {
        let mut library = CompositionLibrary::in_memory(vec![json!({"id": "a", "v": 1})]);
        library.update(json!({"id": "a", "v": 2}));
        assert_eq!(library.items(), &[json!({"id": "a", "v": 2})]);

        library.update(json!({"id": "b"}));
        assert_eq!(library.len(), 2);
    }

    #[tokio::test]
    async fn test_changes_are_written_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("compositions.json");
        let (mut library, writer) = CompositionLibrary::open(JsonFileStore::new(&path))
            .await
            .unwrap();

        library.add(json!({"id": "x"}));
        library.update(json!({"id": "x", "tempo": 90}));
        drop(library);
        writer.await.unwrap();

        let saved = JsonFileStore::new(&path).load().await.unwrap();
        assert_eq!(saved, vec![json!({"id": "x", "tempo": 90})]);
    }
}
