//! Filesystem-style navigation over the cached controller config
//!
//! The shell keeps the last `nodes` and `active` listings in a single JSON
//! tree and lets the user walk it with `cd`, `ls` and `pwd`. Controller
//! listings are usually JSON arrays, so every subtree is normalized into a
//! mapping on the way in.

use serde_json::{Map, Value};

use janus_core::types::scalar_string;

/// Errors raised while walking the config tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavError {
    /// A segment named a key the subtree does not have.
    ///
    /// `position` counts non-empty segments from 1 and `path` is the prefix
    /// that actually resolved, with `..` already applied.
    #[error("No such path through config at pos: {position} {key} in {path}")]
    NoSuchPath {
        position: usize,
        key: String,
        path: String,
    },

    /// The path resolved to a scalar value
    #[error("Not a directory: {key} in {path}")]
    NotADirectory { key: String, path: String },
}

/// One line of `ls` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub display: String,
    pub is_dir: bool,
}

/// Current position in the config tree plus the tree itself
#[derive(Debug, Clone)]
pub struct Navigator {
    root: Value,
    cwd: Vec<String>,
    cwc: Value,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    /// An empty tree with the `active` and `nodes` sections
    pub fn new() -> Self {
        let mut root = Map::new();
        root.insert("active".into(), Value::Object(Map::new()));
        root.insert("nodes".into(), Value::Object(Map::new()));
        let root = Value::Object(root);
        Self {
            cwc: root.clone(),
            root,
            cwd: Vec::new(),
        }
    }

    /// Replace a top level section and re-resolve the current path
    pub fn set_section(&mut self, name: &str, value: Value) {
        if let Some(root) = self.root.as_object_mut() {
            root.insert(name.to_string(), value);
        }
        self.resync();
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Walk `segments` from the root without touching navigator state.
    ///
    /// Returns the normalized subtree and the collapsed path leading to it.
    pub fn resolve<S: AsRef<str>>(&self, segments: &[S]) -> Result<(Value, Vec<String>), NavError> {
        let mut stack: Vec<(Value, String)> = Vec::new();
        let mut cwc = normalize(&self.root);
        let mut position = 0;

        for seg in segments.iter().map(AsRef::as_ref) {
            if seg.is_empty() {
                continue;
            }
            position += 1;

            if seg == ".." {
                if let Some((prev, _)) = stack.pop() {
                    cwc = prev;
                }
                continue;
            }

            let next = match cwc.get(seg) {
                Some(child) => normalize(child),
                None => {
                    return Err(NavError::NoSuchPath {
                        position,
                        key: seg.to_string(),
                        path: join_path(stack.iter().map(|(_, k)| k.as_str())),
                    })
                }
            };
            let prev = std::mem::replace(&mut cwc, next);
            stack.push((prev, seg.to_string()));
        }

        Ok((cwc, stack.into_iter().map(|(_, k)| k).collect()))
    }

    /// Change directory. An empty path or a leading `/` starts at the root.
    ///
    /// On error the current path and view are left unchanged.
    pub fn cd(&mut self, path: &str) -> Result<(), NavError> {
        let segments: Vec<&str> = if path.is_empty() || path.starts_with('/') {
            path.split('/').collect()
        } else {
            self.cwd
                .iter()
                .map(String::as_str)
                .chain(path.split('/'))
                .collect()
        };

        let (view, cwd) = self.resolve(segments.as_slice())?;
        if !view.is_object() {
            let key = cwd.last().cloned().unwrap_or_default();
            let parent = join_path(cwd.iter().take(cwd.len().saturating_sub(1)).map(String::as_str));
            return Err(NavError::NotADirectory { key, path: parent });
        }

        self.cwd = cwd;
        self.cwc = view;
        Ok(())
    }

    /// Re-resolve the current path, falling back to the root if it vanished
    pub fn resync(&mut self) {
        match self.resolve(self.cwd.as_slice()) {
            Ok((view, cwd)) if view.is_object() => {
                self.cwc = view;
                self.cwd = cwd;
            }
            _ => {
                tracing::debug!(path = %self.pwd(), "current path gone, back to root");
                self.cwd.clear();
                self.cwc = normalize(&self.root);
            }
        }
    }

    pub fn pwd(&self) -> String {
        join_path(self.cwd.iter().map(String::as_str))
    }

    pub fn cwd(&self) -> &[String] {
        &self.cwd
    }

    /// Normalized view of the current directory
    pub fn current(&self) -> &Value {
        &self.cwc
    }

    pub fn child(&self, key: &str) -> Option<&Value> {
        self.cwc.get(key)
    }

    /// First entry of the current view whose `name` field matches
    pub fn find_named(&self, name: &str) -> Option<&Value> {
        self.cwc
            .as_object()?
            .values()
            .find(|v| v.get("name").and_then(Value::as_str) == Some(name))
    }

    /// The current view rendered for `ls`
    pub fn entries(&self) -> Vec<Entry> {
        let Some(map) = self.cwc.as_object() else {
            return Vec::new();
        };
        map.iter().map(|(k, v)| describe(k, v)).collect()
    }

    /// Keys of the current view starting with `prefix`
    pub fn completions(&self, prefix: &str) -> Vec<String> {
        self.cwc
            .as_object()
            .map(|m| {
                m.keys()
                    .filter(|k| k.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop `key` from the current view and from the backing tree
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.cwc.as_object_mut()?.remove(key)?;

        let mut node = &mut self.root;
        for seg in &self.cwd {
            normalize_in_place(node);
            node = match node.get_mut(seg.as_str()) {
                Some(child) => child,
                None => return Some(removed),
            };
        }
        normalize_in_place(node);
        if let Some(map) = node.as_object_mut() {
            map.remove(key);
        }
        Some(removed)
    }
}

fn describe(key: &str, value: &Value) -> Entry {
    if !(value.is_object() || value.is_array()) {
        return Entry {
            key: key.to_string(),
            display: format!("{key}: {}", scalar_string(value)),
            is_dir: false,
        };
    }

    let display = if let Some(name) = value.get("name") {
        format!("{key}:\t({})", scalar_string(name))
    } else if let Some(request) = value.get("request") {
        let first = request.get(0);
        let field = |v: Option<&Value>, f: &str| {
            v.and_then(|v| v.get(f)).map(scalar_string).unwrap_or_default()
        };
        format!(
            "{key}: {}\t({}, {})",
            field(Some(value), "state"),
            field(first, "instances"),
            field(first, "image")
        )
    } else {
        key.to_string()
    };

    Entry {
        key: key.to_string(),
        display,
        is_dir: true,
    }
}

fn join_path<'a>(segments: impl Iterator<Item = &'a str>) -> String {
    format!("/{}", segments.collect::<Vec<_>>().join("/"))
}

/// Turn a list-shaped listing into a mapping.
///
/// * objects with an `id` are keyed by the stringified id
/// * objects without one contribute their own keys
/// * anything else is keyed by its position
///
/// Non-list values are returned unchanged.
pub fn normalize(value: &Value) -> Value {
    let Value::Array(items) = value else {
        return value.clone();
    };

    let mut map = Map::new();
    for (idx, item) in items.iter().enumerate() {
        match item {
            Value::Object(obj) => match obj.get("id") {
                Some(id) => {
                    map.insert(scalar_string(id), item.clone());
                }
                None => {
                    for (k, v) in obj {
                        map.insert(k.clone(), v.clone());
                    }
                }
            },
            other => {
                map.insert(idx.to_string(), other.clone());
            }
        }
    }
    Value::Object(map)
}

fn normalize_in_place(value: &mut Value) {
    if value.is_array() {
        *value = normalize(value);
    }
}
