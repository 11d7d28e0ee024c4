//! Data-element plugins and their per-identifier composition.
//!
//! # Responsibility
//! - Define the contract that describes one kind of element (label, icon,
//!   tags every such element must carry).
//! - Merge every plugin able to represent an identifier into one view.
//!
//! # Invariants
//! - Plugins are consulted in descending priority; ties keep registration
//!   order.
//! - Only one plugin per `data_type` is kept: the highest version.
//! - Composed mandatory tags are normalized and never contain duplicates.

use crate::model::element::normalize_tag;
use std::path::Path;

/// Describes one kind of element, e.g. files, image sequences or assets.
///
/// Every method except `data_type` and `can_represent` has a neutral default.
pub trait ElementPlugin {
    /// Stable name of this element kind.
    fn data_type(&self) -> &str;
    /// Plugins sharing a `data_type` are replaced by the highest version.
    fn version(&self) -> u32 {
        1
    }
    /// Higher values are consulted first.
    fn priority(&self) -> i32 {
        1
    }
    fn can_represent(&self, identifier: &str) -> bool;
    fn label(&self, _identifier: &str) -> Option<String> {
        None
    }
    fn icon(&self, _identifier: &str) -> Option<String> {
        None
    }
    /// Tags a scan attaches to every element this plugin represents.
    fn mandatory_tags(&self, _identifier: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Composite view of an identifier across all plugins that represent it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementDescription {
    pub identifier: String,
    /// Contributing plugins, highest priority first.
    pub data_types: Vec<String>,
    /// First non-empty label.
    pub label: Option<String>,
    /// First non-empty icon.
    pub icon: Option<String>,
    pub mandatory_tags: Vec<String>,
}

/// Priority-ordered element plugin set.
#[derive(Default)]
pub struct ElementPlugins {
    plugins: Vec<Box<dyn ElementPlugin>>,
}

impl ElementPlugins {
    /// Adds `plugin` unless a higher version of its `data_type` is present.
    pub fn register(&mut self, plugin: Box<dyn ElementPlugin>) {
        if let Some(idx) = self
            .plugins
            .iter()
            .position(|existing| existing.data_type() == plugin.data_type())
        {
            if self.plugins[idx].version() > plugin.version() {
                return;
            }
            self.plugins.remove(idx);
        }
        self.plugins.push(plugin);
        // Stable sort, so equal priorities stay in registration order.
        self.plugins
            .sort_by_key(|plugin| std::cmp::Reverse(plugin.priority()));
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Composes every plugin able to represent `identifier`.
    ///
    /// Returns `None` when no plugin can.
    pub fn describe(&self, identifier: &str) -> Option<ElementDescription> {
        let mut description: Option<ElementDescription> = None;
        for plugin in self
            .plugins
            .iter()
            .filter(|plugin| plugin.can_represent(identifier))
        {
            let current = description.get_or_insert_with(|| ElementDescription {
                identifier: identifier.to_string(),
                ..ElementDescription::default()
            });
            current.data_types.push(plugin.data_type().to_string());
            if current.label.is_none() {
                current.label = plugin.label(identifier).filter(|label| !label.is_empty());
            }
            if current.icon.is_none() {
                current.icon = plugin.icon(identifier).filter(|icon| !icon.is_empty());
            }
            for tag in plugin.mandatory_tags(identifier) {
                if let Some(tag) = normalize_tag(&tag) {
                    if !current.mandatory_tags.contains(&tag) {
                        current.mandatory_tags.push(tag);
                    }
                }
            }
        }
        description
    }
}

/// Built-in plugin for local files: labels an element with its file name.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileElement;

impl ElementPlugin for FileElement {
    fn data_type(&self) -> &str {
        "file"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn can_represent(&self, identifier: &str) -> bool {
        Path::new(identifier).is_file()
    }

    fn label(&self, identifier: &str) -> Option<String> {
        Path::new(identifier)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}
