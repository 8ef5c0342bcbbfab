//! 动作注册表：保存所有动作及其能力描述，按作用域/几何类别查找。
//!
//! 顺序即注册顺序，也就是菜单顺序。

use indexmap::IndexMap;
use tracing::{debug, error};

use crate::action::MapAction;
use crate::capability::{CapabilityDescriptor, GeometryTag, Scope};
use crate::error::ConfigurationError;

pub struct RegistryEntry {
    pub descriptor: CapabilityDescriptor,
    pub action: Box<dyn MapAction>,
}

#[derive(Default)]
pub struct ActionRegistry {
    entries: IndexMap<String, RegistryEntry>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个动作。重复 id 报错并保留先注册的那个。
    pub fn register(&mut self, action: Box<dyn MapAction>) -> Result<(), ConfigurationError> {
        let descriptor = CapabilityDescriptor::try_from(action.declaration())?;
        if self.entries.contains_key(&descriptor.action_id) {
            return Err(ConfigurationError::DuplicateActionId(descriptor.action_id));
        }
        debug!(
            action_id = %descriptor.action_id,
            scope = %descriptor.scope,
            "registered action"
        );
        self.entries
            .insert(descriptor.action_id.clone(), RegistryEntry { descriptor, action });
        Ok(())
    }

    /// 批量注册；失败的动作被排除，其余照常注册。
    pub fn register_all<I>(&mut self, actions: I) -> Vec<ConfigurationError>
    where
        I: IntoIterator<Item = Box<dyn MapAction>>,
    {
        let mut errors = Vec::new();
        for action in actions {
            if let Err(err) = self.register(action) {
                error!(%err, "action registration failed");
                errors.push(err);
            }
        }
        errors
    }

    pub fn find_applicable(&self, scope: Scope, tag: GeometryTag) -> Vec<&str> {
        self.entries
            .values()
            .filter(|e| e.descriptor.matches(scope, tag))
            .map(|e| e.descriptor.action_id.as_str())
            .collect()
    }

    /// 返回之前的值；未知 id 返回 None。
    pub fn set_enabled(&mut self, action_id: &str, enabled: bool) -> Option<bool> {
        let entry = self.entries.get_mut(action_id)?;
        Some(std::mem::replace(&mut entry.descriptor.enabled, enabled))
    }

    pub fn descriptor(&self, action_id: &str) -> Option<&CapabilityDescriptor> {
        self.entries.get(action_id).map(|e| &e.descriptor)
    }

    pub fn get(&self, action_id: &str) -> Option<&RegistryEntry> {
        self.entries.get(action_id)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &CapabilityDescriptor> {
        self.entries.values().map(|e| &e.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
