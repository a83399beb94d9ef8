//! Key-value access to a [`Config`] by historical key name.

use collections::IndexMap;

use crate::constants;
use crate::file::Config;
use crate::SettingsError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
        }
    }
}

/// Typed get/set of config values by key.
///
/// Getters return `None` for unknown keys and for keys of another type.
pub trait ConfigStore {
    fn get_string(&self, key: &str) -> Option<String>;
    fn get_int(&self, key: &str) -> Option<i64>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn set_string(&mut self, key: &str, value: &str) -> Result<(), SettingsError>;
    fn set_int(&mut self, key: &str, value: i64) -> Result<(), SettingsError>;
    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), SettingsError>;
}

impl Config {
    /// Every set key with its value, in file order.
    pub fn entries(&self) -> IndexMap<&'static str, Value> {
        let mut entries = IndexMap::default();
        entries.insert(
            "tilda_config_version",
            Value::String(self.tilda_config_version.clone()),
        );
        if let Some(key) = &self.key {
            entries.insert("key", Value::String(key.clone()));
        }
        entries.insert("title", Value::String(self.title.clone()));
        entries.insert("max_width", Value::Int(self.max_width));
        entries.insert("max_height", Value::Int(self.max_height));
        entries.insert("x_pos", Value::Int(self.x_pos));
        entries.insert("y_pos", Value::Int(self.y_pos));
        entries.insert(
            "centered_horizontally",
            Value::Bool(self.centered_horizontally),
        );
        entries.insert("centered_vertically", Value::Bool(self.centered_vertically));
        entries.insert("animation", Value::Bool(self.animation));
        entries.insert("slide_sleep_usec", Value::Int(self.slide_sleep_usec));
        entries.insert(
            "animation_orientation",
            Value::Int(self.animation_orientation),
        );
        entries.insert("pinned", Value::Bool(self.pinned));
        entries.insert("above", Value::Bool(self.above));
        entries.insert("hidden", Value::Bool(self.hidden));
        entries.insert(
            "auto_hide_on_focus_lost",
            Value::Bool(self.auto_hide_on_focus_lost),
        );
        entries
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries().swap_remove(key)
    }

    /// Set `key`, checking its type and range.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mismatch = |value: &Value, expected: &'static str| SettingsError::TypeMismatch {
            key: key.to_string(),
            expected,
            found: value.type_name(),
        };

        match (key, value) {
            ("key", Value::String(s)) => self.key = Some(checked_string(key, s)?),
            ("title", Value::String(s)) => self.title = checked_string(key, s)?,
            ("tilda_config_version", Value::String(s)) => self.tilda_config_version = s,
            ("max_width", Value::Int(i)) => self.max_width = checked_size(key, i)?,
            ("max_height", Value::Int(i)) => self.max_height = checked_size(key, i)?,
            ("x_pos", Value::Int(i)) => self.x_pos = i,
            ("y_pos", Value::Int(i)) => self.y_pos = i,
            ("slide_sleep_usec", Value::Int(i)) => {
                if i < 0 {
                    return Err(invalid(key, "must not be negative"));
                }
                self.slide_sleep_usec = i;
            }
            ("animation_orientation", Value::Int(i)) => {
                if !(0..=constants::animation::MAX_ORIENTATION).contains(&i) {
                    return Err(invalid(key, "must be 0 (top), 1 (bottom), 2 (left) or 3 (right)"));
                }
                self.animation_orientation = i;
            }
            ("centered_horizontally", Value::Bool(b)) => self.centered_horizontally = b,
            ("centered_vertically", Value::Bool(b)) => self.centered_vertically = b,
            ("animation", Value::Bool(b)) => self.animation = b,
            ("pinned", Value::Bool(b)) => self.pinned = b,
            ("above", Value::Bool(b)) => self.above = b,
            ("hidden", Value::Bool(b)) => self.hidden = b,
            ("auto_hide_on_focus_lost", Value::Bool(b)) => self.auto_hide_on_focus_lost = b,
            (_, value) => {
                return Err(match Config::default().get(key).or_else(|| string_key(key)) {
                    Some(expected) => mismatch(&value, expected.type_name()),
                    None => SettingsError::UnknownKey(key.to_string()),
                })
            }
        }
        Ok(())
    }
}

/// Keys that are valid but may be absent from [`Config::entries`].
fn string_key(key: &str) -> Option<Value> {
    (key == "key").then(|| Value::String(String::new()))
}

fn checked_string(key: &str, value: String) -> Result<String, SettingsError> {
    if value.len() > constants::settings::MAX_STRING_LENGTH {
        return Err(invalid(key, "is too long"));
    }
    Ok(value)
}

fn checked_size(key: &str, value: i64) -> Result<i64, SettingsError> {
    if value <= 0 {
        return Err(invalid(key, "must be positive"));
    }
    Ok(value)
}

fn invalid(key: &str, reason: &str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

impl ConfigStore for Config {
    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.set(key, Value::String(value.to_string()))
    }

    fn set_int(&mut self, key: &str, value: i64) -> Result<(), SettingsError> {
        self.set(key, Value::Int(value))
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), SettingsError> {
        self.set(key, Value::Bool(value))
    }
}
