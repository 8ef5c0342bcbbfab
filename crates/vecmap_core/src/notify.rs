//! 通知与对话框端口。
//!
//! 对话框取消用 `None` 表示，不作为错误处理。

use indexmap::IndexMap;

use crate::settings::SettingValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

pub trait Notifier {
    fn show_info(&mut self, title: &str, text: &str);

    fn show_warning(&mut self, title: &str, text: &str);

    fn show_error(&mut self, title: &str, text: &str);

    /// 是/否确认。
    fn confirm_action(&mut self, title: &str, text: &str) -> bool;

    fn show(&mut self, level: NoticeLevel, title: &str, text: &str) {
        match level {
            NoticeLevel::Info => self.show_info(title, text),
            NoticeLevel::Warning => self.show_warning(title, text),
            NoticeLevel::Error => self.show_error(title, text),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldInput {
    Bool(bool),
    Int {
        default: i64,
        min: i64,
        max: i64,
    },
    Float {
        default: f64,
        min: f64,
        max: f64,
        decimals: u32,
    },
    Text(String),
    Choice {
        default: String,
        options: Vec<String>,
    },
    /// 文件路径；`save = true` 表示另存为。
    Path {
        default: String,
        save: bool,
    },
}

impl FieldInput {
    pub fn default_value(&self) -> SettingValue {
        match self {
            Self::Bool(b) => SettingValue::Bool(*b),
            Self::Int { default, .. } => SettingValue::Int(*default),
            Self::Float { default, .. } => SettingValue::Float(*default),
            Self::Text(s) | Self::Choice { default: s, .. } | Self::Path { default: s, .. } => {
                SettingValue::Str(s.clone())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DialogField {
    pub name: String,
    pub label: String,
    pub input: FieldInput,
}

/// 动作的参数表单。
#[derive(Clone, Debug, PartialEq)]
pub struct DialogForm {
    pub title: String,
    pub message: String,
    pub fields: Vec<DialogField>,
}

impl DialogForm {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: String::new(),
            fields: Vec::new(),
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn field(mut self, name: &str, label: &str, input: FieldInput) -> Self {
        self.fields.push(DialogField {
            name: name.to_string(),
            label: label.to_string(),
            input,
        });
        self
    }

    pub fn float(self, name: &str, label: &str, default: f64, min: f64, max: f64) -> Self {
        self.field(
            name,
            label,
            FieldInput::Float {
                default: default.clamp(min, max),
                min,
                max,
                decimals: 2,
            },
        )
    }

    pub fn int(self, name: &str, label: &str, default: i64, min: i64, max: i64) -> Self {
        self.field(
            name,
            label,
            FieldInput::Int {
                default: default.clamp(min, max),
                min,
                max,
            },
        )
    }

    pub fn checkbox(self, name: &str, label: &str, default: bool) -> Self {
        self.field(name, label, FieldInput::Bool(default))
    }

    pub fn choice(self, name: &str, label: &str, default: &str, options: Vec<String>) -> Self {
        self.field(
            name,
            label,
            FieldInput::Choice {
                default: default.to_string(),
                options,
            },
        )
    }

    pub fn defaults(&self) -> DialogValues {
        DialogValues {
            values: self
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.input.default_value()))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DialogValues {
    values: IndexMap<String, SettingValue>,
}

impl DialogValues {
    pub fn set(&mut self, name: &str, value: impl Into<SettingValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn with(mut self, name: &str, value: impl Into<SettingValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.values.get(name)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(SettingValue::as_f64)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(SettingValue::as_i64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(SettingValue::as_bool)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(SettingValue::as_str)
    }
}

pub trait Prompt {
    /// `None` 表示用户取消。
    fn request(&mut self, form: &DialogForm) -> Option<DialogValues>;
}

/// 不弹窗，直接接受表单默认值。
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptDefaults;

impl Prompt for AcceptDefaults {
    fn request(&mut self, form: &DialogForm) -> Option<DialogValues> {
        Some(form.defaults())
    }
}
