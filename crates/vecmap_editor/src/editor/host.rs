//! 把核心的通知/对话框端口接到系统对话框（rfd）与 HUD 通知列表。
//!
//! rfd 只有消息框和文件框：参数表单显示为一个列出默认值的确认框，
//! 具体数值在 `assets/settings/actions.ron` 里调整；路径字段走文件对话框。

use bevy::log::{error, info, warn};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};

use vecmap_core::notify::{DialogForm, DialogValues, FieldInput, NoticeLevel, Notifier, Prompt};

use crate::editor::types::NoticeLog;

pub struct BevyNotifier<'a> {
    log: &'a mut NoticeLog,
    native: bool,
}

impl<'a> BevyNotifier<'a> {
    pub fn new(log: &'a mut NoticeLog, native: bool) -> Self {
        Self { log, native }
    }

    fn notice(&mut self, level: NoticeLevel, title: &str, text: &str) {
        match level {
            NoticeLevel::Info => info!("{title}: {text}"),
            NoticeLevel::Warning => warn!("{title}: {text}"),
            NoticeLevel::Error => error!("{title}: {text}"),
        }
        self.log.push(level, format!("{title}: {text}"));
        if self.native {
            let rfd_level = match level {
                NoticeLevel::Info => MessageLevel::Info,
                NoticeLevel::Warning => MessageLevel::Warning,
                NoticeLevel::Error => MessageLevel::Error,
            };
            MessageDialog::new()
                .set_level(rfd_level)
                .set_title(title)
                .set_description(text)
                .set_buttons(MessageButtons::Ok)
                .show();
        }
    }
}

impl Notifier for BevyNotifier<'_> {
    fn show_info(&mut self, title: &str, text: &str) {
        self.notice(NoticeLevel::Info, title, text);
    }

    fn show_warning(&mut self, title: &str, text: &str) {
        self.notice(NoticeLevel::Warning, title, text);
    }

    fn show_error(&mut self, title: &str, text: &str) {
        self.notice(NoticeLevel::Error, title, text);
    }

    fn confirm_action(&mut self, title: &str, text: &str) -> bool {
        if !self.native {
            info!("auto-confirm: {title}");
            return true;
        }
        let answer = MessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title(title)
            .set_description(text)
            .set_buttons(MessageButtons::YesNo)
            .show();
        matches!(answer, MessageDialogResult::Yes | MessageDialogResult::Ok)
    }
}

pub struct DialogPrompt {
    native: bool,
}

impl DialogPrompt {
    pub fn new(native: bool) -> Self {
        Self { native }
    }
}

fn describe(form: &DialogForm, values: &DialogValues) -> String {
    let mut text = form.message.clone();
    for field in &form.fields {
        if matches!(field.input, FieldInput::Path { .. }) {
            continue;
        }
        let value = values
            .get(&field.name)
            .map(ToString::to_string)
            .unwrap_or_default();
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&format!("{}: {value}", field.label));
    }
    text
}

impl Prompt for DialogPrompt {
    fn request(&mut self, form: &DialogForm) -> Option<DialogValues> {
        let mut values = form.defaults();
        if !self.native {
            return Some(values);
        }

        for field in &form.fields {
            let FieldInput::Path { default, save } = &field.input else {
                continue;
            };
            let dialog = FileDialog::new()
                .set_title(&field.label)
                .add_filter("RON", &["ron"])
                .set_file_name(default);
            let picked = if *save { dialog.save_file() } else { dialog.pick_file() };
            // 文件框取消 = 整个表单取消
            let path = picked?;
            values.set(&field.name, path.display().to_string());
        }

        let has_visible_fields = form
            .fields
            .iter()
            .any(|f| !matches!(f.input, FieldInput::Path { .. }));
        if !has_visible_fields && form.message.is_empty() {
            return Some(values);
        }

        let answer = MessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title(&form.title)
            .set_description(describe(form, &values))
            .set_buttons(MessageButtons::OkCancel)
            .show();
        matches!(answer, MessageDialogResult::Ok | MessageDialogResult::Yes).then_some(values)
    }
}
