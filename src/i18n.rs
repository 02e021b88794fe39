//! English and Chinese UI strings.

use crate::maintenance::{MaintenanceError, Outcome, Progress, ServiceAction};
use crate::remote::RemoteError;

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Chinese,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Chinese => "zh",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Chinese => "中文",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "zh" | "zh-cn" | "zh_cn" | "cn" | "chinese" => Language::Chinese,
            _ => Language::English,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Language::English => Language::Chinese,
            Language::Chinese => Language::English,
        }
    }

    pub fn texts(&self) -> &'static Texts {
        match self {
            Language::English => &EN,
            Language::Chinese => &ZH,
        }
    }

    pub fn progress(&self, progress: &Progress) -> String {
        match (self, progress) {
            (Language::English, Progress::Connecting { host }) => format!("Connecting to {host}..."),
            (Language::Chinese, Progress::Connecting { host }) => format!("正在连接到 {host}..."),
            (Language::English, Progress::Service(ServiceAction::Stop)) => {
                "Stopping dent service...".to_string()
            }
            (Language::English, Progress::Service(ServiceAction::Start)) => {
                "Starting dent service...".to_string()
            }
            (Language::Chinese, Progress::Service(ServiceAction::Stop)) => {
                "正在停止 dent 服务...".to_string()
            }
            (Language::Chinese, Progress::Service(ServiceAction::Start)) => {
                "正在启动 dent 服务...".to_string()
            }
            (Language::English, Progress::MaskRenamed { backup }) => {
                format!("Renamed existing mask to {}", file_name(backup))
            }
            (Language::Chinese, Progress::MaskRenamed { backup }) => {
                format!("已将现有遮罩重命名为{}", file_name(backup))
            }
            (Language::English, Progress::NoExistingMask) => {
                "No existing mask found, proceeding with upload".to_string()
            }
            (Language::Chinese, Progress::NoExistingMask) => "未找到现有遮罩，继续上传".to_string(),
            (Language::English, Progress::Uploading { file_name }) => {
                format!("Uploading {file_name}...")
            }
            (Language::Chinese, Progress::Uploading { file_name }) => {
                format!("正在上传 {file_name}...")
            }
        }
    }

    /// Status line after a successful action.
    pub fn outcome_status(&self, outcome: &Outcome) -> &'static str {
        let t = self.texts();
        match outcome {
            Outcome::PixelSizesUpdated { .. } => t.pixel_sizes_updated,
            Outcome::MaskUploaded => t.mask_uploaded,
            Outcome::PowerSettingsUpdated { .. } => t.power_settings_updated,
        }
    }

    /// Dialog body after a successful action.
    pub fn outcome_message(&self, outcome: &Outcome) -> String {
        match (self, outcome) {
            (Language::English, Outcome::PixelSizesUpdated { x, y }) => {
                format!("Updated pixel sizes to X: {x}, Y: {y}")
            }
            (Language::Chinese, Outcome::PixelSizesUpdated { x, y }) => {
                format!("已更新像素尺寸 X: {x}, Y: {y}")
            }
            (Language::English, Outcome::MaskUploaded) => {
                "Mask image uploaded and renamed successfully".to_string()
            }
            (Language::Chinese, Outcome::MaskUploaded) => "遮罩图像上传并重命名成功".to_string(),
            (Language::English, Outcome::PowerSettingsUpdated { value }) => {
                format!("All power values set to {value}")
            }
            (Language::Chinese, Outcome::PowerSettingsUpdated { value }) => {
                format!("所有功率值已设置为 {value}")
            }
        }
    }

    /// Dialog body for a failed action.
    pub fn error_message(&self, err: &MaintenanceError) -> String {
        let t = self.texts();
        match err {
            MaintenanceError::InvalidJson { source, .. } => {
                format!("{}: {source}", t.invalid_json)
            }
            MaintenanceError::NotAnObject { .. } => format!("{}: {err}", t.invalid_json),
            MaintenanceError::Remote(RemoteError::MissingConnectionFields) => {
                t.fill_connection_fields.to_string()
            }
            MaintenanceError::LocalFileMissing(_) => format!("{}: {err}", t.select_mask_first),
            MaintenanceError::Remote(_) => err.to_string(),
        }
    }

    /// Status line for a failed action.
    pub fn error_status(&self, err: &MaintenanceError) -> String {
        let t = self.texts();
        if err.is_invalid_json() {
            format!("{}: {}", t.error_title, t.invalid_json)
        } else {
            format!("{}: {err}", t.error_title)
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

fn file_name(remote_path: &str) -> &str {
    remote_path.rsplit('/').next().unwrap_or(remote_path)
}

/// Fixed strings for one language.
#[derive(Debug)]
pub struct Texts {
    pub title: &'static str,
    pub connection_section: &'static str,
    pub host: &'static str,
    pub username: &'static str,
    pub password: &'static str,
    pub pixel_section: &'static str,
    pub pixel_x: &'static str,
    pub pixel_y: &'static str,
    pub update_pixel_sizes: &'static str,
    pub mask_section: &'static str,
    pub selected_file: &'static str,
    pub browse: &'static str,
    pub upload_mask: &'static str,
    pub power_section: &'static str,
    pub power_value: &'static str,
    pub update_power_settings: &'static str,
    pub ready: &'static str,
    pub in_progress: &'static str,
    pub warning_title: &'static str,
    pub error_title: &'static str,
    pub success_title: &'static str,
    pub another_in_progress: &'static str,
    pub select_mask_first: &'static str,
    pub fill_connection_fields: &'static str,
    pub invalid_json: &'static str,
    pub invalid_number: &'static str,
    pub pixel_sizes_updated: &'static str,
    pub mask_uploaded: &'static str,
    pub power_settings_updated: &'static str,
    pub select_mask_title: &'static str,
    pub png_files: &'static str,
    pub all_files: &'static str,
    pub form_hints: &'static str,
    pub browser_hints: &'static str,
    pub dialog_hints: &'static str,
}

static EN: Texts = Texts {
    title: "ZyloDent Remote Manager",
    connection_section: "SSH Connection",
    host: "Host IP:",
    username: "Username:",
    password: "Password:",
    pixel_section: "Pixel Size Configuration",
    pixel_x: "Pixel Size X:",
    pixel_y: "Pixel Size Y:",
    update_pixel_sizes: "Update Pixel Sizes",
    mask_section: "Mask Image Upload",
    selected_file: "Selected File:",
    browse: "Browse...",
    upload_mask: "Upload Mask",
    power_section: "Power Settings",
    power_value: "Power Value:",
    update_power_settings: "Update Power Settings",
    ready: "Ready",
    in_progress: "Operation in progress...",
    warning_title: "Warning",
    error_title: "Error",
    success_title: "Success",
    another_in_progress: "Another operation is in progress",
    select_mask_first: "Please select a mask file first",
    fill_connection_fields: "Please fill in all connection fields",
    invalid_json: "Invalid JSON format",
    invalid_number: "Not a valid number",
    pixel_sizes_updated: "Pixel sizes updated successfully!",
    mask_uploaded: "Mask uploaded successfully!",
    power_settings_updated: "Power settings updated successfully!",
    select_mask_title: "Select Mask Image",
    png_files: "PNG Files",
    all_files: "All Files",
    form_hints: "Tab/↑↓ move  Enter activate  F2 language  Esc quit",
    browser_hints: "↑↓ select  Enter open  Backspace up  Tab filter  Esc cancel",
    dialog_hints: "Enter/Esc close",
};

static ZH: Texts = Texts {
    title: "ZyloDent 远程管理器",
    connection_section: "SSH连接",
    host: "主机IP:",
    username: "用户名:",
    password: "密码:",
    pixel_section: "像素尺寸配置",
    pixel_x: "像素尺寸 X:",
    pixel_y: "像素尺寸 Y:",
    update_pixel_sizes: "更新像素尺寸",
    mask_section: "遮罩图像上传",
    selected_file: "已选文件:",
    browse: "浏览...",
    upload_mask: "上传遮罩",
    power_section: "功率设置",
    power_value: "功率值:",
    update_power_settings: "更新功率设置",
    ready: "就绪",
    in_progress: "操作进行中...",
    warning_title: "警告",
    error_title: "错误",
    success_title: "成功",
    another_in_progress: "另一个操作正在进行中",
    select_mask_first: "请先选择遮罩文件",
    fill_connection_fields: "请填写所有连接字段",
    invalid_json: "无效的JSON格式",
    invalid_number: "无效的数字",
    pixel_sizes_updated: "像素尺寸更新成功！",
    mask_uploaded: "遮罩上传成功！",
    power_settings_updated: "功率设置更新成功！",
    select_mask_title: "选择遮罩图像",
    png_files: "PNG 文件",
    all_files: "所有文件",
    form_hints: "Tab/↑↓ 移动  Enter 执行  F2 语言  Esc 退出",
    browser_hints: "↑↓ 选择  Enter 打开  Backspace 上级  Tab 过滤  Esc 取消",
    dialog_hints: "Enter/Esc 关闭",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_and_unknown_falls_back_to_english() {
        assert_eq!(Language::from_code("zh"), Language::Chinese);
        assert_eq!(Language::from_code(" ZH-CN "), Language::Chinese);
        assert_eq!(Language::from_code("en"), Language::English);
        assert_eq!(Language::from_code("fr"), Language::English);
        assert_eq!(Language::from_code(Language::Chinese.code()), Language::Chinese);
    }

    #[test]
    fn toggling_switches_tables() {
        let lang = Language::English.toggled();
        assert_eq!(lang, Language::Chinese);
        assert_eq!(lang.texts().ready, "就绪");
        assert_eq!(lang.toggled().texts().ready, "Ready");
    }

    #[test]
    fn mask_rename_names_only_the_backup_file() {
        let progress = Progress::MaskRenamed {
            backup: "/root/Dentware/databases/projectorCalibration/old_mask2.png".to_string(),
        };
        assert_eq!(
            Language::English.progress(&progress),
            "Renamed existing mask to old_mask2.png"
        );
        assert_eq!(
            Language::Chinese.progress(&progress),
            "已将现有遮罩重命名为old_mask2.png"
        );
    }

    #[test]
    fn missing_fields_error_is_localized() {
        let err = MaintenanceError::Remote(RemoteError::MissingConnectionFields);
        assert_eq!(
            Language::English.error_message(&err),
            "Please fill in all connection fields"
        );
        assert_eq!(Language::Chinese.error_message(&err), "请填写所有连接字段");
    }

    #[test]
    fn invalid_json_status_is_short() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = MaintenanceError::InvalidJson {
            path: "/root/Dentware/databases/machine.json".to_string(),
            source,
        };
        assert_eq!(
            Language::English.error_status(&err),
            "Error: Invalid JSON format"
        );
        assert!(
            Language::English
                .error_message(&err)
                .starts_with("Invalid JSON format: ")
        );
    }

    #[test]
    fn outcome_messages_include_values() {
        let outcome = Outcome::PowerSettingsUpdated { value: 5 };
        assert_eq!(
            Language::English.outcome_message(&outcome),
            "All power values set to 5"
        );
        assert_eq!(
            Language::English.outcome_status(&outcome),
            "Power settings updated successfully!"
        );
    }
}
