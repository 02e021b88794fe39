use std::path::PathBuf;

use thiserror::Error;

use super::config::AppConfig;
use super::input::TextInput;
use crate::remote::ConnectParams;

/// Focusable form elements, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Host,
    Username,
    Password,
    PixelX,
    PixelY,
    UpdatePixelSizes,
    Browse,
    UploadMask,
    Power,
    UpdatePowerSettings,
}

impl Field {
    pub const ORDER: [Field; 10] = [
        Field::Host,
        Field::Username,
        Field::Password,
        Field::PixelX,
        Field::PixelY,
        Field::UpdatePixelSizes,
        Field::Browse,
        Field::UploadMask,
        Field::Power,
        Field::UpdatePowerSettings,
    ];

    pub fn is_button(self) -> bool {
        matches!(
            self,
            Field::UpdatePixelSizes
                | Field::Browse
                | Field::UploadMask
                | Field::UpdatePowerSettings
        )
    }

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("{field}: {value:?} is not a number")]
    InvalidNumber { field: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Form {
    pub host: TextInput,
    pub username: TextInput,
    pub password: TextInput,
    pub pixel_x: TextInput,
    pub pixel_y: TextInput,
    pub power: TextInput,
    pub mask_file: Option<PathBuf>,
    focus: Field,
}

impl Form {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            host: TextInput::new(&config.connection.host),
            username: TextInput::new(&config.connection.username),
            password: TextInput::default(),
            pixel_x: TextInput::new(&config.form.pixel_size_x.to_string()),
            pixel_y: TextInput::new(&config.form.pixel_size_y.to_string()),
            power: TextInput::new(&config.form.power_value.to_string()),
            mask_file: None,
            focus: Field::Host,
        }
    }

    pub fn focus(&self) -> Field {
        self.focus
    }

    pub fn set_focus(&mut self, field: Field) {
        self.focus = field;
    }

    pub fn focus_next(&mut self) {
        let next = (self.focus.index() + 1) % Field::ORDER.len();
        self.focus = Field::ORDER[next];
    }

    pub fn focus_prev(&mut self) {
        let len = Field::ORDER.len();
        let prev = (self.focus.index() + len - 1) % len;
        self.focus = Field::ORDER[prev];
    }

    pub fn input(&self, field: Field) -> Option<&TextInput> {
        match field {
            Field::Host => Some(&self.host),
            Field::Username => Some(&self.username),
            Field::Password => Some(&self.password),
            Field::PixelX => Some(&self.pixel_x),
            Field::PixelY => Some(&self.pixel_y),
            Field::Power => Some(&self.power),
            _ => None,
        }
    }

    pub fn focused_input_mut(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            Field::Host => Some(&mut self.host),
            Field::Username => Some(&mut self.username),
            Field::Password => Some(&mut self.password),
            Field::PixelX => Some(&mut self.pixel_x),
            Field::PixelY => Some(&mut self.pixel_y),
            Field::Power => Some(&mut self.power),
            _ => None,
        }
    }

    pub fn connect_params(&self, config: &AppConfig) -> ConnectParams {
        ConnectParams {
            host: self.host.value().trim().to_string(),
            username: self.username.value().trim().to_string(),
            password: self.password.value().to_string(),
            port: config.connection.port,
            timeout: config.connect_timeout(),
        }
    }

    pub fn pixel_sizes(&self) -> Result<(f64, f64), FormError> {
        Ok((
            parse_float("pixelSizeX", self.pixel_x.value())?,
            parse_float("pixelSizeY", self.pixel_y.value())?,
        ))
    }

    /// Integer power value; a decimal entry is truncated toward zero.
    pub fn power_value(&self) -> Result<i64, FormError> {
        let raw = self.power.value().trim();
        if let Ok(value) = raw.parse::<i64>() {
            return Ok(value);
        }

        let value = parse_float("power", raw)?;
        if value < i64::MIN as f64 || value > i64::MAX as f64 {
            return Err(invalid("power", raw));
        }
        Ok(value.trunc() as i64)
    }
}

fn parse_float(field: &'static str, raw: &str) -> Result<f64, FormError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(invalid(field, raw)),
    }
}

fn invalid(field: &'static str, raw: &str) -> FormError {
    FormError::InvalidNumber {
        field,
        value: raw.to_string(),
    }
}
