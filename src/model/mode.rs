/// Application interaction modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Form navigation and field editing.
    #[default]
    Form,
    /// Mask file browser overlay.
    Browse,
    /// Modal message box; any other input is ignored until dismissed.
    Dialog,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Form => "FORM",
            Mode::Browse => "BROWSE",
            Mode::Dialog => "DIALOG",
        }
    }
}
