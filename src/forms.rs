//! Form fragment rendering.
//!
//! Currently a single widget: a labeled radio-button group. Rendering is a
//! pure function of the configuration struct; no data access happens here.

use log::debug;
use serde::{Deserialize, Serialize};

/// One selectable option inside a radio group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioOption {
    pub value: String,
    pub label: String,
    pub checked: bool,
}

impl RadioOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        RadioOption {
            value: value.into(),
            label: label.into(),
            checked: false,
        }
    }

    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }
}

/// Configuration for a labeled radio-button group.
///
/// Defaults: `label: None` (no legend is emitted), `name: None` (inputs carry
/// no `name` attribute), no options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioGroup {
    pub label: Option<String>,
    pub name: Option<String>,
    pub options: Vec<RadioOption>,
}

impl RadioGroup {
    pub fn new() -> Self {
        RadioGroup::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn option(mut self, option: RadioOption) -> Self {
        self.options.push(option);
        self
    }

    /// Render the group to an HTML string.
    ///
    /// All interpolated strings are escaped; `checked` is emitted as a bare
    /// boolean attribute.
    pub fn render(&self) -> String {
        debug!(
            "Rendering radio group `{}` with {} options",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.options.len()
        );
        let mut out = String::new();
        out.push_str("<fieldset class=\"radio-group\">");
        if let Some(label) = &self.label {
            out.push_str("<legend>");
            out.push_str(&escape_html(label));
            out.push_str("</legend>");
        }
        for option in &self.options {
            out.push_str("<label><input type=\"radio\"");
            if let Some(name) = &self.name {
                out.push_str(" name=\"");
                out.push_str(&escape_html(name));
                out.push('"');
            }
            out.push_str(" value=\"");
            out.push_str(&escape_html(&option.value));
            out.push('"');
            if option.checked {
                out.push_str(" checked");
            }
            out.push_str("> ");
            out.push_str(&escape_html(&option.label));
            out.push_str("</label>");
        }
        out.push_str("</fieldset>");
        out
    }
}

/// Escape text for safe interpolation into HTML content and attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
