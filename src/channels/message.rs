//! Outgoing message payloads in Discord's wire shape.

use serde::Serialize;

pub const MESSAGE_FLAG_EPHEMERAL: u64 = 1 << 6;

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;
const COMPONENT_STRING_SELECT: u8 = 3;
const COMPONENT_TEXT_INPUT: u8 = 4;

#[derive(Debug, Clone, Default, Serialize)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl MessagePayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self::text(content).with_flags(MESSAGE_FLAG_EPHEMERAL)
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn with_components(mut self, rows: Vec<ActionRow>) -> Self {
        self.components = rows;
        self
    }

    pub fn with_flags(mut self, flags: u64) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn is_ephemeral(&self) -> bool {
        self.flags
            .map(|f| f & MESSAGE_FLAG_EPHEMERAL != 0)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Embed {
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: Some(inline),
        });
        self
    }

    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    kind: u8,
    pub components: Vec<Component>,
}

impl ActionRow {
    pub fn new(components: Vec<Component>) -> Self {
        Self {
            kind: COMPONENT_ACTION_ROW,
            components,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Component {
    Button(Button),
    SelectMenu(SelectMenu),
    TextInput(TextInput),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
    Link,
}

impl ButtonStyle {
    fn code(self) -> u8 {
        match self {
            Self::Primary => 1,
            Self::Secondary => 2,
            Self::Success => 3,
            Self::Danger => 4,
            Self::Link => 5,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PartialEmoji {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    kind: u8,
    pub style: u8,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<PartialEmoji>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub disabled: bool,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            kind: COMPONENT_BUTTON,
            style: style.code(),
            label: label.into(),
            emoji: None,
            custom_id: Some(custom_id.into()),
            url: None,
            disabled: false,
        }
    }

    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: COMPONENT_BUTTON,
            style: ButtonStyle::Link.code(),
            label: label.into(),
            emoji: None,
            custom_id: None,
            url: Some(url.into()),
            disabled: false,
        }
    }

    pub fn emoji(mut self, emoji: &str) -> Self {
        self.emoji = Some(PartialEmoji {
            name: emoji.to_string(),
        });
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<PartialEmoji>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectMenu {
    #[serde(rename = "type")]
    kind: u8,
    pub custom_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub options: Vec<SelectOption>,
}

impl SelectMenu {
    pub fn new(custom_id: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            kind: COMPONENT_STRING_SELECT,
            custom_id: custom_id.into(),
            placeholder: Some(placeholder.into()),
            options: Vec::new(),
        }
    }

    pub fn option(mut self, label: &str, value: &str, description: &str, emoji: &str) -> Self {
        self.options.push(SelectOption {
            label: label.to_string(),
            value: value.to_string(),
            description: Some(description.to_string()),
            emoji: Some(PartialEmoji {
                name: emoji.to_string(),
            }),
        });
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TextInput {
    #[serde(rename = "type")]
    kind: u8,
    pub custom_id: String,
    pub label: String,
    /// 1 = short, 2 = paragraph.
    pub style: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub required: bool,
    pub min_length: u16,
    pub max_length: u16,
}

impl TextInput {
    pub fn paragraph(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: COMPONENT_TEXT_INPUT,
            custom_id: custom_id.into(),
            label: label.into(),
            style: 2,
            placeholder: None,
            required: false,
            min_length: 0,
            max_length: 4000,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Modal {
    pub custom_id: String,
    pub title: String,
    pub components: Vec<ActionRow>,
}
