//! Preset reasons for calling staff to the table.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistanceTopic {
    CallWaiter,
    Cutlery,
    Napkins,
    AddToOrder,
    /// Free text typed by the diner.
    Other(String),
}

impl AssistanceTopic {
    /// The buttons offered before free text.
    pub const PRESETS: [AssistanceTopic; 4] = [
        AssistanceTopic::CallWaiter,
        AssistanceTopic::Cutlery,
        AssistanceTopic::Napkins,
        AssistanceTopic::AddToOrder,
    ];

    /// The text sent to staff.
    pub fn details(&self) -> &str {
        match self {
            AssistanceTopic::CallWaiter => "Please come to the table",
            AssistanceTopic::Cutlery => "We need cutlery",
            AssistanceTopic::Napkins => "We need napkins",
            AssistanceTopic::AddToOrder => "We would like to add something to the order",
            AssistanceTopic::Other(text) => text,
        }
    }
}

impl fmt::Display for AssistanceTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.details())
    }
}

impl From<AssistanceTopic> for String {
    fn from(topic: AssistanceTopic) -> Self {
        match topic {
            AssistanceTopic::Other(text) => text,
            preset => preset.details().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_have_text() {
        for topic in AssistanceTopic::PRESETS {
            assert!(!topic.details().trim().is_empty());
        }
    }

    #[test]
    fn test_free_text_passes_through() {
        let text: String = AssistanceTopic::Other("More ice, please".to_string()).into();
        assert_eq!(text, "More ice, please");
        assert_eq!(String::from(AssistanceTopic::Napkins), "We need napkins");
    }
}
