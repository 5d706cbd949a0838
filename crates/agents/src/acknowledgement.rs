use serde::{Deserialize, Serialize};

/// Reply to a platform callback.
///
/// `reason` accompanies a decline; `message` is informational.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgement {
    pub acknowledged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_buys_created: Option<usize>,
}

impl Acknowledgement {
    pub fn accepted() -> Self {
        Self {
            acknowledged: true,
            ..Self::default()
        }
    }

    pub fn declined(reason: impl Into<String>) -> Self {
        Self {
            acknowledged: false,
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_media_buys_created(mut self, count: usize) -> Self {
        self.media_buys_created = Some(count);
        self
    }
}
