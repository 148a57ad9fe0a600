use serde::{Deserialize, Serialize};

/// Uniform envelope for control API responses.
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T = ()> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse<()> {
    pub fn error(message: String) -> Self {
        Self { success: false, data: None, message: Some(message) }
    }

    pub fn success(message: Option<String>) -> Self {
        Self { success: true, data: None, message }
    }
}

impl<T> ApiResponse<T> {
    pub fn success_with_data(data: T, message: Option<String>) -> Self {
        Self { success: true, data: Some(data), message }
    }
}
