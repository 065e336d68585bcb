use crate::resource::types::Resource;

use serde::{Serialize, Deserialize};

/// Body returned by every write endpoint
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WriteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    // Authoritative record, when the server sends one back
    #[serde(default)]
    pub resource: Option<Resource>
}

impl WriteResponse {
    pub fn ok() -> WriteResponse {
        WriteResponse { success: true, ..Default::default() }
    }

    pub fn with_resource(resource: Resource) -> WriteResponse {
        WriteResponse { success: true, resource: Some(resource), ..Default::default() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResourceLogResponse {
    #[serde(default)]
    pub resources: Vec<Resource>
}

/// `GET /api/resource_log` body; older servers send the bare list
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ResourceLogBody {
    Wrapped(ResourceLogResponse),
    Bare(Vec<Resource>)
}

impl ResourceLogBody {
    pub fn into_resources(self) -> Vec<Resource> {
        match self {
            ResourceLogBody::Wrapped(log) => log.resources,
            ResourceLogBody::Bare(resources) => resources
        }
    }
}

macro_rules! require_role {
    ($current: expr, $required: expr) => {
        if !$crate::auth::permission::has_permission($current, $required) {
            log::debug!("Refusing action: requires {}, have {}", $required, $current);
            return Err($crate::shared::error::Error::PermissionDenied { required: $required, current: $current });
        }
    };
}

pub(crate) use require_role;
