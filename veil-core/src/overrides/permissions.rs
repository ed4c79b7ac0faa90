use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::capability::{PermissionProvider, PermissionStatus};
use crate::error::Result;

/// Answers configured permission names from the profile and sends every
/// other name to the native query.
pub struct ProfilePermissions {
    inner: Box<dyn PermissionProvider>,
    states: BTreeMap<String, String>,
}

impl ProfilePermissions {
    pub fn new(inner: Box<dyn PermissionProvider>, states: BTreeMap<String, String>) -> Self {
        Self { inner, states }
    }
}

#[async_trait(?Send)]
impl PermissionProvider for ProfilePermissions {
    async fn query(&self, name: &str) -> Result<PermissionStatus> {
        match self.states.get(name) {
            Some(state) => Ok(PermissionStatus {
                name: name.to_string(),
                state: state.clone(),
            }),
            None => self.inner.query(name).await,
        }
    }
}
