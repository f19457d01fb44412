pub mod admin;
pub mod delivery;
pub mod orders;
pub mod payments;
pub mod products;

use serde::Deserialize;
use utoipa::IntoParams;

/// Common pagination query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

pub(crate) fn default_admin_page() -> u64 {
    default_page()
}

pub(crate) fn default_admin_per_page() -> u64 {
    default_per_page()
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}
