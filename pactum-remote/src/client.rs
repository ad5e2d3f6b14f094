//! Identity of a remote caller.

use serde::{Deserialize, Serialize};

const PER_USER_RANGE: u32 = 100_000;
const ISOLATED_UIDS: std::ops::RangeInclusive<u32> = 99_000..=99_999;
const APP_ZYGOTE_ISOLATED_UIDS: std::ops::RangeInclusive<u32> = 90_000..=98_999;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationType {
    #[default]
    Unknown,
    IsolatedProcess,
    DefaultProcess,
}

impl IsolationType {
    /// Classifies a caller by uid.
    pub fn for_uid(uid: u32) -> Self {
        let app_id = uid % PER_USER_RANGE;
        if ISOLATED_UIDS.contains(&app_id) || APP_ZYGOTE_ISOLATED_UIDS.contains(&app_id) {
            Self::IsolatedProcess
        } else {
            Self::DefaultProcess
        }
    }
}

/// Who is calling, as reported by the transport for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientDetails {
    pub user_id: u32,
    pub isolation: IsolationType,
    #[serde(default)]
    pub associated_packages: Vec<String>,
}

impl ClientDetails {
    /// Details for a uid, with isolation derived from the uid.
    pub fn for_uid(user_id: u32, associated_packages: Vec<String>) -> Self {
        Self {
            user_id,
            isolation: IsolationType::for_uid(user_id),
            associated_packages,
        }
    }

    pub fn is_isolated(&self) -> bool {
        self.isolation == IsolationType::IsolatedProcess
    }
}
