use crate::utils::error::Result;
use crate::utils::validation::{validate_ordered_range, validate_positive_number, Validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CSV 中的一筆客戶資料，解析後不可變
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub name: String,
    pub age: i64,
    pub cookie: String,
    pub banner_id: i64,
}

impl CustomerRecord {
    /// 必要欄位名稱（順序不拘）
    pub const HEADER: [&'static str; 4] = ["Name", "Age", "Cookie", "Banner_id"];
}

/// 送往 ShowAds 的 banner 顯示請求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BannerRequest {
    pub visitor_cookie: String,
    pub banner_id: i64,
}

impl From<&CustomerRecord> for BannerRequest {
    fn from(record: &CustomerRecord) -> Self {
        Self {
            visitor_cookie: record.cookie.clone(),
            banner_id: record.banner_id,
        }
    }
}

impl From<CustomerRecord> for BannerRequest {
    fn from(record: CustomerRecord) -> Self {
        Self {
            visitor_cookie: record.cookie,
            banner_id: record.banner_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeLimit {
    pub min_age: i64,
    pub max_age: i64,
}

impl AgeLimit {
    pub fn new(min_age: i64, max_age: i64) -> Self {
        Self { min_age, max_age }
    }

    pub fn contains(&self, age: i64) -> bool {
        self.min_age <= age && age <= self.max_age
    }
}

impl Default for AgeLimit {
    fn default() -> Self {
        Self {
            min_age: 18,
            max_age: 100,
        }
    }
}

impl Validate for AgeLimit {
    fn validate(&self) -> Result<()> {
        validate_positive_number("min_age", self.min_age, 0)?;
        validate_ordered_range("age_limit", self.min_age, self.max_age)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerIdRange {
    pub min: i64,
    pub max: i64,
}

impl BannerIdRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, banner_id: i64) -> bool {
        self.min <= banner_id && banner_id <= self.max
    }
}

/// Bearer token；刷新時整個替換，不做欄位修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
