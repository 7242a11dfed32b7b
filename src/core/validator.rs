use crate::domain::model::{AgeLimit, BannerIdRange, CustomerRecord};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z ]+$").expect("name pattern is valid"));

/// 違反驗證政策的原因；訊息格式為對外契約
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("invalid name: must contain only letters and spaces (got {name})")]
    InvalidName { name: String },

    #[error("invalid age: must be between {min} and {max} (got {age})")]
    InvalidAge { min: i64, max: i64, age: i64 },

    #[error("invalid banner id: must be between {min} and {max} (got {banner_id})")]
    InvalidBannerId { min: i64, max: i64, banner_id: i64 },
}

/// 依序檢查姓名、年齡、banner id，回報第一個違規項目
pub fn validate(
    record: &CustomerRecord,
    age_limit: &AgeLimit,
    banner_range: &BannerIdRange,
) -> Result<(), ValidationFailure> {
    let name = record.name.trim();
    if !NAME_RE.is_match(name) {
        return Err(ValidationFailure::InvalidName {
            name: name.to_string(),
        });
    }

    if !age_limit.contains(record.age) {
        return Err(ValidationFailure::InvalidAge {
            min: age_limit.min_age,
            max: age_limit.max_age,
            age: record.age,
        });
    }

    if !banner_range.contains(record.banner_id) {
        return Err(ValidationFailure::InvalidBannerId {
            min: banner_range.min,
            max: banner_range.max,
            banner_id: record.banner_id,
        });
    }

    Ok(())
}
