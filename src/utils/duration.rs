// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::{CoreError, CoreResult};

/// 将小时数换算为整数分钟
///
/// 使用就近取整（.5 远离零），拒绝 NaN 和无穷大
pub fn hours_to_minutes(hours: f64) -> CoreResult<i64> {
    if !hours.is_finite() {
        return Err(CoreError::InvalidInput(format!(
            "hours must be a finite number, got {}",
            hours
        )));
    }
    let minutes = (hours * 60.0).round();
    if minutes.abs() > i64::MAX as f64 / 2.0 {
        return Err(CoreError::InvalidInput(format!(
            "hours out of range: {}",
            hours
        )));
    }
    Ok(minutes as i64)
}

/// 以 `1h30min` / `2h` / `45min` 形式展示分钟数
pub fn format_minutes(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let total = minutes.unsigned_abs();
    let hours = total / 60;
    let rest = total % 60;

    match (hours, rest) {
        (0, m) => format!("{}{}min", sign, m),
        (h, 0) => format!("{}{}h", sign, h),
        (h, m) => format!("{}{}h{}min", sign, h, m),
    }
}
