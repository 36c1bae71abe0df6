// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurrence_series")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub frequency: String,
    pub interval: i32,
    pub start_date: ChronoDate,
    pub end_date: Option<ChronoDate>,
    pub count: Option<i32>,
    /// 逗号分隔的星期，0 为周一
    pub byweekday: Option<String>,
    pub business_days_only: bool,
    pub monthly_use_last_day: bool,
    pub monthly_day: Option<i32>,
    #[sea_orm(unique)]
    pub template_task_id: Uuid,
    pub last_materialized_at: Option<ChronoDateTimeWithTimeZone>,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
