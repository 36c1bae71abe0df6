// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub time_tracking_enabled: bool,
    pub initial_credit: i64,
    pub remaining_credit: i64,
    pub alert_armed: bool,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::credit_log::Entity")]
    CreditLogs,
}

impl Related<super::credit_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
