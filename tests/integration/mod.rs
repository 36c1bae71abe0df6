// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod helpers;
pub mod ledger_properties_test;
pub mod ledger_scenarios_test;
pub mod notification_flow_test;
pub mod recurrence_scenarios_test;
