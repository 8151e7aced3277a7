//! 车辆指令规划：根据意图与回复生成指令列表（可为空）

use super::context::TurnContext;
use super::types::{Action, ActionDetails, ActionType, Intent, Priority, Reply};

/// 舒适度调整的默认目标温度（°F）
pub const DEFAULT_TARGET_TEMP: f64 = 72.0;

/// 安抚类音乐风格
pub const RELAXING_GENRE: &str = "relaxing";

#[derive(Debug, Default, Clone, Copy)]
pub struct ActionPlanner;

impl ActionPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(
        &self,
        text: &str,
        intent: Intent,
        reply: &Reply,
        _context: &TurnContext,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        let lower = text.to_lowercase();

        match intent {
            Intent::Emergency => actions.push(
                Action::new(
                    ActionType::AlertDriver,
                    ActionDetails {
                        message: Some(text.to_string()),
                        ..Default::default()
                    },
                )
                .with_priority(Priority::Immediate),
            ),
            Intent::RouteChange if reply.message.to_lowercase().contains("yes") => {
                actions.push(Action::new(
                    ActionType::UpdateRoute,
                    ActionDetails {
                        confirmation_required: true,
                        ..Default::default()
                    },
                ))
            }
            Intent::StopRequest if !reply.suggestions.is_empty() => actions.push(Action::new(
                ActionType::ConfirmStop,
                ActionDetails {
                    options: Some(reply.suggestions.clone()),
                    confirmation_required: true,
                    ..Default::default()
                },
            )),
            Intent::ComfortAdjustment if lower.contains("temperature") => actions.push(Action::new(
                ActionType::AdjustTemperature,
                ActionDetails {
                    target_temp: Some(DEFAULT_TARGET_TEMP),
                    ..Default::default()
                },
            )),
            Intent::ComfortAdjustment if lower.contains("music") => actions.push(Action::new(
                ActionType::ChangeMusic,
                ActionDetails {
                    genre: Some(RELAXING_GENRE.to_string()),
                    ..Default::default()
                },
            )),
            _ => {}
        }

        actions
    }
}
