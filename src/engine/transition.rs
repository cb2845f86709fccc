use crate::error::ValidationError;
use crate::model::{Action, Winner};

/// 存活人数降到此值及以下且内鬼仍在时，内鬼获胜
pub const MOLE_SURVIVES_AT: usize = 2;

/// 一次合法动作计算出的下一个状态 (尚未生成对话)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub round_number: u32,
    pub remaining_models: Vec<String>,
    pub action: Action,
    pub eliminated_model: Option<String>,
    pub game_over: bool,
    pub winner: Option<Winner>,
}

/// 状态机：校验动作并计算下一状态
///
/// - PASS 只能在第 1 轮使用，进入第 2 轮，成员不变
/// - ELIMINATE 需要一个存活的目标；淘汰内鬼则玩家胜，
///   否则剩余不超过两人时内鬼胜
pub fn advance(
    current_round: u32,
    remaining: &[String],
    mole: &str,
    action: Action,
    target: Option<&str>,
) -> Result<Transition, ValidationError> {
    match action {
        Action::Pass => {
            if current_round != 1 {
                return Err(ValidationError::PassNotAllowed {
                    round: current_round,
                });
            }
            Ok(Transition {
                round_number: 2,
                remaining_models: remaining.to_vec(),
                action,
                eliminated_model: None,
                game_over: false,
                winner: None,
            })
        }
        Action::Eliminate => {
            let target = target
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or(ValidationError::MissingTarget)?;
            if !remaining.iter().any(|m| m == target) {
                return Err(ValidationError::UnknownTarget(target.to_string()));
            }

            let next: Vec<String> = remaining.iter().filter(|m| *m != target).cloned().collect();
            let winner = if target == mole {
                Some(Winner::User)
            } else if next.len() <= MOLE_SURVIVES_AT {
                Some(Winner::Mole)
            } else {
                None
            };

            Ok(Transition {
                round_number: current_round + 1,
                remaining_models: next,
                action,
                eliminated_model: Some(target.to_string()),
                game_over: winner.is_some(),
                winner,
            })
        }
        Action::Start => Err(ValidationError::InvalidAction(action.to_string())),
    }
}

/// PASS 只在尚未结束的第一轮可用
pub fn can_pass(round_number: u32, game_over: bool) -> bool {
    round_number == 1 && !game_over
}
