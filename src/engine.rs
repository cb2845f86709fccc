use crate::context::GameContext;
use crate::error::{GameResult, ValidationError};
use crate::generator::{RoundBrief, generate_round};
use crate::hasher::state_hash;
use crate::model::{Action, Dialogue, GameState, PublicDialogue, Winner};
use crate::{debug, info};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod setup;
pub mod transition;

pub use setup::{ensure_daily_setup, initial_state_hash};
pub use transition::{Transition, advance, can_pass};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayTurnRequest {
    /// "PASS" | "ELIMINATE"
    pub action: String,
    #[serde(default, alias = "target_participant")]
    pub target_model: Option<String>,
    /// 缺省表示从当天第一轮开始
    #[serde(default)]
    pub current_state_hash: Option<String>,
}

impl PlayTurnRequest {
    pub fn pass(current_state_hash: Option<String>) -> Self {
        Self {
            action: Action::Pass.to_string(),
            target_model: None,
            current_state_hash,
        }
    }

    pub fn eliminate(target: impl Into<String>, current_state_hash: Option<String>) -> Self {
        Self {
            action: Action::Eliminate.to_string(),
            target_model: Some(target.into()),
            current_state_hash,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayTurnResponse {
    pub state_hash: String,
    pub round_number: u32,
    pub remaining_models: Vec<String>,
    pub dialogues: Vec<PublicDialogue>,
    pub game_over: bool,
    pub winner: Option<Winner>,
    pub can_pass: bool,
    pub eliminated_model: Option<String>,
}

impl From<&GameState> for PlayTurnResponse {
    fn from(state: &GameState) -> Self {
        Self {
            state_hash: state.state_hash.clone(),
            round_number: state.round_number,
            remaining_models: state.remaining_models.clone(),
            dialogues: state.public_dialogues(),
            game_over: state.game_over,
            winner: state.winner,
            can_pass: can_pass(state.round_number, state.game_over),
            eliminated_model: state.eliminated_model.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyInfoResponse {
    pub date: String,
    pub category: String,
    pub turn_order: Vec<String>,
    pub initial_state_hash: String,
    pub round_number: u32,
    pub dialogues: Vec<PublicDialogue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupTriggerResponse {
    pub status: String,
    pub date: String,
}

/// 当天信息：类别、发言顺序与第一轮对话
pub async fn daily_info(ctx: &GameContext, today: NaiveDate) -> GameResult<DailyInfoResponse> {
    let setup = ensure_daily_setup(ctx, today).await?;
    let pair = setup::word_pair_for(ctx, &setup).await?;
    let initial = setup::initial_round(ctx, &setup, &pair).await?.into_state();

    Ok(DailyInfoResponse {
        date: setup.date.to_string(),
        category: pair.category,
        turn_order: setup.turn_order,
        initial_state_hash: initial.state_hash.clone(),
        round_number: initial.round_number,
        dialogues: initial.public_dialogues(),
    })
}

/// 管理操作：手动触发当天初始化，同一天重复调用无副作用
pub async fn trigger_daily_setup(
    ctx: &GameContext,
    today: NaiveDate,
) -> GameResult<SetupTriggerResponse> {
    let setup = ensure_daily_setup(ctx, today).await?;
    Ok(SetupTriggerResponse {
        status: "success".to_string(),
        date: setup.date.to_string(),
    })
}

/// 当前所处的位置
struct Position {
    round_number: u32,
    remaining: Vec<String>,
    dialogues: Vec<Dialogue>,
}

async fn current_position(
    ctx: &GameContext,
    today: NaiveDate,
    hash: Option<&str>,
    turn_order: &[String],
) -> GameResult<Position> {
    let initial = state_hash(today, 1, turn_order, Action::Start, None);
    let hash = match hash.map(str::trim).filter(|h| !h.is_empty()) {
        Some(h) => h.to_string(),
        None => initial.clone(),
    };

    let state = match ctx.cache.get(&hash).await? {
        Some(state) => state,
        // 第一轮尚未写入缓存时按初始阵容处理
        None if hash == initial => {
            return Ok(Position {
                round_number: 1,
                remaining: turn_order.to_vec(),
                dialogues: Vec::new(),
            });
        }
        None => return Err(ValidationError::UnknownState(hash).into()),
    };

    if state.date != today {
        return Err(ValidationError::StaleState {
            hash,
            date: state.date.to_string(),
        }
        .into());
    }
    if state.game_over {
        return Err(ValidationError::GameOver.into());
    }

    Ok(Position {
        round_number: state.round_number,
        remaining: state.remaining_models,
        dialogues: state.dialogues,
    })
}

/// 执行一回合：校验动作 → 计算下一状态 → 命中缓存直接返回，否则生成并写入
///
/// 同样的 (当前状态, 动作, 目标) 总是得到同一个状态哈希与同样的结果。
pub async fn play_turn(
    ctx: &GameContext,
    today: NaiveDate,
    request: &PlayTurnRequest,
) -> GameResult<PlayTurnResponse> {
    let action: Action = request.action.trim().parse()?;

    let setup = ensure_daily_setup(ctx, today).await?;
    let position = current_position(
        ctx,
        today,
        request.current_state_hash.as_deref(),
        &setup.turn_order,
    )
    .await?;

    let next = advance(
        position.round_number,
        &position.remaining,
        &setup.mole_model,
        action,
        request.target_model.as_deref(),
    )?;

    let hash = state_hash(
        today,
        next.round_number,
        &next.remaining_models,
        next.action,
        next.eliminated_model.as_deref(),
    );
    debug!(
        target: "Engine",
        "{} {} → 第 {} 轮 ({})",
        next.action,
        next.eliminated_model.as_deref().unwrap_or("-"),
        next.round_number,
        hash
    );

    let pair = setup::word_pair_for(ctx, &setup).await?;
    let key = hash.as_str();
    let next_ref = &next;
    let setup_ref = &setup;
    let previous = position.dialogues.as_slice();

    let lookup = ctx
        .cache
        .get_or_insert_with(key, move || async move {
            // 终局不再生成对话
            let dialogues = if next_ref.game_over {
                Vec::new()
            } else {
                let brief = RoundBrief {
                    word_pair: &pair,
                    mole_model: &setup_ref.mole_model,
                    round_number: next_ref.round_number,
                    previous_dialogues: previous,
                };
                generate_round(
                    ctx.generator.clone(),
                    &next_ref.remaining_models,
                    &brief,
                    &ctx.config.fallback_message,
                )
                .await
            };

            GameState {
                state_hash: key.to_string(),
                date: today,
                round_number: next_ref.round_number,
                remaining_models: next_ref.remaining_models.clone(),
                action: next_ref.action,
                eliminated_model: next_ref.eliminated_model.clone(),
                dialogues,
                game_over: next_ref.game_over,
                winner: next_ref.winner,
            }
        })
        .await?;

    let state = lookup.into_state();
    if let Some(winner) = state.winner {
        info!(target: "Engine", "{} 游戏结束，胜者 {}", today, winner.as_str());
    }

    Ok(PlayTurnResponse::from(&state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_either_target_field() {
        let a: PlayTurnRequest =
            serde_json::from_str(r#"{"action":"ELIMINATE","target_model":"Grok"}"#).unwrap();
        let b: PlayTurnRequest =
            serde_json::from_str(r#"{"action":"ELIMINATE","target_participant":"Grok"}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, PlayTurnRequest::eliminate("Grok", None));

        let pass: PlayTurnRequest =
            serde_json::from_str(r#"{"action":"PASS","current_state_hash":"abc"}"#).unwrap();
        assert_eq!(pass, PlayTurnRequest::pass(Some("abc".into())));
    }

    #[test]
    fn response_hides_internal_thought() {
        let state = GameState {
            state_hash: "h".into(),
            date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            round_number: 1,
            remaining_models: vec!["Claude".into(), "Grok".into(), "Llama".into()],
            action: Action::Start,
            eliminated_model: None,
            dialogues: vec![Dialogue {
                model_name: "Grok".into(),
                message: "sweet".into(),
                internal_thought: "I am the mole".into(),
            }],
            game_over: false,
            winner: None,
        };

        let res = PlayTurnResponse::from(&state);
        assert!(res.can_pass);
        let json = serde_json::to_string(&res).unwrap();
        assert!(json.contains("\"message\":\"sweet\""));
        assert!(!json.contains("mole"));
    }
}
