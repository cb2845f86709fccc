use crate::cache::CacheLookup;
use crate::context::GameContext;
use crate::error::{GameResult, SetupError, StoreError};
use crate::generator::{RoundBrief, generate_round};
use crate::hasher::state_hash;
use crate::{debug, info};
use crate::model::{Action, DailySetup, GameState, NewDailySetup, WordPair};
use chrono::NaiveDate;
use rand::seq::{IndexedRandom, SliceRandom};

/// 随机抽取当天的词对、内鬼与发言顺序
pub fn draw_setup(
    date: NaiveDate,
    word_pairs: &[WordPair],
    participants: &[String],
) -> Result<NewDailySetup, SetupError> {
    let mut rng = rand::rng();
    let pair = word_pairs.choose(&mut rng).ok_or(SetupError::NoWordPairs)?;
    let mole = participants
        .choose(&mut rng)
        .ok_or(SetupError::NoParticipants)?;

    let mut turn_order = participants.to_vec();
    turn_order.shuffle(&mut rng);

    Ok(NewDailySetup {
        date,
        word_pair_id: pair.id,
        mole_model: mole.clone(),
        turn_order,
    })
}

/// 读取当天配置，不存在则返回 None
pub async fn find_daily_setup(ctx: &GameContext, date: NaiveDate) -> GameResult<Option<DailySetup>> {
    Ok(ctx.store.daily_setup(date).await?.first())
}

pub async fn word_pair_for(ctx: &GameContext, setup: &DailySetup) -> GameResult<WordPair> {
    ctx.store
        .word_pair(setup.word_pair_id)
        .await?
        .first()
        .ok_or_else(|| SetupError::MissingWordPair(setup.word_pair_id).into())
}

/// 确保当天配置存在 (每日幂等)
///
/// 首次创建时会立即生成第一轮对话写入缓存。
pub async fn ensure_daily_setup(ctx: &GameContext, date: NaiveDate) -> GameResult<DailySetup> {
    if let Some(existing) = find_daily_setup(ctx, date).await? {
        return Ok(existing);
    }

    let pairs = ctx.store.word_pairs().await?.data;
    let draft = draw_setup(date, &pairs, &ctx.participants())?;

    let setup = match ctx.store.insert_daily_setup(draft).await {
        Ok(rows) => rows.inserted()?,
        // 定时任务与首个请求同时触发，第一轮由先写入的一方生成
        Err(StoreError::Duplicate) => {
            debug!(target: "Setup", "{} 已由并发请求创建，沿用已有配置", date);
            return Ok(find_daily_setup(ctx, date)
                .await?
                .ok_or(StoreError::NoRows)?);
        }
        Err(e) => return Err(e.into()),
    };

    let pair = word_pair_for(ctx, &setup).await?;
    info!(
        target: "Setup",
        "{} 已就绪: 类别 {} | 发言顺序 {}",
        setup.date,
        pair.category,
        setup.turn_order.join(", ")
    );

    initial_round(ctx, &setup, &pair).await?;
    Ok(setup)
}

pub fn initial_state_hash(setup: &DailySetup) -> String {
    state_hash(setup.date, 1, &setup.turn_order, Action::Start, None)
}

/// 第一轮 (START) 的状态，缓存缺失时生成
pub async fn initial_round(
    ctx: &GameContext,
    setup: &DailySetup,
    pair: &WordPair,
) -> GameResult<CacheLookup> {
    let hash = initial_state_hash(setup);
    let key = hash.as_str();

    let lookup = ctx
        .cache
        .get_or_insert_with(key, move || async move {
            let brief = RoundBrief {
                word_pair: pair,
                mole_model: &setup.mole_model,
                round_number: 1,
                previous_dialogues: &[],
            };
            let dialogues = generate_round(
                ctx.generator.clone(),
                &setup.turn_order,
                &brief,
                &ctx.config.fallback_message,
            )
            .await;

            GameState {
                state_hash: key.to_string(),
                date: setup.date,
                round_number: 1,
                remaining_models: setup.turn_order.clone(),
                action: Action::Start,
                eliminated_model: None,
                dialogues,
                game_over: false,
                winner: None,
            }
        })
        .await?;

    Ok(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_PARTICIPANTS;
    use std::collections::HashSet;

    fn pairs() -> Vec<WordPair> {
        (1..=4)
            .map(|id| WordPair {
                id,
                category: format!("c{}", id),
                innocent_word: format!("i{}", id),
                mole_word: format!("m{}", id),
                difficulty: 3,
            })
            .collect()
    }

    fn roster() -> Vec<String> {
        DEFAULT_PARTICIPANTS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn draw_uses_known_pair_and_permutes_roster() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
        let pairs = pairs();
        for _ in 0..20 {
            let draft = draw_setup(date, &pairs, &roster()).unwrap();
            assert!(pairs.iter().any(|p| p.id == draft.word_pair_id));
            assert!(roster().contains(&draft.mole_model));

            let order: HashSet<String> = draft.turn_order.iter().cloned().collect();
            let expected: HashSet<String> = roster().into_iter().collect();
            assert_eq!(draft.turn_order.len(), 6);
            assert_eq!(order, expected);
            assert_eq!(draft.date, date);
        }
    }

    #[test]
    fn draw_without_word_pairs_fails() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
        assert!(matches!(
            draw_setup(date, &[], &roster()),
            Err(SetupError::NoWordPairs)
        ));
        assert!(matches!(
            draw_setup(date, &pairs(), &[]),
            Err(SetupError::NoParticipants)
        ));
    }
}
