use super::entity::{daily_setup, game_state, word_pair};
use super::{Rows, Store, StoreResult};
use crate::error::StoreError;
use crate::info;
use crate::model::{
    Action, DailySetup, Dialogue, GameState, NewDailySetup, NewWordPair, Winner, WordPair,
};
use chrono::NaiveDate;
use futures_util::future::BoxFuture;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Schema, SqlErr,
};
use std::path::Path;
use tokio::fs;

/// 基于 SeaORM 的存储实现 (默认 SQLite)
#[derive(Clone)]
pub struct SqlStore {
    db: DatabaseConnection,
}

impl SqlStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// 连接数据库并确保三张表存在
    pub async fn connect(url: &str) -> Result<Self, DbErr> {
        // sqlite:data/xxx.db 需要目录先存在
        if let Some(file) = url.strip_prefix("sqlite:")
            && let Some(parent) = Path::new(file.split('?').next().unwrap_or(file)).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            let _ = fs::create_dir_all(parent).await;
        }

        let db = Database::connect(url).await?;
        info!(target: "Database", "连接成功: {}", url);

        let store = Self::new(db);
        store.create_tables().await?;
        Ok(store)
    }

    pub async fn create_tables(&self) -> Result<(), DbErr> {
        let db = &self.db;
        let builder = db.get_database_backend();
        let schema = Schema::new(builder);

        let mut create_word_pairs = schema.create_table_from_entity(word_pair::Entity);
        db.execute(builder.build(create_word_pairs.if_not_exists()))
            .await?;

        let mut create_daily_setup = schema.create_table_from_entity(daily_setup::Entity);
        db.execute(builder.build(create_daily_setup.if_not_exists()))
            .await?;

        let mut create_game_states = schema.create_table_from_entity(game_state::Entity);
        db.execute(builder.build(create_game_states.if_not_exists()))
            .await?;

        // 按日期回看某天的所有状态
        let idx_state_date = sea_orm::sea_query::Index::create()
            .name("idx_game_states_date")
            .table(game_state::Entity)
            .col(game_state::Column::Date)
            .if_not_exists()
            .to_owned();
        db.execute(builder.build(&idx_state_date)).await?;

        Ok(())
    }
}

fn insert_error(e: DbErr) -> StoreError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::Duplicate,
        _ => StoreError::Backend(e),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| StoreError::Column(format!("date '{}': {}", raw, e)))
}

fn word_pair_from(m: word_pair::Model) -> WordPair {
    WordPair {
        id: m.id,
        category: m.category,
        innocent_word: m.innocent_word,
        mole_word: m.mole_word,
        difficulty: m.difficulty,
    }
}

fn daily_setup_from(m: daily_setup::Model) -> Result<DailySetup, StoreError> {
    Ok(DailySetup {
        id: m.id,
        date: parse_date(&m.date)?,
        word_pair_id: m.word_pair_id,
        mole_model: m.mole_model,
        turn_order: serde_json::from_str(&m.turn_order)?,
    })
}

fn game_state_from(m: game_state::Model) -> Result<GameState, StoreError> {
    let round_number = u32::try_from(m.round_number)
        .map_err(|_| StoreError::Column(format!("round_number {}", m.round_number)))?;
    let action = m
        .action
        .parse::<Action>()
        .map_err(|e| StoreError::Column(e.to_string()))?;
    let winner = match m.winner.as_deref() {
        Some(raw) => Some(
            Winner::parse(raw).ok_or_else(|| StoreError::Column(format!("winner '{}'", raw)))?,
        ),
        None => None,
    };
    let dialogues: Vec<Dialogue> = serde_json::from_str(&m.dialogues)?;

    Ok(GameState {
        state_hash: m.state_hash,
        date: parse_date(&m.date)?,
        round_number,
        remaining_models: serde_json::from_str(&m.remaining_models)?,
        action,
        eliminated_model: m.eliminated_model,
        dialogues,
        game_over: m.game_over,
        winner,
    })
}

fn collect<M, T>(
    models: Vec<M>,
    convert: fn(M) -> Result<T, StoreError>,
) -> StoreResult<T> {
    models
        .into_iter()
        .map(convert)
        .collect::<Result<Vec<_>, _>>()
        .map(Rows::new)
}

impl Store for SqlStore {
    fn word_pairs(&self) -> BoxFuture<'_, StoreResult<WordPair>> {
        Box::pin(async move {
            let models = word_pair::Entity::find()
                .order_by_asc(word_pair::Column::Id)
                .all(&self.db)
                .await?;
            Ok(Rows::new(models.into_iter().map(word_pair_from).collect()))
        })
    }

    fn word_pair(&self, id: i32) -> BoxFuture<'_, StoreResult<WordPair>> {
        Box::pin(async move {
            let model = word_pair::Entity::find()
                .filter(word_pair::Column::Id.eq(id))
                .one(&self.db)
                .await?;
            Ok(Rows::new(model.into_iter().map(word_pair_from).collect()))
        })
    }

    fn insert_word_pair(&self, pair: NewWordPair) -> BoxFuture<'_, StoreResult<WordPair>> {
        Box::pin(async move {
            let active = word_pair::ActiveModel {
                category: Set(pair.category),
                innocent_word: Set(pair.innocent_word),
                mole_word: Set(pair.mole_word),
                difficulty: Set(pair.difficulty),
                ..Default::default()
            };
            let model = active.insert(&self.db).await.map_err(insert_error)?;
            Ok(Rows::new(vec![word_pair_from(model)]))
        })
    }

    fn daily_setup(&self, date: NaiveDate) -> BoxFuture<'_, StoreResult<DailySetup>> {
        Box::pin(async move {
            let models = daily_setup::Entity::find()
                .filter(daily_setup::Column::Date.eq(date.to_string()))
                .all(&self.db)
                .await?;
            collect(models, daily_setup_from)
        })
    }

    fn insert_daily_setup(&self, setup: NewDailySetup) -> BoxFuture<'_, StoreResult<DailySetup>> {
        Box::pin(async move {
            let active = daily_setup::ActiveModel {
                date: Set(setup.date.to_string()),
                word_pair_id: Set(setup.word_pair_id),
                mole_model: Set(setup.mole_model),
                turn_order: Set(serde_json::to_string(&setup.turn_order)?),
                ..Default::default()
            };
            let model = active.insert(&self.db).await.map_err(insert_error)?;
            collect(vec![model], daily_setup_from)
        })
    }

    fn game_state<'a>(&'a self, state_hash: &'a str) -> BoxFuture<'a, StoreResult<GameState>> {
        Box::pin(async move {
            let models = game_state::Entity::find()
                .filter(game_state::Column::StateHash.eq(state_hash))
                .all(&self.db)
                .await?;
            collect(models, game_state_from)
        })
    }

    fn insert_game_state(&self, state: GameState) -> BoxFuture<'_, StoreResult<GameState>> {
        Box::pin(async move {
            let round_number = i32::try_from(state.round_number)
                .map_err(|_| StoreError::Column(format!("round_number {}", state.round_number)))?;
            let active = game_state::ActiveModel {
                state_hash: Set(state.state_hash.clone()),
                date: Set(state.date.to_string()),
                round_number: Set(round_number),
                remaining_models: Set(serde_json::to_string(&state.remaining_models)?),
                action: Set(state.action.as_str().to_string()),
                eliminated_model: Set(state.eliminated_model.clone()),
                dialogues: Set(serde_json::to_string(&state.dialogues)?),
                game_over: Set(state.game_over),
                winner: Set(state.winner.map(|w| w.as_str().to_string())),
            };
            game_state::Entity::insert(active)
                .exec_without_returning(&self.db)
                .await
                .map_err(insert_error)?;
            Ok(Rows::new(vec![state]))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db() -> SqlStore {
        SqlStore::connect("sqlite::memory:").await.unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
    }

    fn pair(category: &str) -> NewWordPair {
        NewWordPair {
            category: category.into(),
            innocent_word: "Kedi".into(),
            mole_word: "Köpek".into(),
            difficulty: 2,
        }
    }

    #[tokio::test]
    async fn word_pairs_get_ids_in_insert_order() {
        let store = memory_db().await;
        let first = store.insert_word_pair(pair("Hayvan")).await.unwrap().inserted().unwrap();
        let second = store.insert_word_pair(pair("Evcil")).await.unwrap().inserted().unwrap();
        assert!(second.id > first.id);

        let all = store.word_pairs().await.unwrap();
        assert_eq!(all.data, vec![first.clone(), second]);

        let one = store.word_pair(first.id).await.unwrap();
        assert_eq!(one.data, vec![first]);
        assert!(store.word_pair(9999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn daily_setup_is_unique_per_date() {
        let store = memory_db().await;
        let setup = NewDailySetup {
            date: day(),
            word_pair_id: 1,
            mole_model: "Grok".into(),
            turn_order: vec!["Grok".into(), "Claude".into(), "Llama".into()],
        };

        let stored = store
            .insert_daily_setup(setup.clone())
            .await
            .unwrap()
            .inserted()
            .unwrap();
        assert_eq!(stored.turn_order, setup.turn_order);
        assert_eq!(stored.date, day());

        let again = store.insert_daily_setup(setup).await;
        assert!(matches!(again, Err(StoreError::Duplicate)));

        let found = store.daily_setup(day()).await.unwrap();
        assert_eq!(found.data, vec![stored]);
        assert!(store.daily_setup(day().succ_opt().unwrap()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn game_state_round_trips_and_rejects_duplicates() {
        let store = memory_db().await;
        let state = GameState {
            state_hash: "0123456789abcdef0123456789abcdef".into(),
            date: day(),
            round_number: 3,
            remaining_models: vec!["Claude".into(), "Grok".into(), "Llama".into()],
            action: Action::Eliminate,
            eliminated_model: Some("Gemini".into()),
            dialogues: vec![Dialogue {
                model_name: "Claude".into(),
                message: "Tüylü bir şey".into(),
                internal_thought: "Grok garip konuştu".into(),
            }],
            game_over: false,
            winner: None,
        };

        store.insert_game_state(state.clone()).await.unwrap();
        let loaded = store.game_state(&state.state_hash).await.unwrap();
        assert_eq!(loaded.data, vec![state.clone()]);

        let mut conflicting = state.clone();
        conflicting.game_over = true;
        conflicting.winner = Some(Winner::Mole);
        assert!(matches!(
            store.insert_game_state(conflicting).await,
            Err(StoreError::Duplicate)
        ));

        // 冲突写入不能改动已有行
        let still = store.game_state(&state.state_hash).await.unwrap().first();
        assert_eq!(still, Some(state));
    }
}
