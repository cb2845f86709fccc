use sea_orm::DbErr;
use thiserror::Error;

/// 玩家请求不合法，直接拒绝，不做重试
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("PASS is only allowed in round 1 (current round: {round})")]
    PassNotAllowed { round: u32 },
    #[error("target_model is required for ELIMINATE")]
    MissingTarget,
    #[error("unknown target model: {0}")]
    UnknownTarget(String),
    #[error("unknown state hash: {0}")]
    UnknownState(String),
    #[error("state {hash} belongs to {date}, not today")]
    StaleState { hash: String, date: String },
    #[error("game is already over")]
    GameOver,
}

/// 每日初始化失败，对调用方是致命错误
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("no word pairs found in database")]
    NoWordPairs,
    #[error("word pair {0} referenced by daily setup does not exist")]
    MissingWordPair(i32),
    #[error("participant roster is empty")]
    NoParticipants,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row already exists")]
    Duplicate,
    #[error("insert returned no rows")]
    NoRows,
    #[error("database error: {0}")]
    Backend(#[from] DbErr),
    #[error("column decode error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("invalid column value: {0}")]
    Column(String),
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GameError {
    /// 路由层据此区分「请求被拒绝」与「服务端故障」
    pub fn is_validation(&self) -> bool {
        matches!(self, GameError::Validation(_))
    }
}

pub type GameResult<T> = Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_validation_errors_are_rejections() {
        let rejected = GameError::from(ValidationError::MissingTarget);
        let fatal = GameError::from(SetupError::NoWordPairs);
        let store = GameError::from(StoreError::Duplicate);

        assert!(rejected.is_validation());
        assert!(!fatal.is_validation());
        assert!(!store.is_validation());
    }

    #[test]
    fn messages_name_the_offending_value() {
        let err = ValidationError::PassNotAllowed { round: 3 };
        assert_eq!(
            err.to_string(),
            "PASS is only allowed in round 1 (current round: 3)"
        );
        assert_eq!(
            GameError::from(ValidationError::UnknownTarget("Bard".into())).to_string(),
            "unknown target model: Bard"
        );
    }
}
