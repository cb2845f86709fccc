use super::Store;
use crate::info;
use crate::model::NewWordPair;
use serde::Deserialize;

// 内置词库，word_pairs 表为空时写入
const DEFAULT_WORD_PAIRS: &str = include_str!("../../res/word_pairs.toml");

#[derive(Debug, Deserialize, Default)]
pub struct WordPairList {
    #[serde(default)]
    pub word_pair: Vec<NewWordPair>,
}

pub fn parse_word_pairs(content: &str) -> anyhow::Result<Vec<NewWordPair>> {
    let list: WordPairList = toml::from_str(content)?;
    Ok(list.word_pair)
}

/// 词库为空时写入内置词对，返回写入条数
pub async fn seed_word_pairs(store: &dyn Store) -> anyhow::Result<usize> {
    if !store.word_pairs().await?.is_empty() {
        return Ok(0);
    }

    let pairs = parse_word_pairs(DEFAULT_WORD_PAIRS)?;
    let count = pairs.len();
    for pair in pairs {
        store.insert_word_pair(pair).await?;
    }

    info!(target: "Store", "已写入 {} 组内置词对", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn bundled_word_pairs_parse() {
        let pairs = parse_word_pairs(DEFAULT_WORD_PAIRS).unwrap();
        assert!(pairs.len() >= 6);
        assert!(pairs.iter().all(|p| p.innocent_word != p.mole_word));
    }

    #[test]
    fn difficulty_defaults_to_three() {
        let pairs = parse_word_pairs(
            r#"
            [[word_pair]]
            category = "Renk"
            innocent_word = "Mavi"
            mole_word = "Lacivert"
            "#,
        )
        .unwrap();
        assert_eq!(pairs[0].difficulty, 3);
    }

    #[tokio::test]
    async fn seeding_only_fills_an_empty_table() {
        let store = MemoryStore::new();
        let written = seed_word_pairs(&store).await.unwrap();
        assert!(written > 0);
        assert_eq!(seed_word_pairs(&store).await.unwrap(), 0);
        assert_eq!(store.word_pairs().await.unwrap().data.len(), written);
    }
}
