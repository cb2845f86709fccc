use crate::model::Action;
use chrono::NaiveDate;

/// 淘汰对象为空时的规范写法
const NO_ELIMINATION: &str = "";

/// 计算游戏状态的内容哈希 (MD5, 32 位小写十六进制)
///
/// 参与者先按字典序排序，因此哈希只取决于集合成员，与传入顺序无关。
/// `None`、空串和 `"none"` 视为同一个「无淘汰」。
pub fn state_hash<S: AsRef<str>>(
    date: NaiveDate,
    round_number: u32,
    participants: &[S],
    action: Action,
    eliminated: Option<&str>,
) -> String {
    let input = canonical_input(date, round_number, participants, action, eliminated);
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// 哈希原文: date|round|sorted_csv(participants)|action|eliminated
pub(crate) fn canonical_input<S: AsRef<str>>(
    date: NaiveDate,
    round_number: u32,
    participants: &[S],
    action: Action,
    eliminated: Option<&str>,
) -> String {
    let mut sorted: Vec<&str> = participants.iter().map(|p| p.as_ref()).collect();
    sorted.sort_unstable();

    format!(
        "{}|{}|{}|{}|{}",
        date.format("%Y-%m-%d"),
        round_number,
        sorted.join(","),
        action.as_str(),
        normalize_eliminated(eliminated)
    )
}

fn normalize_eliminated(eliminated: Option<&str>) -> &str {
    match eliminated.map(str::trim) {
        Some(name) if !name.is_empty() && !name.eq_ignore_ascii_case("none") => name,
        _ => NO_ELIMINATION,
    }
}
