use crate::context::GameContext;
use crate::engine::{self, PlayTurnRequest};
use crate::error::GameError;
use crate::{info, warn};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
daily               今日信息与第一轮发言
pass                跳过第一轮投票
eliminate <名字>    淘汰一名角色
goto <哈希>         跳转到已有状态
new                 回到今日初始状态
setup               手动触发今日初始化
help                显示本帮助
quit                退出";

/// 控制台指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Daily,
    Pass,
    Eliminate(String),
    Goto(String),
    New,
    Setup,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        let cmd = match head.to_ascii_lowercase().as_str() {
            "daily" => Self::Daily,
            "pass" => Self::Pass,
            "eliminate" | "kick" if !rest.is_empty() => Self::Eliminate(rest.to_string()),
            "goto" if !rest.is_empty() => Self::Goto(rest.to_string()),
            "new" => Self::New,
            "setup" => Self::Setup,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => return None,
        };
        Some(cmd)
    }
}

/// 单个会话：记住玩家当前所在的状态哈希
#[derive(Default)]
pub struct Session {
    pub current_hash: Option<String>,
}

impl Session {
    /// 执行一条指令，返回要打印的 JSON
    pub async fn execute(&mut self, ctx: &GameContext, cmd: Command) -> Result<String, GameError> {
        let today = ctx.today();
        match cmd {
            Command::Daily => {
                let info = engine::daily_info(ctx, today).await?;
                self.current_hash = Some(info.initial_state_hash.clone());
                Ok(to_json(&info))
            }
            Command::Pass => {
                let request = PlayTurnRequest::pass(self.current_hash.clone());
                self.play(ctx, &request).await
            }
            Command::Eliminate(target) => {
                let request = PlayTurnRequest::eliminate(target, self.current_hash.clone());
                self.play(ctx, &request).await
            }
            Command::Goto(hash) => {
                self.current_hash = Some(hash.clone());
                Ok(to_json(&serde_json::json!({ "current_state_hash": hash })))
            }
            Command::New => {
                self.current_hash = None;
                Ok(to_json(&serde_json::json!({ "current_state_hash": null })))
            }
            Command::Setup => Ok(to_json(&engine::trigger_daily_setup(ctx, today).await?)),
            Command::Help | Command::Quit => Ok(HELP.to_string()),
        }
    }

    async fn play(&mut self, ctx: &GameContext, request: &PlayTurnRequest) -> Result<String, GameError> {
        let response = engine::play_turn(ctx, ctx.today(), request).await?;
        self.current_hash = Some(response.state_hash.clone());
        Ok(to_json(&response))
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

/// 控制台入口：逐行读取标准输入直到 EOF 或 quit
pub async fn run(ctx: &GameContext) {
    info!(target: "Console", "已启动控制台模式，输入 help 查看指令");

    let mut reader = BufReader::new(tokio::io::stdin()).lines();
    let mut session = Session::default();

    while let Ok(Some(line)) = reader.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(cmd) = Command::parse(line) else {
            warn!(target: "Console", "未知指令: {}", line);
            continue;
        };
        if cmd == Command::Quit {
            break;
        }

        match session.execute(ctx, cmd).await {
            Ok(out) => println!("{}", out),
            Err(e) if e.is_validation() => warn!(target: "Console", "{}", e),
            Err(e) => crate::error!(target: "Console", "处理指令时出错: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("daily"), Some(Command::Daily));
        assert_eq!(Command::parse("  PASS "), Some(Command::Pass));
        assert_eq!(
            Command::parse("eliminate Llama"),
            Some(Command::Eliminate("Llama".into()))
        );
        assert_eq!(
            Command::parse("goto 0123abcd"),
            Some(Command::Goto("0123abcd".into()))
        );
        assert_eq!(Command::parse("exit"), Some(Command::Quit));
    }

    #[test]
    fn rejects_missing_arguments_and_unknown_words() {
        assert_eq!(Command::parse("eliminate"), None);
        assert_eq!(Command::parse("goto   "), None);
        assert_eq!(Command::parse("vote Grok"), None);
    }
}
