use mole::config::AppConfig;
use mole::context::GameContext;
use mole::scheduler::Scheduler;
use mole::{console, engine, error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());

    let config = AppConfig::load(&config_path).await?;
    let setup_time = config.setup_time()?;
    let ctx = GameContext::from_config(config).await?;

    let scheduler = Scheduler::new();
    let daily_ctx = ctx.clone();
    scheduler.add_daily_at(setup_time, move || {
        let ctx = daily_ctx.clone();
        async move {
            match engine::trigger_daily_setup(&ctx, ctx.today()).await {
                Ok(res) => info!(target: "Scheduler", "每日初始化完成: {}", res.date),
                Err(e) => error!(target: "Scheduler", "每日初始化失败: {}", e),
            }
        }
    });
    info!(target: "Scheduler", "每日初始化时间: {}", setup_time);

    // 启动时先准备好今天的对局
    if let Err(e) = engine::trigger_daily_setup(&ctx, ctx.today()).await {
        error!(target: "Setup", "今日初始化失败: {}", e);
    }

    console::run(&ctx).await;

    scheduler.shutdown();
    Ok(())
}
