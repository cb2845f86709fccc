use crate::info;
use chrono::{DateTime, Local, NaiveTime, TimeZone};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::AbortHandle;

/// 定时任务管理器
#[derive(Default)]
pub struct Scheduler {
    tasks: Mutex<HashMap<u64, AbortHandle>>,
    next_id: AtomicU64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个灵活调度任务
    ///
    /// `next_run` 接收当前时间，返回下一次执行时间；返回 None 时任务结束。
    pub fn add_schedule<C, F, Fut>(&self, mut next_run: C, mut task_gen: F) -> u64
    where
        C: FnMut(DateTime<Local>) -> Option<DateTime<Local>> + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut next_time = next_run(Local::now());

        let handle = tokio::spawn(async move {
            while let Some(target_time) = next_time {
                let now = Local::now();
                if target_time > now {
                    let wait = (target_time - now).to_std().unwrap_or(Duration::ZERO);
                    tokio::time::sleep(wait).await;
                }

                task_gen().await;

                next_time = next_run(Local::now());
            }
        });

        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.insert(id, handle.abort_handle());
        }
        id
    }

    /// 每天在本地时间 `at` 执行
    pub fn add_daily_at<F, Fut>(&self, at: NaiveTime, task_gen: F) -> u64
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.add_schedule(move |now| next_daily_run(now, at), task_gen)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn shutdown(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            if !tasks.is_empty() {
                info!(target: "Scheduler", "正在清理 {} 个定时任务...", tasks.len());
            }
            for (_, handle) in tasks.drain() {
                handle.abort();
            }
        }
    }
}

/// 今天的 `at` 还没到就是今天，否则顺延到明天
///
/// 夏令时跳变导致当天时间无效时同样顺延。
pub fn next_daily_run(now: DateTime<Local>, at: NaiveTime) -> Option<DateTime<Local>> {
    let today = now.date_naive();
    if let Some(target) = Local.from_local_datetime(&today.and_time(at)).single()
        && target > now
    {
        return Some(target);
    }

    let tomorrow = today.succ_opt()?;
    Local.from_local_datetime(&tomorrow.and_time(at)).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn daily_run_rolls_over_after_the_hour() {
        let at = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
        let early = Local.with_ymd_and_hms(2025, 4, 10, 3, 0, 0).single().unwrap();
        let late = Local.with_ymd_and_hms(2025, 4, 10, 9, 0, 0).single().unwrap();

        let same_day = next_daily_run(early, at).unwrap();
        assert_eq!(same_day.date_naive(), early.date_naive());
        assert_eq!(same_day.time(), at);

        let next_day = next_daily_run(late, at).unwrap();
        assert_eq!(next_day.date_naive(), late.date_naive().succ_opt().unwrap());
        assert_eq!(next_day.time(), at);
    }

    #[tokio::test]
    async fn one_shot_schedule_runs_and_shutdown_clears() {
        let scheduler = Scheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let mut fired = false;
        scheduler.add_schedule(
            move |now| {
                if fired {
                    None
                } else {
                    fired = true;
                    Some(now)
                }
            },
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.task_count(), 1);

        scheduler.shutdown();
        assert_eq!(scheduler.task_count(), 0);
    }
}
