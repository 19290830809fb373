use chrono::NaiveTime;
use rand::Rng;
use tokio::sync::watch;

use crate::config::ScheduleSettings;

/// Trading window for randomized monitoring checks: [09:30, 15:15),
/// minute granularity
const WINDOW_START_MIN: u32 = 9 * 60 + 30;
const WINDOW_END_MIN: u32 = 15 * 60 + 15;

/// A phase of the daily cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Screening,
    SignalGeneration,
    Monitoring,
    Reporting,
}

/// One scheduled run of a phase at an exchange-local time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub time: NaiveTime,
    pub phase: Phase,
}

/// The full day's task list, sorted by time.
///
/// Fixed slots come from settings; monitoring runs at 2-4 random minutes
/// inside the trading window, drawn without replacement so no two checks
/// collide.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    tasks: Vec<ScheduledTask>,
}

impl DailySchedule {
    pub fn build(settings: &ScheduleSettings, rng: &mut impl Rng) -> Self {
        let mut tasks = vec![
            ScheduledTask {
                time: settings.screening,
                phase: Phase::Screening,
            },
            ScheduledTask {
                time: settings.signal_generation,
                phase: Phase::SignalGeneration,
            },
            ScheduledTask {
                time: settings.reporting,
                phase: Phase::Reporting,
            },
        ];

        let lo = settings.min_monitor_checks.max(1);
        let hi = settings.max_monitor_checks.max(lo);
        let count = rng.gen_range(lo..=hi);

        let window = (WINDOW_END_MIN - WINDOW_START_MIN) as usize;
        for offset in rand::seq::index::sample(rng, window, count.min(window)) {
            let minute = WINDOW_START_MIN + offset as u32;
            if let Some(time) = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0) {
                tasks.push(ScheduledTask {
                    time,
                    phase: Phase::Monitoring,
                });
            }
        }

        tasks.sort_by_key(|t| t.time);
        Self { tasks }
    }

    pub fn tasks(&self) -> &[ScheduledTask] {
        &self.tasks
    }

    /// Tasks still due after `now`, in order
    pub fn remaining(&self, now: NaiveTime) -> impl Iterator<Item = &ScheduledTask> {
        self.tasks.iter().filter(move |t| t.time > now)
    }
}

/// Sleep until the target time of day or until shutdown is signalled.
/// Returns false on shutdown. A target already in the past is due
/// immediately.
pub async fn wait_until(target: NaiveTime, shutdown: &mut watch::Receiver<bool>) -> bool {
    let now = chrono::Local::now().time();
    let delta = target.signed_duration_since(now);
    if delta <= chrono::Duration::zero() {
        return true;
    }
    let Ok(delay) = delta.to_std() else {
        return true;
    };

    loop {
        tokio::select! {
            _ = tokio::time::sleep(delay) => return true,
            changed = shutdown.changed() => {
                match changed {
                    Ok(()) if *shutdown.borrow() => return false,
                    Ok(()) => continue,
                    // Sender gone: treat as shutdown
                    Err(_) => return false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_monitoring_slots_within_window() {
        let settings = ScheduleSettings::default();
        let window_start = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let window_end = NaiveTime::from_hms_opt(15, 15, 0).unwrap();

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let schedule = DailySchedule::build(&settings, &mut rng);

            let slots: Vec<NaiveTime> = schedule
                .tasks()
                .iter()
                .filter(|t| t.phase == Phase::Monitoring)
                .map(|t| t.time)
                .collect();

            assert!(slots.len() >= 2 && slots.len() <= 4, "got {}", slots.len());
            for slot in &slots {
                assert!(*slot >= window_start && *slot < window_end, "slot {slot}");
            }

            // Without replacement: all distinct
            let mut dedup = slots.clone();
            dedup.dedup();
            assert_eq!(dedup.len(), slots.len());
        }
    }

    #[test]
    fn test_schedule_sorted_and_complete() {
        let settings = ScheduleSettings::default();
        let mut rng = StdRng::seed_from_u64(7);
        let schedule = DailySchedule::build(&settings, &mut rng);

        let times: Vec<NaiveTime> = schedule.tasks().iter().map(|t| t.time).collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);

        assert!(schedule.tasks().iter().any(|t| t.phase == Phase::Screening));
        assert!(schedule
            .tasks()
            .iter()
            .any(|t| t.phase == Phase::SignalGeneration));
        assert!(schedule.tasks().iter().any(|t| t.phase == Phase::Reporting));
    }

    #[test]
    fn test_remaining_filters_past_tasks() {
        let settings = ScheduleSettings::default();
        let mut rng = StdRng::seed_from_u64(7);
        let schedule = DailySchedule::build(&settings, &mut rng);

        let afternoon = NaiveTime::from_hms_opt(16, 0, 0).unwrap();
        let left: Vec<_> = schedule.remaining(afternoon).collect();
        assert_eq!(left.len(), 1); // only the 18:00 report
        assert_eq!(left[0].phase, Phase::Reporting);
    }

    #[tokio::test]
    async fn test_wait_until_past_time_is_due() {
        let (_tx, mut rx) = watch::channel(false);
        let now = chrono::Local::now().time();
        let (past, wrap) = now.overflowing_sub_signed(chrono::Duration::minutes(5));
        if wrap != 0 {
            return; // within five minutes of midnight
        }
        assert!(wait_until(past, &mut rx).await);
    }

    #[tokio::test]
    async fn test_wait_until_cancelled_by_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        let now = chrono::Local::now().time();
        let (far, wrap) = now.overflowing_add_signed(chrono::Duration::hours(2));
        if wrap != 0 {
            return; // within two hours of midnight
        }

        let handle = tokio::spawn(async move { wait_until(far, &mut rx).await });
        tx.send(true).unwrap();
        assert!(!handle.await.unwrap());
    }
}
