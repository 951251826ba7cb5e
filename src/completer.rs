use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::engine::BookingEngine;

/// Background task that periodically completes confirmed bookings whose start has passed.
pub async fn run_completer(engine: Arc<BookingEngine>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match engine.complete_elapsed().await {
            Ok(done) if !done.is_empty() => info!("completed {} elapsed bookings", done.len()),
            Ok(_) => {}
            Err(e) => warn!("completion sweep failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EngineConfig;
    use crate::model::*;
    use crate::notify::NotifyHub;
    use crate::ports::BookingStore;
    use crate::store::InMemoryStore;
    use chrono::{NaiveDate, Weekday};
    use ulid::Ulid;

    #[tokio::test]
    async fn completer_sweeps_started_bookings() {
        let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let clock = Arc::new(ManualClock::new(TimeOfDay::hm(8, 0).on(monday)));
        let store = Arc::new(InMemoryStore::new());
        let provider = Ulid::new();
        let service = ServiceInfo {
            id: Ulid::new(),
            owner_id: provider,
            duration_minutes: 60,
            is_active: true,
        };
        store.register_service(service.clone());
        let engine = Arc::new(
            BookingEngine::new(
                store.clone(),
                store.clone(),
                store.clone(),
                Arc::new(NotifyHub::new(8)),
                EngineConfig::default(),
            )
            .with_clock(clock.clone()),
        );
        let week = WeeklySchedule::closed()
            .with_day(
                Weekday::Mon,
                vec![Segment::new(TimeOfDay::hm(9, 0), TimeOfDay::hm(12, 0)).unwrap()],
            )
            .unwrap();
        engine
            .replace_weekly_schedule(provider, service.id, week)
            .await
            .unwrap();

        let b = engine
            .create_booking(Ulid::new(), service.id, TimeOfDay::hm(9, 0).on(monday), None)
            .await
            .unwrap();
        engine.confirm_booking(provider, b.id).await.unwrap();
        clock.set(TimeOfDay::hm(9, 30).on(monday));

        let task = tokio::spawn(run_completer(engine.clone(), Duration::from_millis(10)));
        let mut status = BookingStatus::Confirmed;
        for _ in 0..100 {
            status = store.get_by_id(b.id).await.unwrap().unwrap().status;
            if status == BookingStatus::Completed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        task.abort();
        assert_eq!(status, BookingStatus::Completed);
    }
}
