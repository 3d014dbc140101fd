use time::OffsetDateTime;

/// Midnight UTC of the current day.
pub fn start_of_today_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_time(time::Time::MIDNIGHT)
}

/// Earliest `ts` an event row may carry and survive a prune, i.e.
/// `start_of_today_UTC - (retention_days - 1) days`.
pub fn retention_cutoff(retention_days: i64) -> OffsetDateTime {
    let keep_from = retention_days.saturating_sub(1).max(0);
    start_of_today_utc() - time::Duration::days(keep_from)
}
