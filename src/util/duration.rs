const SECOND: i64 = 1000;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Compact form of a millisecond duration keeping the two largest units,
/// e.g. `2d 3h`, `4m 5s`, `7s`.
pub fn readable_duration(millis: i64) -> String {
    let millis = millis.max(0);
    let days = millis / DAY;
    let hours = (millis % DAY) / HOUR;
    let minutes = (millis % HOUR) / MINUTE;
    let seconds = (millis % MINUTE) / SECOND;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
