use std::time::Duration;

/// Human readable elapsed time: `"840 milliseconds"`, `"3.2 seconds"`, `"2 minutes"`.
pub fn print_duration(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        return format!("{} milliseconds", millis);
    }

    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        let rounded = (secs * 10.0).round() / 10.0;
        return if rounded.fract() == 0.0 {
            format!("{} seconds", rounded as u64)
        } else {
            format!("{:.1} seconds", rounded)
        };
    }

    format!("{} minutes", elapsed.as_secs() / 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_unit() {
        assert_eq!(print_duration(Duration::from_millis(840)), "840 milliseconds");
        assert_eq!(print_duration(Duration::from_millis(3200)), "3.2 seconds");
        assert_eq!(print_duration(Duration::from_secs(12)), "12 seconds");
        assert_eq!(print_duration(Duration::from_secs(150)), "2 minutes");
    }
}
