/*
 * Generation timestamps embedded in packaged documents. The stamp is purely
 * diagnostic, so packagers accept it as a parameter and tests pass a fixed one.
 */
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const STAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationStamp(String);

impl GenerationStamp {
    /*
     * Captures the current local time. The local offset cannot always be
     * determined (for example once other threads are running on some Unix
     * platforms); UTC is used then and labelled as such.
     */
    pub fn now() -> Self {
        match OffsetDateTime::now_local() {
            Ok(local) => Self::from_datetime(local, ""),
            Err(e) => {
                log::debug!("GenerationStamp: Local offset unavailable ({e}), using UTC.");
                Self::from_datetime(OffsetDateTime::now_utc(), " UTC")
            }
        }
    }

    fn from_datetime(moment: OffsetDateTime, suffix: &str) -> Self {
        let text = match moment.format(STAMP_FORMAT) {
            Ok(formatted) => format!("{formatted}{suffix}"),
            Err(e) => {
                log::warn!("GenerationStamp: Failed to format timestamp: {e}");
                moment.to_string()
            }
        };
        GenerationStamp(text)
    }

    pub fn fixed(text: impl Into<String>) -> Self {
        GenerationStamp(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_stamp_formats_date_and_time() {
        let stamp = GenerationStamp::from_datetime(datetime!(2024-03-09 07:05:01 UTC), "");
        assert_eq!(stamp.as_str(), "2024-03-09 07:05:01");
    }

    #[test]
    fn test_now_is_not_empty() {
        assert!(!GenerationStamp::now().as_str().is_empty());
    }
}
