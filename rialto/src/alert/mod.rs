//! Alerts are the append-only core of the system. An alert is created by an admin
//! action, broadcast to live listeners, and removed by an admin delete. It is never
//! mutated in place.
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertPriority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    BotSignal,
    MarketUpdate,
    #[default]
    News,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::BotSignal => "BOT_SIGNAL",
            AlertType::MarketUpdate => "MARKET_UPDATE",
            AlertType::News => "NEWS",
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub message: String,
    pub priority: AlertPriority,
    #[serde(rename = "type")]
    pub typ: AlertType,
    pub bot_name: Option<String>,
    pub pnl: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields supplied by the caller when creating an alert. Identifier and timestamp
/// are owned by the log.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: AlertPriority,
    #[serde(default, rename = "type")]
    pub typ: AlertType,
    pub bot_name: Option<String>,
    pub pnl: Option<String>,
}

impl NewAlert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AlertLog {
    inner: Vec<Alert>,
    last_id: u64,
}

impl AlertLog {
    pub fn new() -> Self {
        Self {
            inner: Vec::new(),
            last_id: 0,
        }
    }

    // Millisecond timestamps bumped past the last issued value so that two creates
    // within the same millisecond still get distinct, increasing identifiers.
    fn next_id(&mut self) -> String {
        let now_millis = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64;
        let id = now_millis.max(self.last_id + 1);
        self.last_id = id;
        id.to_string()
    }

    pub fn create(&mut self, new_alert: NewAlert) -> Alert {
        let alert = Alert {
            id: self.next_id(),
            title: new_alert.title,
            message: new_alert.message,
            priority: new_alert.priority,
            typ: new_alert.typ,
            bot_name: new_alert.bot_name,
            pnl: new_alert.pnl,
            created_at: OffsetDateTime::now_utc(),
        };
        // Newest at the front so that equal timestamps still list latest-first
        self.inner.insert(0, alert.clone());
        alert
    }

    /// Returns alerts newest-first. `None` or `ALL` returns everything; an
    /// unrecognized type matches nothing.
    pub fn list(&self, type_filter: Option<&str>) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = match type_filter {
            None | Some("ALL") => self.inner.clone(),
            Some(typ) => self
                .inner
                .iter()
                .filter(|alert| alert.typ.as_str() == typ)
                .cloned()
                .collect(),
        };
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts
    }

    /// Removes the alert with the given id, returning it if it existed. Repeating
    /// a delete has no effect.
    pub fn delete(&mut self, id: &str) -> Option<Alert> {
        let position = self.inner.iter().position(|alert| alert.id == id)?;
        Some(self.inner.remove(position))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{AlertLog, AlertPriority, AlertType, NewAlert};

    #[test]
    fn test_that_list_returns_newest_first() {
        let mut log = AlertLog::new();
        let a = log.create(NewAlert::new("A", "first"));
        let b = log.create(NewAlert::new("B", "second"));
        let c = log.create(NewAlert::new("C", "third"));

        let listed = log.list(None);
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].id, c.id);
        assert_eq!(listed[1].id, b.id);
        assert_eq!(listed[2].id, a.id);
    }

    #[test]
    fn test_that_ids_are_distinct_within_same_millisecond() {
        let mut log = AlertLog::new();
        let a = log.create(NewAlert::new("A", "first"));
        let b = log.create(NewAlert::new("B", "second"));
        assert_ne!(a.id, b.id);
        assert!(b.id.parse::<u64>().unwrap() > a.id.parse::<u64>().unwrap());
    }

    #[test]
    fn test_that_type_filter_matches_only_that_type() {
        let mut log = AlertLog::new();
        let mut signal = NewAlert::new("Bot fired", "long ABC");
        signal.typ = AlertType::BotSignal;
        signal.bot_name = Some("scalper".to_string());
        signal.pnl = Some("+120.50".to_string());
        log.create(signal);
        log.create(NewAlert::new("Headline", "news body"));

        let signals = log.list(Some("BOT_SIGNAL"));
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].typ, AlertType::BotSignal);

        assert_eq!(log.list(Some("ALL")).len(), 2);
        // Unrecognized types match nothing rather than erroring
        assert!(log.list(Some("GARBAGE")).is_empty());
    }

    #[test]
    fn test_that_repeat_delete_has_no_effect() {
        let mut log = AlertLog::new();
        let alert = log.create(NewAlert::new("A", "first"));

        assert!(log.delete(&alert.id).is_some());
        assert!(log.delete(&alert.id).is_none());
        assert!(log.is_empty());
    }

    #[test]
    fn test_that_defaults_are_medium_news() {
        let new_alert: NewAlert =
            serde_json::from_str(r#"{"title": "A", "message": "first"}"#).unwrap();
        assert_eq!(new_alert.priority, AlertPriority::Medium);
        assert_eq!(new_alert.typ, AlertType::News);
    }

    #[test]
    fn test_that_alert_serializes_with_wire_names() {
        let mut log = AlertLog::new();
        let mut new_alert = NewAlert::new("Bot fired", "long ABC");
        new_alert.bot_name = Some("scalper".to_string());
        let alert = log.create(new_alert);

        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["type"], "NEWS");
        assert_eq!(value["priority"], "MEDIUM");
        assert_eq!(value["botName"], "scalper");
        assert!(value["createdAt"].is_string());
    }
}
