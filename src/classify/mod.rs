//! Time control and venue classification from PGN headers
//!
//! Event-keyword rules are checked first, in order, so tournament names can
//! override the raw TimeControl header. The full rule table lives in an
//! external TOML file; a compact built-in set covers the common cases.

use serde::Deserialize;
use std::path::Path;

use crate::{ChessError, Result, TimeClass, Venue};

/// One ordered classification rule: substring match on the Event header
#[derive(Debug, Clone)]
pub struct TimeControlRule {
    pub keyword: String,
    pub class: TimeClass,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(rename = "rule")]
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    keyword: String,
    class: String,
}

/// Classifies games into time control classes
pub struct TimeControlClassifier {
    rules: Vec<TimeControlRule>,
}

impl Default for TimeControlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeControlClassifier {
    /// Classifier with the built-in rule set
    pub fn new() -> Self {
        TimeControlClassifier {
            rules: Self::default_rules(),
        }
    }

    pub fn from_rules(rules: Vec<TimeControlRule>) -> Self {
        TimeControlClassifier { rules }
    }

    /// Load ordered rules from a TOML file with `[[rule]]` entries
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChessError::Config(format!(
                "Failed to read rule file {}: {}",
                path.display(),
                e
            ))
        })?;
        let file: RuleFile = toml::from_str(&content)
            .map_err(|e| ChessError::Config(format!("Failed to parse rule file: {}", e)))?;

        let mut rules = Vec::with_capacity(file.rules.len());
        for raw in file.rules {
            let class = TimeClass::from_code(&raw.class).ok_or_else(|| {
                ChessError::Config(format!(
                    "Unknown time class '{}' for keyword '{}'",
                    raw.class, raw.keyword
                ))
            })?;
            rules.push(TimeControlRule {
                keyword: raw.keyword.to_lowercase(),
                class,
            });
        }
        Ok(TimeControlClassifier { rules })
    }

    /// Load rules from the file if it exists, otherwise fall back to the
    /// built-in set
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!(
                "Rule file {} not found, using built-in rules",
                path.display()
            );
            Ok(Self::new())
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Classify a game from its Event and TimeControl headers.
    ///
    /// Keyword rules win over the TimeControl header; the first matching
    /// rule decides. Returns None when nothing matches, which callers
    /// treat as an unusable game.
    pub fn classify(&self, event: &str, time_control: &str) -> Option<TimeClass> {
        let event_lower = event.to_lowercase();
        for rule in &self.rules {
            if event_lower.contains(&rule.keyword) {
                return Some(rule.class);
            }
        }

        // Correspondence time controls look like "1/86400"
        if time_control.starts_with("1/") {
            return Some(TimeClass::Daily);
        }

        let base_time: u32 = time_control.split('+').next()?.parse().ok()?;
        match base_time {
            1..=179 => Some(TimeClass::Bullet),
            180..=599 => Some(TimeClass::Blitz),
            600..=1799 => Some(TimeClass::Rapid),
            t if t >= 1800 => Some(TimeClass::Classical),
            _ => None,
        }
    }

    /// Built-in rules, checked in order. chess.com monthly titled events
    /// carry the month name in the Event header and are all blitz.
    fn default_rules() -> Vec<TimeControlRule> {
        let entries: &[(&str, TimeClass)] = &[
            ("le trophee ccas, final", TimeClass::Rapid),
            ("corus group a", TimeClass::Classical),
            ("january", TimeClass::Blitz),
            ("february", TimeClass::Blitz),
            ("march", TimeClass::Blitz),
            ("april", TimeClass::Blitz),
            ("may", TimeClass::Blitz),
            ("june", TimeClass::Blitz),
            ("july", TimeClass::Blitz),
            ("august", TimeClass::Blitz),
            ("september", TimeClass::Blitz),
            ("october", TimeClass::Blitz),
            ("november", TimeClass::Blitz),
            ("december", TimeClass::Blitz),
            ("speed chess", TimeClass::Blitz),
            ("bullet brawl", TimeClass::Bullet),
            ("grand chess tour", TimeClass::Classical),
            ("candidates-chess-tournament", TimeClass::Classical),
            ("london chess classic", TimeClass::Classical),
            ("chess.com classic div 2 l", TimeClass::Rapid),
            ("world rapid", TimeClass::Rapid),
            ("world blitz", TimeClass::Blitz),
        ];
        entries
            .iter()
            .map(|(keyword, class)| TimeControlRule {
                keyword: keyword.to_string(),
                class: *class,
            })
            .collect()
    }
}

const ONLINE_SITES: &[&str] = &["chess.com", "chess24.com", "lichess.org", "chess24"];
const ONLINE_EVENTS: &[&str] = &[
    "titled tuesday",
    "early",
    "late",
    "main event",
    "play-in",
    "match play",
];

/// Decide whether a game was played online or over the board
pub fn classify_venue(site: &str, event: &str, link: &str) -> Venue {
    let site_lower = site.to_lowercase();
    let event_lower = event.to_lowercase();
    let link_lower = link.to_lowercase();

    if link_lower.contains("daily") {
        return Venue::Online;
    }
    if ONLINE_SITES.iter().any(|s| site_lower.contains(s)) {
        return Venue::Online;
    }
    if ONLINE_EVENTS.iter().any(|e| event_lower.contains(e)) {
        return Venue::Online;
    }
    Venue::Offline
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_keyword_wins_over_time_control() {
        let classifier = TimeControlClassifier::new();
        // Month keyword marks titled events as blitz regardless of base time
        assert_eq!(
            classifier.classify("Late-Titled-Tuesday-Blitz-November-08-2022", "60+1"),
            Some(TimeClass::Blitz)
        );
        assert_eq!(
            classifier.classify("Corus Group A", "180"),
            Some(TimeClass::Classical)
        );
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        let classifier = TimeControlClassifier::from_rules(vec![
            TimeControlRule {
                keyword: "titled".to_string(),
                class: TimeClass::Blitz,
            },
            TimeControlRule {
                keyword: "titled tuesday".to_string(),
                class: TimeClass::Rapid,
            },
        ]);
        assert_eq!(
            classifier.classify("Titled Tuesday", ""),
            Some(TimeClass::Blitz)
        );
    }

    #[test]
    fn test_daily_prefix() {
        let classifier = TimeControlClassifier::new();
        assert_eq!(
            classifier.classify("Some Event", "1/86400"),
            Some(TimeClass::Daily)
        );
    }

    #[test]
    fn test_base_time_thresholds() {
        let classifier = TimeControlClassifier::new();
        assert_eq!(classifier.classify("x", "1"), Some(TimeClass::Bullet));
        assert_eq!(classifier.classify("x", "179+2"), Some(TimeClass::Bullet));
        assert_eq!(classifier.classify("x", "180"), Some(TimeClass::Blitz));
        assert_eq!(classifier.classify("x", "599+0"), Some(TimeClass::Blitz));
        assert_eq!(classifier.classify("x", "600"), Some(TimeClass::Rapid));
        assert_eq!(classifier.classify("x", "1799"), Some(TimeClass::Rapid));
        assert_eq!(classifier.classify("x", "1800"), Some(TimeClass::Classical));
        assert_eq!(classifier.classify("x", "5400+30"), Some(TimeClass::Classical));
    }

    #[test]
    fn test_unclassifiable_returns_none() {
        let classifier = TimeControlClassifier::new();
        assert_eq!(classifier.classify("x", ""), None);
        assert_eq!(classifier.classify("x", "-"), None);
        assert_eq!(classifier.classify("x", "0"), None);
    }

    #[test]
    fn test_load_rule_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(
            &path,
            r#"
[[rule]]
keyword = "My Invitational"
class = "rapid"

[[rule]]
keyword = "club night"
class = "classical"
"#,
        )
        .unwrap();

        let classifier = TimeControlClassifier::load(&path).unwrap();
        assert_eq!(classifier.rule_count(), 2);
        assert_eq!(
            classifier.classify("My Invitational 2024", ""),
            Some(TimeClass::Rapid)
        );
        assert_eq!(
            classifier.classify("Thursday Club Night", "900"),
            Some(TimeClass::Classical)
        );
    }

    #[test]
    fn test_load_rejects_unknown_class() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(&path, "[[rule]]\nkeyword = \"x\"\nclass = \"hyperbullet\"\n").unwrap();
        assert!(TimeControlClassifier::load(&path).is_err());
    }

    #[test]
    fn test_venue_online_site() {
        assert_eq!(
            classify_venue("Chess.com", "Some Event", ""),
            Venue::Online
        );
        assert_eq!(
            classify_venue("lichess.org", "", ""),
            Venue::Online
        );
    }

    #[test]
    fn test_venue_online_event_and_link() {
        assert_eq!(
            classify_venue("", "Titled Tuesday 2nd Nov", ""),
            Venue::Online
        );
        assert_eq!(
            classify_venue("", "", "https://www.chess.com/daily/game/1"),
            Venue::Online
        );
    }

    #[test]
    fn test_venue_offline_default() {
        assert_eq!(
            classify_venue("Wijk aan Zee NED", "Tata Steel Masters", ""),
            Venue::Offline
        );
    }
}
