//! Concert program record and its performances

use serde::{Deserialize, Deserializer, Serialize};

/// Whether the concert happens in person or online
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConcertType {
    Online,
    #[default]
    Offline,
}

impl ConcertType {
    /// Parse case-insensitively; surrounding whitespace is ignored.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ONLINE" => Some(ConcertType::Online),
            "OFFLINE" => Some(ConcertType::Offline),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConcertType::Online => "ONLINE",
            ConcertType::Offline => "OFFLINE",
        }
    }
}

impl<'de> Deserialize<'de> for ConcertType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(ConcertType::default()),
            Some(value) => ConcertType::parse(&value)
                .ok_or_else(|| serde::de::Error::unknown_variant(&value, &["ONLINE", "OFFLINE"])),
        }
    }
}

/// One entry on the program
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performance {
    #[serde(default, deserialize_with = "lenient_u32")]
    pub order: u32,
    #[serde(default, deserialize_with = "lenient_string")]
    pub student_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub piece_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub instrument: String,
    #[serde(default, deserialize_with = "lenient_minutes")]
    pub estimated_duration_minutes: Option<u32>,
}

impl Performance {
    pub fn new(order: u32, student_name: &str, piece_name: &str, instrument: &str, minutes: Option<u32>) -> Self {
        Self {
            order,
            student_name: student_name.to_string(),
            piece_name: piece_name.to_string(),
            instrument: instrument.to_string(),
            estimated_duration_minutes: minutes,
        }
    }

    /// `  {order}. {student} — {piece} ({instrument}, ~{minutes} min)`
    pub fn summary_line(&self) -> String {
        let instrument = if self.instrument.is_empty() {
            "N/A"
        } else {
            self.instrument.as_str()
        };
        format!(
            "  {}. {} — {} ({}, ~{} min)",
            self.order,
            self.student_name,
            self.piece_name,
            instrument,
            self.minutes_label()
        )
    }

    /// Duration as shown to people: the number, or `?` when unknown
    pub fn minutes_label(&self) -> String {
        self.estimated_duration_minutes
            .map(|m| m.to_string())
            .unwrap_or_else(|| "?".to_string())
    }
}

/// The concert record the assistant edits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcertProgram {
    #[serde(default, deserialize_with = "lenient_string")]
    pub concert_title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub concert_date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub concert_time: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub concert_venue: String,
    #[serde(default)]
    pub concert_type: ConcertType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub performances: Vec<Performance>,
}

impl ConcertProgram {
    pub fn is_empty(&self) -> bool {
        self.performances.is_empty()
    }

    /// Sum of known durations; unknown durations count as zero.
    pub fn total_minutes(&self) -> u32 {
        self.performances
            .iter()
            .filter_map(|p| p.estimated_duration_minutes)
            .fold(0u32, |total, m| total.saturating_add(m))
    }

    /// Give every performance without an order its 1-based position.
    pub fn normalize(&mut self) {
        renumber(&mut self.performances);
    }

    pub fn summary_lines(&self) -> Vec<String> {
        self.performances.iter().map(Performance::summary_line).collect()
    }
}

/// Fill in missing (zero) order numbers from list position
pub fn renumber(performances: &mut [Performance]) {
    for (i, p) in performances.iter_mut().enumerate() {
        if p.order == 0 {
            p.order = i as u32 + 1;
        }
    }
}

/// Optional metadata fields; empty strings mean "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataUpdate {
    pub concert_title: Option<String>,
    pub concert_date: Option<String>,
    pub concert_time: Option<String>,
    pub concert_venue: Option<String>,
    pub concert_type: Option<ConcertType>,
}

impl MetadataUpdate {
    /// Apply every field that carries a non-empty value.
    pub fn apply_to(&self, program: &mut ConcertProgram) {
        fn set(target: &mut String, value: &Option<String>) {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                *target = v.to_string();
            }
        }
        set(&mut program.concert_title, &self.concert_title);
        set(&mut program.concert_date, &self.concert_date);
        set(&mut program.concert_time, &self.concert_time);
        set(&mut program.concert_venue, &self.concert_venue);
        if let Some(kind) = self.concert_type {
            program.concert_type = kind;
        }
    }
}

// Model output is loosely typed: numbers show up as floats, strings ("4 min")
// or null. The helpers below accept all of those.

/// Longest single performance accepted; anything above is treated as unknown
pub const MAX_DURATION_MINUTES: u32 = 600;

fn number_from_value(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.round() as u32),
        serde_json::Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            digits.parse::<f64>().ok().map(|f| f.round() as u32)
        }
        _ => None,
    }
}

fn lenient_minutes<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(number_from_value(&value).filter(|m| *m <= MAX_DURATION_MINUTES))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(number_from_value(&value).unwrap_or(0))
}

/// `null` reads as the type's default
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line_formats() {
        let p = Performance::new(1, "Tommy Chen", "Für Elise (Beethoven)", "Piano", Some(4));
        assert_eq!(p.summary_line(), "  1. Tommy Chen — Für Elise (Beethoven) (Piano, ~4 min)");

        let unknown = Performance::new(2, "Lisa Wang", "Clair de Lune", "", None);
        assert_eq!(unknown.summary_line(), "  2. Lisa Wang — Clair de Lune (N/A, ~? min)");
    }

    #[test]
    fn test_lenient_durations() {
        let json = r#"[
            {"order": 1, "student_name": "A", "piece_name": "X", "estimated_duration_minutes": 4.6},
            {"order": "2", "student_name": "B", "piece_name": "Y", "estimated_duration_minutes": "6 min"},
            {"student_name": "C", "piece_name": "Z", "estimated_duration_minutes": null, "instrument": null},
            {"student_name": "D", "piece_name": "W", "estimated_duration_minutes": "about five"}
        ]"#;
        let perfs: Vec<Performance> = serde_json::from_str(json).unwrap();
        assert_eq!(perfs[0].estimated_duration_minutes, Some(5));
        assert_eq!(perfs[1].order, 2);
        assert_eq!(perfs[1].estimated_duration_minutes, Some(6));
        assert_eq!(perfs[2].estimated_duration_minutes, None);
        assert_eq!(perfs[2].instrument, "");
        assert_eq!(perfs[3].estimated_duration_minutes, None);
    }

    #[test]
    fn test_absurd_durations_are_unknown() {
        let json = r#"[
            {"student_name": "A", "piece_name": "X", "estimated_duration_minutes": 3000000000},
            {"student_name": "B", "piece_name": "Y", "estimated_duration_minutes": 3000000000},
            {"student_name": "C", "piece_name": "Z", "estimated_duration_minutes": 1e300},
            {"student_name": "D", "piece_name": "W", "estimated_duration_minutes": 45}
        ]"#;
        let perfs: Vec<Performance> = serde_json::from_str(json).unwrap();
        assert_eq!(perfs[0].estimated_duration_minutes, None);
        assert_eq!(perfs[2].estimated_duration_minutes, None);

        let program = ConcertProgram {
            performances: perfs,
            ..Default::default()
        };
        assert_eq!(program.total_minutes(), 45);
    }

    #[test]
    fn test_total_minutes_saturates() {
        let program = ConcertProgram {
            performances: vec![
                Performance::new(1, "A", "X", "Piano", Some(u32::MAX - 1)),
                Performance::new(2, "B", "Y", "Piano", Some(u32::MAX - 1)),
            ],
            ..Default::default()
        };
        assert_eq!(program.total_minutes(), u32::MAX);
    }

    #[test]
    fn test_null_strings_read_as_empty() {
        let perf: Performance = serde_json::from_str(
            r#"{"order": 1, "student_name": null, "piece_name": "Minuet in G", "instrument": "Violin"}"#,
        )
        .unwrap();
        assert_eq!(perf.student_name, "");
        assert_eq!(perf.piece_name, "Minuet in G");

        let program: ConcertProgram = serde_json::from_str(
            r#"{"concert_title": "Winter Gala", "concert_date": null, "concert_time": null,
                "concert_venue": null, "concert_type": null, "performances": []}"#,
        )
        .unwrap();
        assert_eq!(program.concert_title, "Winter Gala");
        assert_eq!(program.concert_venue, "");
        assert_eq!(program.concert_type, ConcertType::Offline);
    }

    #[test]
    fn test_total_minutes_skips_unknown() {
        let program = ConcertProgram {
            performances: vec![
                Performance::new(1, "A", "X", "Piano", Some(4)),
                Performance::new(2, "B", "Y", "Violin", None),
                Performance::new(3, "C", "Z", "Cello", Some(6)),
            ],
            ..Default::default()
        };
        assert_eq!(program.total_minutes(), 10);
    }

    #[test]
    fn test_normalize_fills_missing_orders() {
        let mut program = ConcertProgram {
            performances: vec![
                Performance::new(0, "A", "X", "", None),
                Performance::new(7, "B", "Y", "", None),
                Performance::new(0, "C", "Z", "", None),
            ],
            ..Default::default()
        };
        program.normalize();
        let orders: Vec<u32> = program.performances.iter().map(|p| p.order).collect();
        assert_eq!(orders, vec![1, 7, 3]);
    }

    #[test]
    fn test_metadata_update_ignores_blank_fields() {
        let mut program = ConcertProgram {
            concert_title: "Spring Recital".to_string(),
            concert_venue: "Old Hall".to_string(),
            ..Default::default()
        };
        MetadataUpdate {
            concert_title: Some("  ".to_string()),
            concert_venue: Some("Boston Music Hall".to_string()),
            concert_type: Some(ConcertType::Online),
            ..Default::default()
        }
        .apply_to(&mut program);

        assert_eq!(program.concert_title, "Spring Recital");
        assert_eq!(program.concert_venue, "Boston Music Hall");
        assert_eq!(program.concert_type, ConcertType::Online);
    }

    #[test]
    fn test_concert_type_parse_and_serde() {
        assert_eq!(ConcertType::parse(" online "), Some(ConcertType::Online));
        assert_eq!(ConcertType::parse("hybrid"), None);
        assert_eq!(serde_json::to_string(&ConcertType::Offline).unwrap(), "\"OFFLINE\"");
        assert_eq!(serde_json::from_str::<ConcertType>("\"Online\"").unwrap(), ConcertType::Online);
    }
}
