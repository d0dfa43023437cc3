use serde_json::Value;

/// The two back-office feeds the watcher keeps an eye on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Orders,
    Reservations,
}

impl Feed {
    /// Path of the list endpoint, relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Self::Orders => "/orders",
            Self::Reservations => "/reservations",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Reservations => "reservations",
        }
    }

    pub fn all() -> &'static [Feed] {
        &[Self::Orders, Self::Reservations]
    }
}

/// One entry of a watched feed. Everything but the identifier is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub id: u64,
}

impl Record {
    /// Reads the `id` field leniently: numbers and numeric strings are accepted,
    /// anything else (missing, null, negative, garbage) counts as 0.
    pub fn from_value(value: &Value) -> Self {
        let id = value.get("id").map(parse_id).unwrap_or(0);
        Self { id }
    }
}

fn parse_id(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(float_to_id))
            .unwrap_or(0),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<u64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(float_to_id))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn float_to_id(f: f64) -> u64 {
    if f.is_finite() && f > 0.0 {
        f.floor() as u64
    } else {
        0
    }
}

/// Snapshot of a feed as returned by the API on one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchedList {
    records: Vec<Record>,
}

impl WatchedList {
    /// Anything that is not a JSON array decodes to an empty list.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => Self {
                records: items.iter().map(Record::from_value).collect(),
            },
            _ => Self::default(),
        }
    }

    #[cfg(test)]
    pub fn from_ids(ids: &[u64]) -> Self {
        Self {
            records: ids.iter().map(|&id| Record { id }).collect(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
