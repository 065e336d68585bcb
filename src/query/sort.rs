//! Sort columns, the sort stack and its click cycle

use crate::resource::types::{Resource, StatKey};

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Value a missing number sorts as. Below every real value, including 0,
/// so an unset stat never ties with a measured zero rating.
pub const NULL_SORT_SENTINEL: f64 = -1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Type,
    Planet,
    DateReported,
    LastModified,
    IsActive,
    WeightRating,
    Stat(StatKey),
    Rating(StatKey)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Alpha,
    Planet,
    Date,
    Status,
    Numeric
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending
}

impl Direction {
    pub fn reversed(self) -> Direction {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending
        }
    }
}

impl ColumnKind {
    /// What the first click on a column means
    pub fn natural_direction(self) -> Direction {
        match self {
            ColumnKind::Alpha | ColumnKind::Planet => Direction::Ascending,
            ColumnKind::Date | ColumnKind::Status | ColumnKind::Numeric => Direction::Descending
        }
    }
}

enum SortValue {
    Text(String),
    Number(f64)
}

impl Column {
    pub fn kind(self) -> ColumnKind {
        match self {
            Column::Name | Column::Type => ColumnKind::Alpha,
            Column::Planet => ColumnKind::Planet,
            Column::DateReported | Column::LastModified => ColumnKind::Date,
            Column::IsActive => ColumnKind::Status,
            Column::WeightRating | Column::Stat(_) | Column::Rating(_) => ColumnKind::Numeric
        }
    }

    pub fn key(self) -> String {
        match self {
            Column::Name => "name".to_string(),
            Column::Type => "type".to_string(),
            Column::Planet => "planet".to_string(),
            Column::DateReported => "date_reported".to_string(),
            Column::LastModified => "last_modified".to_string(),
            Column::IsActive => "is_active".to_string(),
            Column::WeightRating => "res_weight_rating".to_string(),
            Column::Stat(stat) => stat.field().to_string(),
            Column::Rating(stat) => format!("{}_rating", stat.field())
        }
    }

    fn value(self, resource: &Resource) -> SortValue {
        let number = |v: Option<f64>| SortValue::Number(v.unwrap_or(NULL_SORT_SENTINEL));
        match self {
            Column::Name => SortValue::Text(resource.name.to_lowercase()),
            Column::Type => SortValue::Text(resource.resource_type.to_lowercase()),
            Column::Planet => SortValue::Text(resource.sorted_planets().join(", ").to_lowercase()),
            Column::DateReported => number(resource.date_reported_ts),
            Column::LastModified => number(resource.last_modified_ts),
            Column::IsActive => SortValue::Number(if resource.is_active { 1.0 } else { 0.0 }),
            Column::WeightRating => number(resource.ratings.res_weight_rating),
            Column::Stat(stat) => number(resource.stats.get(stat).map(f64::from)),
            Column::Rating(stat) => number(resource.ratings.get(stat))
        }
    }

    /// Ascending comparison of two resources on this column
    pub fn compare(self, a: &Resource, b: &Resource) -> Ordering {
        match (self.value(a), self.value(b)) {
            (SortValue::Text(x), SortValue::Text(y)) => x.cmp(&y),
            (SortValue::Number(x), SortValue::Number(y)) => x.total_cmp(&y),
            // A column always yields the same variant
            _ => Ordering::Equal
        }
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        let column = match key.as_str() {
            "name" => Column::Name,
            "type" => Column::Type,
            "planet" | "planets" => Column::Planet,
            "date_reported" | "date" => Column::DateReported,
            "last_modified" => Column::LastModified,
            "is_active" | "status" => Column::IsActive,
            "res_weight_rating" | "weight" => Column::WeightRating,
            _ => {
                if let Some(stat) = key.strip_suffix("_rating").and_then(StatKey::parse) {
                    Column::Rating(stat)
                } else if let Some(stat) = StatKey::parse(&key) {
                    Column::Stat(stat)
                } else {
                    return Err(format!("Unknown sort column `{}`", s));
                }
            }
        };
        Ok(column)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// User facing toggle state of an active sort key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortMode {
    /// The column's natural direction
    Up,
    /// The reverse of it
    Down
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortEntry {
    pub column: Column,
    pub mode: SortMode
}

impl SortEntry {
    pub fn direction(&self) -> Direction {
        let natural = self.column.kind().natural_direction();
        match self.mode {
            SortMode::Up => natural,
            SortMode::Down => natural.reversed()
        }
    }

    pub fn compare(&self, a: &Resource, b: &Resource) -> Ordering {
        let ord = self.column.compare(a, b);
        match self.direction() {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse()
        }
    }
}

/// Ordered sort keys; the first entry is the primary key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortStack {
    entries: Vec<SortEntry>
}

impl Default for SortStack {
    /// Newest reports first, then active before inactive
    fn default() -> Self {
        SortStack {
            entries: vec![
                SortEntry { column: Column::DateReported, mode: SortMode::Up },
                SortEntry { column: Column::IsActive, mode: SortMode::Up },
            ]
        }
    }
}

impl SortStack {
    pub fn empty() -> SortStack {
        SortStack { entries: Vec::new() }
    }

    pub fn entries(&self) -> &[SortEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mode_of(&self, column: Column) -> Option<SortMode> {
        self.entries.iter().find(|e| e.column == column).map(|e| e.mode)
    }

    /// One click on a column header: `off -> up -> down -> off`.
    ///
    /// A newly activated column goes to the front and becomes primary. An
    /// active column flips in place, keeping its precedence. The third click
    /// removes it and leaves the rest of the stack as it was.
    pub fn toggle(&mut self, column: Column) {
        match self.entries.iter().position(|e| e.column == column) {
            None => self.entries.insert(0, SortEntry { column, mode: SortMode::Up }),
            Some(idx) => match self.entries[idx].mode {
                SortMode::Up => self.entries[idx].mode = SortMode::Down,
                SortMode::Down => { self.entries.remove(idx); }
            }
        }
    }

    /// First non-equal key decides
    pub fn compare(&self, a: &Resource, b: &Resource) -> Ordering {
        for entry in &self.entries {
            let ord = entry.compare(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}
