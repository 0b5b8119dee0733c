use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use std::fmt;

/// One open match as listed by `view_matches`.
///
/// The contract returns each match as a positional tuple
/// `(id, team_1, odds_1, team_2, odds_2, ...)`. The leading five positions are
/// required; anything after them is kept as-is in `extra`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "Vec<Value>")]
pub struct Match {
    pub id: String,
    pub side_a: String,
    pub side_a_meta: Value,
    pub side_b: String,
    pub side_b_meta: Value,
    pub extra: Vec<Value>,
}

impl Match {
    pub fn new(
        id: impl Into<String>,
        side_a: impl Into<String>,
        side_a_meta: impl Into<Value>,
        side_b: impl Into<String>,
        side_b_meta: impl Into<Value>,
    ) -> Self {
        Self {
            id: id.into(),
            side_a: side_a.into(),
            side_a_meta: side_a_meta.into(),
            side_b: side_b.into(),
            side_b_meta: side_b_meta.into(),
            extra: Vec::new(),
        }
    }

    /// Both team names, in listing order.
    pub fn sides(&self) -> [&str; 2] {
        [&self.side_a, &self.side_b]
    }

    pub fn has_side(&self, name: &str) -> bool {
        self.side_a == name || self.side_b == name
    }

    /// The order in which the form cycles through sides.
    pub fn side_options(&self) -> [Side; 3] {
        [
            Side::Unselected,
            Side::Team(self.side_a.clone()),
            Side::Team(self.side_b.clone()),
        ]
    }

    pub fn title(&self) -> String {
        format!("{} vs {}", self.side_a, self.side_b)
    }

    pub fn winner(&self) -> Option<&str> {
        self.extra.first().and_then(Value::as_str)
    }

    /// Contracts report completion either as a bool or as a state name.
    pub fn is_finished(&self) -> bool {
        match self.extra.get(1) {
            Some(Value::Bool(finished)) => *finished,
            Some(Value::String(state)) => state != "Future",
            _ => false,
        }
    }
}

impl TryFrom<Vec<Value>> for Match {
    type Error = String;

    fn try_from(fields: Vec<Value>) -> Result<Self, Self::Error> {
        if fields.len() < 5 {
            return Err(format!(
                "match tuple needs at least 5 fields, got {}",
                fields.len()
            ));
        }
        let mut fields = fields.into_iter();
        let mut text = |position: &str| -> Result<String, String> {
            match fields.next() {
                Some(Value::String(s)) => Ok(s),
                other => Err(format!("match {position} must be a string, got {other:?}")),
            }
        };
        let id = text("id")?;
        let side_a = text("first side")?;
        let side_a_meta = fields.next().unwrap_or(Value::Null);
        let side_b = match fields.next() {
            Some(Value::String(s)) => s,
            other => {
                return Err(format!(
                    "match second side must be a string, got {other:?}"
                ));
            }
        };
        let side_b_meta = fields.next().unwrap_or(Value::Null);
        Ok(Self {
            id,
            side_a,
            side_a_meta,
            side_b,
            side_b_meta,
            extra: fields.collect(),
        })
    }
}

/// Renders a metadata field (odds or a date) for display.
pub fn display_meta(meta: &Value) -> String {
    match meta {
        Value::Null => String::from("-"),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The outcome a bet is placed on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Side {
    #[default]
    Unselected,
    Team(String),
}

impl Side {
    pub fn team(name: impl Into<String>) -> Self {
        Self::Team(name.into())
    }

    pub fn is_selected(&self) -> bool {
        matches!(self, Self::Team(_))
    }

    pub fn as_team(&self) -> Option<&str> {
        match self {
            Self::Team(name) => Some(name),
            Self::Unselected => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Unselected => write!(f, "Select Team"),
            Side::Team(name) => write!(f, "{name}"),
        }
    }
}

/// A bet as reported by `view_bets`. Amounts are in NEAR.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    pub bettor: String,
    pub decision: String,
    pub bet_amount: f64,
    pub potential_winnings: f64,
    pub payed_out: bool,
}

/// Result of a mutating call that reached the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxOutcome {
    pub transaction_hash: String,
    pub logs: Vec<String>,
}
