//! Transaction type discriminant, used for queries and histograms.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TransactionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Genesis,
    HospitalRegistration,
    ModelUpdate,
    ModelAggregation,
    RewardDistribution,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 5] = [
        Self::Genesis,
        Self::HospitalRegistration,
        Self::ModelUpdate,
        Self::ModelAggregation,
        Self::RewardDistribution,
    ];

    /// The wire tag, identical to the `"type"` field of a serialized transaction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Genesis => "GENESIS",
            Self::HospitalRegistration => "HOSPITAL_REGISTRATION",
            Self::ModelUpdate => "MODEL_UPDATE",
            Self::ModelAggregation => "MODEL_AGGREGATION",
            Self::RewardDistribution => "REWARD_DISTRIBUTION",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TransactionError::UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_matches_wire_tag() {
        for kind in TransactionKind::ALL {
            assert_eq!(kind.as_str().parse::<TransactionKind>().unwrap(), kind);
            assert_eq!(
                serde_json::to_string(&kind).unwrap(),
                format!("\"{}\"", kind.as_str())
            );
        }
        assert_eq!(
            "model_update".parse::<TransactionKind>().unwrap(),
            TransactionKind::ModelUpdate
        );
        assert!(matches!(
            "TRANSFER".parse::<TransactionKind>(),
            Err(TransactionError::UnknownKind(_))
        ));
    }
}
