use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(ParticipantId);
id_newtype!(TeamId);

/// Backend-assigned session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Integer currency units. Budgets are audit/display data in the client;
/// assignment never debits a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money(pub i64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub budget: Money,
    /// Display name of the assigned participant, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

/// Starter roster configuration for a fresh projection. The teams are
/// seeded before any event arrives; they are never created or removed by
/// the event stream.
#[derive(Debug, Clone)]
pub struct TeamSeed {
    pub names: Vec<String>,
    pub budget: Money,
}

impl Default for TeamSeed {
    fn default() -> Self {
        Self {
            names: vec!["Team 1".into(), "Team 2".into(), "Team 3".into()],
            budget: Money(1000),
        }
    }
}

impl TeamSeed {
    pub fn teams(&self) -> Vec<Team> {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| Team {
                id: TeamId(index as i64 + 1),
                name: name.clone(),
                budget: self.budget,
                assigned_to: None,
            })
            .collect()
    }
}
