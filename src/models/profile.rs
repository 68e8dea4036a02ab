use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
            Gender::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Female" => Ok(Gender::Female),
            "Male" => Ok(Gender::Male),
            "unknown" => Ok(Gender::Unknown),
            other => Err(format!("\"{}\" is not a valid choice.", other)),
        }
    }
}

/// Extended information for exactly one user.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub biography: String,
    pub gender: Gender,
    /// Ids of the users this profile's user follows.
    #[serde(default)]
    pub following: Vec<String>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_choices_are_exact() {
        assert_eq!("Male".parse::<Gender>(), Ok(Gender::Male));
        assert_eq!("unknown".parse::<Gender>(), Ok(Gender::Unknown));
        assert!("male".parse::<Gender>().is_err());
        assert!("Unknown".parse::<Gender>().is_err());
    }

    #[test]
    fn gender_serializes_as_choice_value() {
        assert_eq!(serde_json::to_string(&Gender::Unknown).unwrap(), "\"unknown\"");
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"Female\"");
    }

    #[test]
    fn full_name_joins_names() {
        let profile = Profile {
            id: "p".into(),
            user_id: "u".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            biography: String::new(),
            gender: Gender::Female,
            following: vec![],
        };
        assert_eq!(profile.full_name(), "Ada Lovelace");
    }
}
