use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offense {
    pub offense_type: Option<String>,
    pub address: Option<String>,
    pub coordinates: Option<String>,
    pub description: Option<String>,
    pub offense_id: Option<String>,
}

impl Offense {
    pub fn is_empty(&self) -> bool {
        self.offense_type.is_none()
            && self.address.is_none()
            && self.coordinates.is_none()
            && self.description.is_none()
            && self.offense_id.is_none()
    }

    pub fn ticket_digits(&self) -> Option<&str> {
        self.offense_id
            .as_deref()
            .map(|id| id.trim_start_matches('#'))
            .filter(|id| !id.is_empty())
    }

    pub fn description_duplicates_address(&self) -> bool {
        matches!(
            (self.description.as_deref(), self.address.as_deref()),
            (Some(description), Some(address)) if description.trim() == address.trim()
        )
    }
}

impl fmt::Display for Offense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            &self.offense_type,
            &self.address,
            &self.coordinates,
            &self.description,
            &self.offense_id,
        ];
        for value in fields.into_iter().flatten() {
            writeln!(f, "{value}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailFields {
    pub description: Option<String>,
    pub coordinates: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerTier {
    ClassSignature,
    ClassKeyword,
    LinkAncestor,
}

impl ContainerTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerTier::ClassSignature => "class_signature",
            ContainerTier::ClassKeyword => "class_keyword",
            ContainerTier::LinkAncestor => "link_ancestor",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentTally {
    pub attempted: usize,
    pub skipped_without_id: usize,
    pub failed: usize,
    pub descriptions_filled: usize,
    pub coordinates_filled: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub source_url: String,
    pub page: u32,
    pub tier: Option<ContainerTier>,
    pub containers_found: usize,
    pub records_parsed: usize,
    pub enrichment: EnrichmentTally,
}
