//! Game payload validation and slug derivation
//!
//! `GamePayload` is the wire shape shared by manual inserts and the BGG
//! source adapter, so a game fetched by id goes through exactly the same
//! build path as one supplied in a request body.

use bgc_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Raw game data as supplied by a client or the upstream source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GamePayload {
    pub bgg_id: Option<i64>,
    /// Aliases; the first non-blank entry is the primary name
    pub name: Vec<String>,
    pub slug: Option<String>,
    pub published: Option<i64>,
    pub min_players: Option<i64>,
    pub max_players: Option<i64>,
    pub min_player_age: Option<i64>,
    pub play_time: Option<i64>,
    pub min_play_time: Option<i64>,
    pub max_play_time: Option<i64>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub image: Option<String>,
    pub complexity: Option<f64>,
    pub category: Vec<String>,
    pub mechanic: Vec<String>,
    pub designer: Vec<String>,
    pub artist: Vec<String>,
    pub publisher: Vec<String>,
}

impl GamePayload {
    /// Check required scalar fields before any storage work happens
    pub fn validate(&self) -> Result<()> {
        self.primary_name()?;

        if self.min_players.is_none() && self.max_players.is_none() {
            return Err(Error::InvalidInput(
                "game must specify at least one player count bound".to_string(),
            ));
        }

        if let Some(complexity) = self.complexity {
            if !(0.0..=5.0).contains(&complexity) {
                return Err(Error::InvalidInput(format!(
                    "complexity {} out of range (0.0 to 5.0)",
                    complexity
                )));
            }
        }

        Ok(())
    }

    /// First non-blank alias
    pub fn primary_name(&self) -> Result<&str> {
        self.name
            .iter()
            .map(|n| n.trim())
            .find(|n| !n.is_empty())
            .ok_or_else(|| Error::InvalidInput("game must have at least one name".to_string()))
    }

    /// Explicit slug, or one derived from the primary name
    pub fn slug_or_derived(&self) -> Result<String> {
        if let Some(slug) = &self.slug {
            let slug = slug.trim();
            if !slug.is_empty() {
                return Ok(slug.to_string());
            }
        }

        let slug = derive_slug(self.primary_name()?);
        if slug.is_empty() {
            return Err(Error::InvalidInput(
                "game name does not produce a usable slug".to_string(),
            ));
        }

        Ok(slug)
    }
}

/// Derive a URL-safe slug from a game name.
///
/// Lowercases, keeps alphanumerics, and collapses every other run of
/// characters into a single hyphen. Deterministic: equal names always
/// produce equal slugs, which is what makes slug dedup meaningful.
pub fn derive_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_payload(name: &str) -> GamePayload {
        GamePayload {
            name: vec![name.to_string()],
            min_players: Some(2),
            ..Default::default()
        }
    }

    #[test]
    fn test_derive_slug_basic() {
        assert_eq!(derive_slug("Puerto Rico"), "puerto-rico");
        assert_eq!(derive_slug("Through the Ages: A New Story"), "through-the-ages-a-new-story");
        assert_eq!(derive_slug("7 Wonders"), "7-wonders");
    }

    #[test]
    fn test_derive_slug_collapses_runs_and_trims() {
        assert_eq!(derive_slug("  Go---a!!  "), "go-a");
        assert_eq!(derive_slug("(Unpublished)"), "unpublished");
    }

    #[test]
    fn test_derive_slug_is_deterministic() {
        assert_eq!(derive_slug("Terra Mystica"), derive_slug("Terra Mystica"));
    }

    #[test]
    fn test_validate_requires_name() {
        let payload = GamePayload {
            min_players: Some(2),
            ..Default::default()
        };
        assert!(matches!(payload.validate(), Err(Error::InvalidInput(_))));

        let blank = GamePayload {
            name: vec!["   ".to_string()],
            min_players: Some(2),
            ..Default::default()
        };
        assert!(matches!(blank.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_validate_requires_player_bound() {
        let payload = GamePayload {
            name: vec!["Chess".to_string()],
            ..Default::default()
        };
        assert!(matches!(payload.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_validate_complexity_range() {
        let mut payload = minimal_payload("Gloomhaven");
        payload.complexity = Some(3.86);
        assert!(payload.validate().is_ok());

        payload.complexity = Some(5.5);
        assert!(matches!(payload.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_explicit_slug_wins_over_derivation() {
        let mut payload = minimal_payload("Puerto Rico");
        payload.slug = Some("pr-classic".to_string());
        assert_eq!(payload.slug_or_derived().unwrap(), "pr-classic");

        payload.slug = Some("   ".to_string());
        assert_eq!(payload.slug_or_derived().unwrap(), "puerto-rico");
    }

    #[test]
    fn test_primary_name_skips_blank_aliases() {
        let payload = GamePayload {
            name: vec!["".to_string(), "Agricola".to_string()],
            min_players: Some(1),
            ..Default::default()
        };
        assert_eq!(payload.primary_name().unwrap(), "Agricola");
    }
}
