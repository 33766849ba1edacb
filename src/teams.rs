use crate::error::EdgeError;

/// Canonical code plus full franchise name for every current team.
/// Every join across schedule/play/odds sources goes through these codes.
const TEAMS: &[(&str, &str)] = &[
    ("ARI", "Arizona Cardinals"),
    ("ATL", "Atlanta Falcons"),
    ("BAL", "Baltimore Ravens"),
    ("BUF", "Buffalo Bills"),
    ("CAR", "Carolina Panthers"),
    ("CHI", "Chicago Bears"),
    ("CIN", "Cincinnati Bengals"),
    ("CLE", "Cleveland Browns"),
    ("DAL", "Dallas Cowboys"),
    ("DEN", "Denver Broncos"),
    ("DET", "Detroit Lions"),
    ("GB", "Green Bay Packers"),
    ("HOU", "Houston Texans"),
    ("IND", "Indianapolis Colts"),
    ("JAX", "Jacksonville Jaguars"),
    ("KC", "Kansas City Chiefs"),
    ("LAC", "Los Angeles Chargers"),
    ("LAR", "Los Angeles Rams"),
    ("LV", "Las Vegas Raiders"),
    ("MIA", "Miami Dolphins"),
    ("MIN", "Minnesota Vikings"),
    ("NE", "New England Patriots"),
    ("NO", "New Orleans Saints"),
    ("NYG", "New York Giants"),
    ("NYJ", "New York Jets"),
    ("PHI", "Philadelphia Eagles"),
    ("PIT", "Pittsburgh Steelers"),
    ("SEA", "Seattle Seahawks"),
    ("SF", "San Francisco 49ers"),
    ("TB", "Tampa Bay Buccaneers"),
    ("TEN", "Tennessee Titans"),
    ("WAS", "Washington Commanders"),
];

/// Legacy or source-specific abbreviations seen in historical schedules and
/// odds feeds, mapped onto the canonical codes above.
const LEGACY_CODES: &[(&str, &str)] = &[
    ("LA", "LAR"),
    ("STL", "LAR"),
    ("SD", "LAC"),
    ("OAK", "LV"),
    ("WSH", "WAS"),
    ("JAC", "JAX"),
];

pub fn all_codes() -> impl Iterator<Item = &'static str> {
    TEAMS.iter().map(|(code, _)| *code)
}

/// Canonicalize a team abbreviation. Legacy codes are folded into their
/// modern equivalents; anything else unrecognized is an error the caller
/// should count and skip.
pub fn normalize_code(raw: &str) -> Result<String, EdgeError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.is_empty() {
        return Err(EdgeError::UnresolvableTeamCode(raw.to_string()));
    }
    for (old, new) in LEGACY_CODES {
        if code == *old {
            return Ok((*new).to_string());
        }
    }
    if TEAMS.iter().any(|(c, _)| *c == code) {
        return Ok(code);
    }
    Err(EdgeError::UnresolvableTeamCode(raw.to_string()))
}

/// Resolve a team label that may be a code ("KC"), a legacy code ("OAK"),
/// or a full name as odds feeds send it ("Kansas City Chiefs").
pub fn resolve_team(raw: &str) -> Result<String, EdgeError> {
    if let Ok(code) = normalize_code(raw) {
        return Ok(code);
    }

    let words = name_words(raw);
    if words.is_empty() {
        return Err(EdgeError::UnresolvableTeamCode(raw.to_string()));
    }

    // Nicknames are unique across the league, so the last word alone decides.
    if let Some(last) = words.last() {
        for (code, name) in TEAMS {
            let nickname = name_words(name);
            if nickname.last() == Some(last) {
                return Ok((*code).to_string());
            }
        }
    }

    // Fall back to a whole-name match for inputs with extra qualifiers.
    let collapsed = words.join(" ");
    for (code, name) in TEAMS {
        if name_words(name).join(" ") == collapsed {
            return Ok((*code).to_string());
        }
    }

    Err(EdgeError::UnresolvableTeamCode(raw.to_string()))
}

fn name_words(raw: &str) -> Vec<String> {
    let mut cleaned = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
        } else {
            cleaned.push(' ');
        }
    }
    cleaned.split_whitespace().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_codes_fold_to_modern() {
        assert_eq!(normalize_code("OAK").unwrap(), "LV");
        assert_eq!(normalize_code("sd").unwrap(), "LAC");
        assert_eq!(normalize_code("STL").unwrap(), "LAR");
        assert_eq!(normalize_code("WSH").unwrap(), "WAS");
    }

    #[test]
    fn full_names_resolve_to_codes() {
        assert_eq!(resolve_team("Kansas City Chiefs").unwrap(), "KC");
        assert_eq!(resolve_team("San Francisco 49ers").unwrap(), "SF");
        assert_eq!(resolve_team("new york jets").unwrap(), "NYJ");
    }

    #[test]
    fn unknown_labels_are_errors_not_defaults() {
        assert!(normalize_code("XYZ").is_err());
        assert!(resolve_team("London Monarchs").is_err());
        assert!(resolve_team("").is_err());
    }
}
