use std::collections::{HashMap, HashSet};
use std::env;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::http_client::http_client;
use crate::odds::{MarketKind, MarketQuote, Side};
use crate::schedule_store::GameRecord;
use crate::teams;

const ODDS_API_URL: &str = "https://api.the-odds-api.com/v4/sports/americanfootball_nfl/odds";
const DEFAULT_DAY_TOLERANCE: i64 = 2;

#[derive(Debug, Clone)]
pub struct OddsFetchConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub regions: String,
    /// Max |event date − gameday| in days for an event to match a fixture.
    pub day_tolerance: i64,
}

impl OddsFetchConfig {
    pub fn from_env() -> Self {
        let enabled = env_bool("ODDS_ENABLED", true);
        let api_key = env::var("ODDS_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let regions = env::var("ODDS_REGIONS")
            .unwrap_or_else(|_| "us".to_string())
            .trim()
            .to_ascii_lowercase();
        let day_tolerance = env::var("ODDS_MATCH_DAY_TOLERANCE")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_DAY_TOLERANCE)
            .clamp(0, 7);

        Self {
            enabled,
            api_key,
            regions,
            day_tolerance,
        }
    }
}

/// All quotes for one upstream event, teams already canonicalized.
#[derive(Debug, Clone)]
pub struct EventQuotes {
    pub home: String,
    pub away: String,
    pub commence_date: Option<NaiveDate>,
    pub quotes: Vec<MarketQuote>,
}

#[derive(Debug)]
pub struct OddsParse {
    pub events: Vec<EventQuotes>,
    pub skipped_teams: usize,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    commence_time: Option<String>,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<RawBookmaker>,
}

#[derive(Debug, Deserialize)]
struct RawBookmaker {
    key: String,
    #[serde(default)]
    markets: Vec<RawMarket>,
}

#[derive(Debug, Deserialize)]
struct RawMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<RawOutcome>,
}

#[derive(Debug, Deserialize)]
struct RawOutcome {
    name: String,
    price: f64,
    #[serde(default)]
    point: Option<f64>,
}

/// Fetch American moneyline + spread quotes and key them by fixture game id.
/// Events that match no fixture are silently ignored; fixtures that match no
/// event simply stay unquoted.
pub fn fetch_market_quotes(
    fixtures: &[GameRecord],
    cfg: &OddsFetchConfig,
) -> Result<HashMap<String, Vec<MarketQuote>>> {
    if !cfg.enabled || fixtures.is_empty() {
        return Ok(HashMap::new());
    }
    let Some(api_key) = cfg.api_key.as_ref() else {
        return Err(anyhow::anyhow!("ODDS_API_KEY missing"));
    };

    let client = http_client()?;
    let resp = client
        .get(ODDS_API_URL)
        .query(&[
            ("apiKey", api_key.as_str()),
            ("regions", cfg.regions.as_str()),
            ("markets", "h2h,spreads"),
            ("oddsFormat", "american"),
            ("dateFormat", "iso"),
        ])
        .send()
        .context("odds request failed")?;
    let status = resp.status();
    let body = resp.text().context("failed reading odds body")?;
    if !status.is_success() {
        let snippet = body
            .trim()
            .replace(['\n', '\r'], " ")
            .chars()
            .take(220)
            .collect::<String>();
        return Err(anyhow::anyhow!("odds http {}: {}", status, snippet));
    }

    let parsed = parse_odds_events(&body)?;
    if parsed.skipped_teams > 0 {
        eprintln!(
            "[odds] skipped {} events with unresolvable team names",
            parsed.skipped_teams
        );
    }

    Ok(match_events_to_fixtures(
        fixtures,
        &parsed.events,
        cfg.day_tolerance,
    ))
}

/// Parse the raw odds payload into canonical per-event quote lists. Events
/// naming a team outside the league are dropped and counted.
pub fn parse_odds_events(raw: &str) -> Result<OddsParse> {
    let parsed: Vec<RawEvent> = serde_json::from_str(raw).context("invalid odds json")?;

    let mut events = Vec::with_capacity(parsed.len());
    let mut skipped_teams = 0usize;
    for event in &parsed {
        let (Ok(home), Ok(away)) = (
            teams::resolve_team(&event.home_team),
            teams::resolve_team(&event.away_team),
        ) else {
            skipped_teams += 1;
            continue;
        };

        let mut quotes = Vec::new();
        for bookmaker in &event.bookmakers {
            for market in &bookmaker.markets {
                let kind = match market.key.as_str() {
                    "h2h" => MarketKind::Moneyline,
                    "spreads" => MarketKind::Spread,
                    _ => continue,
                };
                for outcome in &market.outcomes {
                    let Ok(code) = teams::resolve_team(&outcome.name) else {
                        continue;
                    };
                    let side = if code == home {
                        Side::Home
                    } else if code == away {
                        Side::Away
                    } else {
                        continue;
                    };
                    quotes.push(MarketQuote {
                        book: bookmaker.key.clone(),
                        market: kind,
                        side,
                        price: outcome.price.round() as i32,
                        point: outcome.point,
                    });
                }
            }
        }
        if quotes.is_empty() {
            continue;
        }

        events.push(EventQuotes {
            home,
            away,
            commence_date: event
                .commence_time
                .as_deref()
                .and_then(parse_commence_date),
            quotes,
        });
    }

    Ok(OddsParse {
        events,
        skipped_teams,
    })
}

/// Pair events with fixtures on (home, away) codes, preferring the closest
/// kickoff date inside the tolerance. Each event is spent on at most one
/// fixture.
pub fn match_events_to_fixtures(
    fixtures: &[GameRecord],
    events: &[EventQuotes],
    day_tolerance: i64,
) -> HashMap<String, Vec<MarketQuote>> {
    let mut out = HashMap::new();
    let mut used: HashSet<usize> = HashSet::new();

    for fixture in fixtures {
        let mut best: Option<(usize, i64)> = None;
        for (idx, event) in events.iter().enumerate() {
            if used.contains(&idx) {
                continue;
            }
            if event.home != fixture.home_team || event.away != fixture.away_team {
                continue;
            }
            let score = match (fixture.gameday, event.commence_date) {
                (Some(f), Some(e)) => {
                    let diff = (f - e).num_days().abs();
                    if diff > day_tolerance {
                        continue;
                    }
                    diff
                }
                // One side undated: acceptable, but any dated match beats it.
                _ => day_tolerance,
            };
            if let Some((_, best_score)) = best {
                if score >= best_score {
                    continue;
                }
            }
            best = Some((idx, score));
        }

        if let Some((idx, _)) = best {
            used.insert(idx);
            out.insert(fixture.game_id.clone(), events[idx].quotes.clone());
        }
    }

    out
}

fn parse_commence_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%SZ")
        .ok()
        .map(|dt| dt.date())
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}
